//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::path::Path;

use bookshelf::config::{ServiceConfig, StorageBackend};
use bookshelf::lifecycle::{self, Shutdown};
use bookshelf::Book;

/// A running service bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST a book and return the stored record.
    pub async fn create(&self, title: &str, author: &str) -> Book {
        let res = self
            .client
            .post(self.url("/books"))
            .json(&serde_json::json!({ "title": title, "author": author }))
            .send()
            .await
            .expect("service unreachable");
        assert_eq!(res.status(), 201);
        res.json().await.unwrap()
    }

    pub async fn list(&self) -> Vec<Book> {
        let res = self.client.get(self.url("/books")).send().await.unwrap();
        assert_eq!(res.status(), 200);
        res.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the service with an in-memory store.
pub async fn start_memory_server() -> TestServer {
    start_server(ServiceConfig::default()).await
}

/// Start the service with a SQLite store at `path`.
#[allow(dead_code)]
pub async fn start_sqlite_server(path: &Path) -> TestServer {
    let mut config = ServiceConfig::default();
    config.storage.backend = StorageBackend::Sqlite;
    config.storage.database_path = path.to_path_buf();
    start_server(config).await
}

async fn start_server(mut config: ServiceConfig) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".to_string();

    let (server, listener) = lifecycle::start(config).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.signal();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    TestServer {
        addr,
        client,
        shutdown,
    }
}
