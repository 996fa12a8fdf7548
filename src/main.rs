//! Book catalogue HTTP service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ listener ─▶ middleware ─▶ router ─▶ handler ─▶ BookStore
//!                                (request id,            (decode,    ├─ MemoryStore (Mutex<Vec<Book>>)
//!                                 trace, timeout,         encode)    └─ SqliteStore (books table)
//!                                 body limit, metrics)
//! ```
//!
//! Startup failures (bad config, unopenable store, busy port) exit non-zero
//! before any request is served.

use std::path::PathBuf;

use clap::Parser;

use bookshelf::config::{read_config, validate_config, ConfigError, ServiceConfig, StorageBackend};
use bookshelf::lifecycle::{self, signals, Shutdown};
use bookshelf::observability::logging;

#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(about = "CRUD HTTP service for books", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Record store, overrides `storage.backend`.
    #[arg(short, long, value_enum)]
    store: Option<StorageBackend>,

    /// SQLite database file, overrides `storage.database_path`.
    #[arg(short, long)]
    database: Option<PathBuf>,
}

impl Cli {
    fn resolve_config(&self) -> Result<ServiceConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(store) = self.store {
            config.storage.backend = store;
        }
        if let Some(database) = &self.database {
            config.storage.database_path = database.clone();
        }

        validate_config(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    logging::init(&config.observability.log_level);

    tracing::info!("bookshelf v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = ?config.storage.backend,
        database_path = %config.storage.database_path.display(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let (server, listener) = lifecycle::start(config).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.signal();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
