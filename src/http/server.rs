//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the book routes
//! - Wire up middleware (request ID, tracing, timeout, body limit, metrics)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::ServiceConfig;
use crate::http::handlers;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::store::BookStore;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookStore>,
}

/// HTTP server for the book service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server over an already opened store.
    pub fn new(config: ServiceConfig, store: Arc<dyn BookStore>) -> Self {
        let state = AppState { store };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let middleware_stack = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route(
                "/books",
                get(handlers::list_books).post(handlers::create_book),
            )
            .route(
                "/books/{id}",
                get(handlers::get_book)
                    .put(handlers::update_book)
                    .delete(handlers::delete_book),
            )
            .route_layer(middleware::from_fn(metrics::track_metrics))
            .with_state(state)
            .layer(middleware_stack)
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::model::{Book, BookDraft};
    use crate::store::{MemoryStore, StoreError};

    fn test_router() -> Router {
        HttpServer::new(ServiceConfig::default(), Arc::new(MemoryStore::new())).router()
    }

    async fn send(router: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn create(router: &Router, title: &str, author: &str) -> Book {
        let body = serde_json::json!({ "title": title, "author": author }).to_string();
        let (status, body) = send(router, Method::POST, "/books", &body).await;
        assert_eq!(status, StatusCode::CREATED);
        serde_json::from_str(&body).unwrap()
    }

    #[tokio::test]
    async fn test_list_empty_is_json_array() {
        let router = test_router();
        let (status, body) = send(&router, Method::GET, "/books", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_create_ignores_client_id() {
        let router = test_router();
        let client_id = Uuid::new_v4();
        let body = format!(r#"{{"id":"{}","title":"Dune","author":"Herbert"}}"#, client_id);

        let (status, body) = send(&router, Method::POST, "/books", &body).await;
        assert_eq!(status, StatusCode::CREATED);

        let book: Book = serde_json::from_str(&body).unwrap();
        assert_ne!(book.id, client_id);
        assert_eq!(book.title, "Dune");
    }

    #[tokio::test]
    async fn test_create_malformed_body() {
        let router = test_router();

        let (status, body) = send(&router, Method::POST, "/books", "{\"title\":").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with("Invalid request payload"));

        let (status, _) = send(&router, Method::POST, "/books", r#"{"title":5}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&router, Method::POST, "/books", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let router = test_router();

        for method in [Method::GET, Method::DELETE] {
            let (status, body) = send(&router, method, "/books/not-a-uuid", "").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body.starts_with("Invalid book ID"));
        }

        let (status, _) = send(&router, Method::PUT, "/books/42", r#"{"title":"x"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_book_is_not_found() {
        let router = test_router();
        let uri = format!("/books/{}", Uuid::new_v4());

        let (status, body) = send(&router, Method::GET, &uri, "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Book not found");

        let (status, _) = send(&router, Method::PUT, &uri, r#"{"title":"x","author":"y"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&router, Method::DELETE, &uri, "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&router, Method::GET, "/books", "").await;
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_update_overwrites_both_fields() {
        let router = test_router();
        let book = create(&router, "Dune", "Herbert").await;
        let uri = format!("/books/{}", book.id);

        let (status, body) = send(&router, Method::PUT, &uri, r#"{"title":"Dune Messiah"}"#).await;
        assert_eq!(status, StatusCode::OK);

        let updated: Book = serde_json::from_str(&body).unwrap();
        assert_eq!(updated.id, book.id);
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.author, "");

        let (_, body) = send(&router, Method::GET, &uri, "").await;
        assert_eq!(serde_json::from_str::<Book>(&body).unwrap(), updated);
    }

    #[tokio::test]
    async fn test_delete_returns_confirmation() {
        let router = test_router();
        let book = create(&router, "Dune", "Herbert").await;
        let uri = format!("/books/{}", book.id);

        let (status, body) = send(&router, Method::DELETE, &uri, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, handlers::DELETED_MESSAGE);

        let (status, _) = send(&router, Method::GET, &uri, "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let router = test_router();
        let (status, _) = send(&router, Method::PATCH, "/books", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let router = test_router();
        let request = Request::builder()
            .uri("/books")
            .header(X_REQUEST_ID, "req-123")
            .body(Body::empty())
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[X_REQUEST_ID], "req-123");

        let request = Request::builder().uri("/books").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut config = ServiceConfig::default();
        config.limits.max_body_bytes = 16;
        let router = HttpServer::new(config, Arc::new(MemoryStore::new())).router();

        let body = serde_json::json!({ "title": "x".repeat(64), "author": "y" }).to_string();
        let (status, _) = send(&router, Method::POST, "/books", &body).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    /// Store whose every operation fails with an internal error.
    struct BrokenStore;

    #[async_trait]
    impl BookStore for BrokenStore {
        async fn list(&self) -> Result<Vec<Book>, StoreError> {
            Err(StoreError::Poisoned)
        }
        async fn get(&self, _id: Uuid) -> Result<Book, StoreError> {
            Err(StoreError::Poisoned)
        }
        async fn insert(&self, _draft: BookDraft) -> Result<Book, StoreError> {
            Err(StoreError::Poisoned)
        }
        async fn update(&self, _id: Uuid, _draft: BookDraft) -> Result<Book, StoreError> {
            Err(StoreError::Poisoned)
        }
        async fn delete(&self, _id: Uuid) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    /// Store that answers only after `delay`.
    struct SlowStore {
        delay: Duration,
    }

    #[async_trait]
    impl BookStore for SlowStore {
        async fn list(&self) -> Result<Vec<Book>, StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(Vec::new())
        }
        async fn get(&self, id: Uuid) -> Result<Book, StoreError> {
            tokio::time::sleep(self.delay).await;
            Err(StoreError::NotFound(id))
        }
        async fn insert(&self, draft: BookDraft) -> Result<Book, StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(Book::from_draft(Uuid::new_v4(), draft))
        }
        async fn update(&self, id: Uuid, _draft: BookDraft) -> Result<Book, StoreError> {
            tokio::time::sleep(self.delay).await;
            Err(StoreError::NotFound(id))
        }
        async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
            tokio::time::sleep(self.delay).await;
            Err(StoreError::NotFound(id))
        }
        fn backend(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let mut config = ServiceConfig::default();
        config.timeouts.request_secs = 1;
        let store = SlowStore {
            delay: Duration::from_secs(5),
        };
        let router = HttpServer::new(config, Arc::new(store)).router();

        let (status, _) = send(&router, Method::GET, "/books", "").await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

        let (status, _) = send(&router, Method::POST, "/books", r#"{"title":"x"}"#).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_storage_failure_is_internal_error() {
        let router = HttpServer::new(ServiceConfig::default(), Arc::new(BrokenStore)).router();

        let (status, body) = send(&router, Method::GET, "/books", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("lock poisoned"));

        let (status, _) = send(&router, Method::POST, "/books", r#"{"title":"x"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
