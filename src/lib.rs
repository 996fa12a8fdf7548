//! Book catalogue HTTP service library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod store;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use model::{Book, BookDraft};
pub use store::{BookStore, MemoryStore, SqliteStore, StoreError};
