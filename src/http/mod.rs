//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → route table: GET/POST /books, GET/PUT/DELETE /books/{id}
//!     → handlers.rs (decode → one store call → encode)
//!     → error.rs (store/validation failures → status + text)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, HttpServer, X_REQUEST_ID};
