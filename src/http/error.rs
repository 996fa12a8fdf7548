//! HTTP error mapping.
//!
//! Every failure a handler can hit ends up as an [`ApiError`], rendered as a
//! plain-text body with the matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by the book handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Path parameter is not a UUID.
    #[error("Invalid book ID: {0}")]
    InvalidId(#[source] uuid::Error),

    /// Request body is not a JSON book.
    #[error("Invalid request payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// No book carries the requested id.
    #[error("Book not found")]
    NotFound,

    /// Storage failed for a reason other than a missing record.
    #[error("Storage error: {0}")]
    Store(#[source] StoreError),
}

impl ApiError {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidId(_) | ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
