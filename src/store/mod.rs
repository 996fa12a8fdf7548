//! Record store subsystem.
//!
//! # Data Flow
//! ```text
//! handler
//!     → BookStore (trait object shared via Arc)
//!     → memory.rs (Mutex<Vec<Book>>, linear scan)
//!       or sqlite.rs (books table, pooled connections on the blocking pool)
//!     → Book | StoreError
//! ```
//!
//! # Design Decisions
//! - One store object per process, built at startup and passed to the router state
//! - `NotFound` is the only domain failure; everything else is internal
//! - No retries: a failed operation is reported to the caller as-is

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig};
use crate::model::{Book, BookDraft};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No live record carries the requested id.
    #[error("book {0} not found")]
    NotFound(Uuid),

    /// SQLite reported a failure (including interrupted statements).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A thread panicked while holding the store lock.
    #[error("book store lock poisoned")]
    Poisoned,

    /// A persisted row carries an id that is not a UUID.
    #[error("stored book has malformed id {0:?}")]
    CorruptId(String),

    /// The caller went away before the operation committed.
    #[error("request cancelled before the operation completed")]
    Cancelled,

    /// The blocking storage task did not complete.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// CRUD operations over the book collection.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Every live record.
    async fn list(&self) -> Result<Vec<Book>, StoreError>;

    /// Exact-match lookup by id.
    async fn get(&self, id: Uuid) -> Result<Book, StoreError>;

    /// Store a new record under a freshly generated id and return it.
    async fn insert(&self, draft: BookDraft) -> Result<Book, StoreError>;

    /// Overwrite title and author of an existing record. Never creates.
    async fn update(&self, id: Uuid, draft: BookDraft) -> Result<Book, StoreError>;

    /// Remove the record with the given id.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Open the store selected by configuration.
///
/// Failing here is a startup failure; the caller should not start serving.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn BookStore>, StoreError> {
    let store: Arc<dyn BookStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.database_path)?),
    };

    tracing::info!(
        backend = store.backend(),
        database_path = %config.database_path.display(),
        "Book store opened"
    );

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_store() {
        let config = StorageConfig::default();
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend(), "memory");
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_sqlite_store_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.db");
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            database_path: path.clone(),
        };

        let store = open_store(&config).unwrap();
        assert_eq!(store.backend(), "sqlite");
        assert!(path.exists());
    }

    #[test]
    fn test_open_sqlite_store_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            database_path: dir.path().join("missing").join("books.db"),
        };

        assert!(matches!(open_store(&config), Err(StoreError::Sqlite(_))));
    }
}
