//! SQLite-backed book store.
//!
//! # Responsibilities
//! - Create the `books` table on startup if absent
//! - Run each operation on a pooled connection inside `spawn_blocking`
//! - Interrupt the in-flight statement when the request future is dropped
//!
//! # Design Decisions
//! - No application-level lock: SQLite's own locking (with a busy timeout) serializes writers
//! - Ids are stored as hyphenated UUID text
//! - Listing is ordered by rowid, i.e. insertion order
//! - Writes run in `BEGIN IMMEDIATE` transactions

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{
    params, Connection, InterruptHandle, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use uuid::Uuid;

use crate::model::{Book, BookDraft};
use crate::store::{BookStore, StoreError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS books (
    id TEXT PRIMARY KEY,
    title TEXT,
    author TEXT
);";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connections kept open between requests.
const MAX_IDLE_CONNECTIONS: usize = 8;

/// Book store persisted to a single SQLite file.
#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = open_connection(&path)?;
        conn.execute_batch(SCHEMA)?;

        tracing::debug!(path = %path.display(), "SQLite schema ready");

        Ok(Self {
            path,
            idle: Mutex::new(vec![conn]),
        })
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn checkout(&self) -> Result<Connection, StoreError> {
        let pooled = self.idle.lock().map_err(|_| StoreError::Poisoned)?.pop();
        match pooled {
            Some(conn) => Ok(conn),
            None => Ok(open_connection(&self.path)?),
        }
    }

    fn checkin(&self, conn: Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < MAX_IDLE_CONNECTIONS {
                idle.push(conn);
            }
        }
    }

    /// Run `op` on a pooled connection off the async runtime.
    ///
    /// Dropping the returned future before completion cancels the operation.
    /// Queued work never starts and a running statement is interrupted. A
    /// write transaction rolls back instead of committing. The connection is
    /// discarded instead of pooled.
    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &CancelFlag) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.checkout()?;
        let flag = CancelFlag::default();
        let mut guard = InterruptOnDrop::new(conn.get_interrupt_handle(), flag.clone());

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = flag.check().and_then(|()| op(&conn, &flag));
            (conn, result)
        })
        .await?;

        guard.disarm();
        self.checkin(conn);
        result
    }
}

/// Run `op` inside an immediate transaction; an error or a cancellation
/// observed before commit rolls it back.
fn write<T>(
    conn: &Connection,
    cancel: &CancelFlag,
    op: impl FnOnce(&Connection) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let out = op(&tx)?;
    cancel.check()?;
    tx.commit()?;
    Ok(out)
}

fn open_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Set once the caller of a storage operation has gone away.
#[derive(Debug, Clone, Default)]
struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.0.load(Ordering::SeqCst) {
            return Err(StoreError::Cancelled);
        }
        Ok(())
    }
}

/// Cancels the blocking work and fires the connection's interrupt handle
/// unless disarmed.
struct InterruptOnDrop {
    armed: Option<(InterruptHandle, CancelFlag)>,
}

impl InterruptOnDrop {
    fn new(handle: InterruptHandle, flag: CancelFlag) -> Self {
        Self {
            armed: Some((handle, flag)),
        }
    }

    fn disarm(&mut self) {
        self.armed = None;
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if let Some((handle, flag)) = self.armed.take() {
            tracing::debug!("Request dropped, cancelling SQLite operation");
            flag.cancel();
            handle.interrupt();
        }
    }
}

type RawBook = (String, Option<String>, Option<String>);

fn raw_book(row: &Row<'_>) -> rusqlite::Result<RawBook> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_book((id, title, author): RawBook) -> Result<Book, StoreError> {
    let parsed = Uuid::parse_str(&id).map_err(|_| StoreError::CorruptId(id.clone()))?;
    Ok(Book {
        id: parsed,
        title: title.unwrap_or_default(),
        author: author.unwrap_or_default(),
    })
}

#[async_trait]
impl BookStore for SqliteStore {
    async fn list(&self) -> Result<Vec<Book>, StoreError> {
        self.run(|conn, _| {
            let mut stmt = conn.prepare("SELECT id, title, author FROM books ORDER BY rowid")?;
            let books = stmt
                .query_map([], raw_book)?
                .map(|row| into_book(row?))
                .collect::<Result<Vec<_>, _>>();
            books
        })
        .await
    }

    async fn get(&self, id: Uuid) -> Result<Book, StoreError> {
        self.run(move |conn, _| {
            conn.query_row(
                "SELECT id, title, author FROM books WHERE id = ?1",
                params![id.to_string()],
                raw_book,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
            .and_then(into_book)
        })
        .await
    }

    async fn insert(&self, draft: BookDraft) -> Result<Book, StoreError> {
        let book = Book::from_draft(Uuid::new_v4(), draft);
        self.run(move |conn, cancel| {
            write(conn, cancel, |conn| {
                conn.execute(
                    "INSERT INTO books (id, title, author) VALUES (?1, ?2, ?3)",
                    params![book.id.to_string(), book.title, book.author],
                )?;
                Ok(book)
            })
        })
        .await
    }

    async fn update(&self, id: Uuid, draft: BookDraft) -> Result<Book, StoreError> {
        self.run(move |conn, cancel| {
            write(conn, cancel, |conn| {
                conn.query_row(
                    "UPDATE books SET title = ?1, author = ?2 WHERE id = ?3
                     RETURNING id, title, author",
                    params![draft.title, draft.author, id.to_string()],
                    raw_book,
                )
                .optional()?
                .ok_or(StoreError::NotFound(id))
                .and_then(into_book)
            })
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.run(move |conn, cancel| {
            write(conn, cancel, |conn| {
                let changed =
                    conn.execute("DELETE FROM books WHERE id = ?1", params![id.to_string()])?;
                if changed == 0 {
                    return Err(StoreError::NotFound(id));
                }
                Ok(())
            })
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
