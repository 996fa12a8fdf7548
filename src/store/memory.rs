//! In-memory book store.
//!
//! The whole collection sits behind one `std::sync::Mutex`. Every operation
//! holds the lock for its full scan, so all store access is serialized.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{Book, BookDraft};
use crate::store::{BookStore, StoreError};

/// Books kept in insertion order for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    books: Mutex<Vec<Book>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Book>>, StoreError> {
        self.books.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Generate an id no live record already uses.
fn fresh_id(books: &[Book]) -> Uuid {
    loop {
        let id = Uuid::new_v4();
        if !books.iter().any(|b| b.id == id) {
            return id;
        }
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.lock()?.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Book, StoreError> {
        self.lock()?
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn insert(&self, draft: BookDraft) -> Result<Book, StoreError> {
        let mut books = self.lock()?;
        let book = Book::from_draft(fresh_id(&books), draft);
        books.push(book.clone());
        Ok(book)
    }

    async fn update(&self, id: Uuid, draft: BookDraft) -> Result<Book, StoreError> {
        let mut books = self.lock()?;
        let book = books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound(id))?;

        book.title = draft.title;
        book.author = draft.author;
        Ok(book.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut books = self.lock()?;
        let index = books
            .iter()
            .position(|b| b.id == id)
            .ok_or(StoreError::NotFound(id))?;

        // `remove` keeps the remaining records in insertion order.
        books.remove(index);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
