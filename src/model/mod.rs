//! Domain model.
//!
//! A single resource type, [`Book`], identified by a server-generated UUID.

pub mod book;

pub use book::{Book, BookDraft};
