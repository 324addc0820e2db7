//! Records held in the synchronized store.
//!
//! Every record type implements [`Model`], which names the collection it lives
//! in and exposes its primary key. Reads from the store come back wrapped in
//! [`Versioned`], whose version is what a transaction checks on commit.
//!
//! ## Example
//!
//! ```ignore
//! use bookshelf_sync::{BookRecord, Model};
//!
//! let book = BookRecord::new("b1", "Dune");
//! assert_eq!(BookRecord::COLLECTION, "books");
//! assert_eq!(book.id(), "b1");
//! ```

mod book;
mod custom_data;
mod user;

use serde::{de::DeserializeOwned, Serialize};

/// Identifier of a [`BookRecord`].
pub type BookId = String;

/// Trait for types that can be stored as synchronized objects.
pub trait Model: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The collection name for this model type.
    const COLLECTION: &'static str;

    /// Returns the unique identifier for this model instance.
    fn id(&self) -> &str;
}

/// A record together with the store version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub data: T,
    pub version: u64,
}

/// Storage key for a record: `"collection:id"`.
pub fn object_key(collection: &str, id: &str) -> String {
    format!("{}:{}", collection, id)
}

pub use book::BookRecord;
pub use custom_data::{ColorSegment, CustomData, Document};
pub use user::{ProviderKind, UserPreferences, UserSession};
