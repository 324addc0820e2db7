use serde::{Deserialize, Serialize};

use super::{BookId, Model};

/// A catalog entry. Owned by the backend; the client only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: BookId,
    pub title: String,
    /// Hidden books stay in the store but are left out of the catalog snapshot.
    pub show: bool,
}

impl BookRecord {
    pub fn new(id: impl Into<BookId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            show: true,
        }
    }

    pub fn hidden(id: impl Into<BookId>, title: impl Into<String>) -> Self {
        Self {
            show: false,
            ..Self::new(id, title)
        }
    }
}

impl Model for BookRecord {
    const COLLECTION: &'static str = "books";

    fn id(&self) -> &str {
        &self.id
    }
}
