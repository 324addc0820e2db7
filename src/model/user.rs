use serde::{Deserialize, Serialize};

use super::{BookId, Model};

/// How the identity behind a [`UserSession`] authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "anon-user")]
    Anonymous,
    #[serde(rename = "local-userpass")]
    UserPassword,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anonymous => "anon-user",
            ProviderKind::UserPassword => "local-userpass",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserPreferences {
    pub display_name: Option<String>,
}

/// The per-user record: favorites, registration state, and display preferences.
///
/// Created anonymously on first launch and upgraded in place when the user
/// registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserSession {
    pub id: String,
    /// Insertion-ordered, never holds the same id twice.
    pub favorite_book_ids: Vec<BookId>,
    pub provider_kind: ProviderKind,
    pub registered: bool,
    pub user_name: Option<String>,
    pub preferences: UserPreferences,
}

impl UserSession {
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn is_favorite(&self, book_id: &str) -> bool {
        self.favorite_book_ids.iter().any(|id| id == book_id)
    }

    /// Appends `book_id` unless it is already present. Returns whether it was added.
    pub fn add_favorite(&mut self, book_id: &str) -> bool {
        if self.is_favorite(book_id) {
            return false;
        }
        self.favorite_book_ids.push(book_id.to_string());
        true
    }

    /// Removes `book_id` if present. Returns whether it was removed.
    pub fn remove_favorite(&mut self, book_id: &str) -> bool {
        match self.favorite_book_ids.iter().position(|id| id == book_id) {
            Some(index) => {
                self.favorite_book_ids.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.preferences.display_name.as_deref()
    }
}

impl Model for UserSession {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }
}
