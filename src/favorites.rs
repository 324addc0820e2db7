//! Favorites reconciliation.
//!
//! Every mutation of a user's favorites runs as a transaction against the
//! synchronized store: read the user record, decide, write, commit. A commit
//! that loses a race with another writer is retried from a fresh read, so a
//! toggle never acts on a stale membership check and never loses someone
//! else's update.
//!
//! Screens do not listen for [`FavoritesChanged`]. Their rows follow the
//! committed user record through a [`ChangeObserver`](crate::ChangeObserver),
//! which sees writes from every device alike. The event is for other parts of
//! the app that care about this store's own commits.
//!
//! ## Example
//!
//! ```ignore
//! let store = FavoritesStore::new(session.clone());
//! store.on_favorites_changed(|event| println!("{:?}", event.delta));
//!
//! match store.toggle_favorite("b1", &surface) {
//!     Ok(FavoritesDelta::Added(id)) => println!("added {}", id),
//!     Ok(_) => {}
//!     Err(FavoritesError::Unauthorized { .. }) => { /* ask to register */ }
//!     Err(err) => eprintln!("{}", err),
//! }
//! ```

use std::sync::Mutex;

use event_emitter_rs::EventEmitter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{FavoritesError, ServiceError};
use crate::model::{BookId, BookRecord, UserSession};
use crate::service::{SyncService, SyncServiceExt};
use crate::session::SessionHandle;
use crate::surface::{Confirmation, ConfirmationPrompt, ConfirmationPrompter};

pub const FAVORITES_CHANGED: &str = "FavoritesChanged";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FavoritesDelta {
    Added(BookId),
    Removed(BookId),
    /// Cancelled, or the store already had the requested membership.
    Unchanged,
}

/// Emitted after a favorites transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritesChanged {
    pub user_id: String,
    pub delta: FavoritesDelta,
    pub favorite_book_ids: Vec<BookId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Add,
    Remove,
}

impl Intent {
    fn prompt(&self, title: &str) -> ConfirmationPrompt {
        match self {
            Intent::Add => ConfirmationPrompt {
                title: "Add to favorites".into(),
                message: format!("Do you want to add {} as favorite?", title),
                confirm_label: "Add".into(),
                cancel_label: "Cancel".into(),
            },
            Intent::Remove => ConfirmationPrompt {
                title: "Remove from favorites".into(),
                message: format!("Do you want to remove {} from your favorite list?", title),
                confirm_label: "Accept".into(),
                cancel_label: "Cancel".into(),
            },
        }
    }
}

pub struct FavoritesStore<S> {
    session: SessionHandle<S>,
    emitter: Mutex<EventEmitter>,
}

impl<S: SyncService> FavoritesStore<S> {
    pub fn new(session: SessionHandle<S>) -> Self {
        Self {
            session,
            emitter: Mutex::new(EventEmitter::new()),
        }
    }

    pub fn session(&self) -> &SessionHandle<S> {
        &self.session
    }

    /// Register a listener for [`FavoritesChanged`]. Listeners run off-thread
    /// after the commit. Returns the listener id.
    pub fn on_favorites_changed<F>(&self, listener: F) -> Option<String>
    where
        F: Fn(FavoritesChanged) + Send + Sync + 'static,
    {
        match self.emitter.lock() {
            Ok(mut emitter) => Some(emitter.on(FAVORITES_CHANGED, listener)),
            Err(_) => {
                warn!("favorites emitter lock poisoned");
                None
            }
        }
    }

    /// Current favorites, read from the store.
    pub fn favorite_book_ids(&self) -> Result<Vec<BookId>, FavoritesError> {
        Ok(self.user()?.favorite_book_ids)
    }

    /// Adds the book if it is not a favorite, removes it otherwise, after the
    /// user confirms. Cancelling leaves everything untouched.
    #[instrument(skip(self, prompter), fields(user_id = %self.session.identity().id))]
    pub fn toggle_favorite(
        &self,
        book_id: &str,
        prompter: &dyn ConfirmationPrompter,
    ) -> Result<FavoritesDelta, FavoritesError> {
        let user = self.registered_user()?;
        let intent = if user.is_favorite(book_id) {
            Intent::Remove
        } else {
            Intent::Add
        };

        let prompt = intent.prompt(&self.title_of(book_id));
        if prompter.prompt_confirmation(&prompt) == Confirmation::Cancelled {
            debug!(book_id, "favorite toggle cancelled");
            return Ok(FavoritesDelta::Unchanged);
        }

        self.apply(book_id, intent)
    }

    /// Removes the book without prompting.
    #[instrument(skip(self), fields(user_id = %self.session.identity().id))]
    pub fn remove_favorite(&self, book_id: &str) -> Result<FavoritesDelta, FavoritesError> {
        self.registered_user()?;
        self.apply(book_id, Intent::Remove)
    }

    fn user(&self) -> Result<UserSession, FavoritesError> {
        let user_id = &self.session.identity().id;
        self.session
            .user()
            .map_err(|err| FavoritesError::ReadFailed(err.to_string()))?
            .map(|record| record.data)
            .ok_or_else(|| FavoritesError::MissingUser(user_id.clone()))
    }

    fn registered_user(&self) -> Result<UserSession, FavoritesError> {
        let user = self.user()?;
        if !user.registered {
            return Err(FavoritesError::Unauthorized { user_id: user.id });
        }
        Ok(user)
    }

    fn title_of(&self, book_id: &str) -> String {
        match self.session.service().get::<BookRecord>(book_id) {
            Ok(Some(book)) => book.data.title,
            _ => String::new(),
        }
    }

    fn apply(&self, book_id: &str, intent: Intent) -> Result<FavoritesDelta, FavoritesError> {
        let user_id = self.session.identity().id.clone();
        let max_attempts = self.session.config().max_transaction_attempts.max(1);
        let conflict = |err: ServiceError| FavoritesError::WriteConflict(err.to_string());
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut tx = self.session.begin_transaction();
            let mut user: UserSession = tx
                .read(&user_id)
                .map_err(|err| FavoritesError::ReadFailed(err.to_string()))?
                .ok_or_else(|| FavoritesError::MissingUser(user_id.clone()))?;
            if !user.registered {
                return Err(FavoritesError::Unauthorized { user_id });
            }

            let delta = match intent {
                Intent::Add if user.add_favorite(book_id) => FavoritesDelta::Added(book_id.into()),
                Intent::Remove if user.remove_favorite(book_id) => {
                    FavoritesDelta::Removed(book_id.into())
                }
                _ => FavoritesDelta::Unchanged,
            };
            if delta == FavoritesDelta::Unchanged {
                tx.abort();
                debug!(book_id, ?intent, "membership already as requested");
                return Ok(delta);
            }

            tx.put(&user).map_err(conflict)?;
            match tx.commit() {
                Ok(()) => {
                    info!(book_id, ?delta, attempt, "favorites committed");
                    self.emit(FavoritesChanged {
                        user_id,
                        delta: delta.clone(),
                        favorite_book_ids: user.favorite_book_ids,
                    });
                    return Ok(delta);
                }
                Err(ServiceError::ConcurrentWrite { .. }) if attempt < max_attempts => {
                    warn!(book_id, attempt, "favorites changed underneath, re-reading");
                }
                Err(err) => return Err(conflict(err)),
            }
        }
    }

    fn emit(&self, event: FavoritesChanged) {
        match self.emitter.lock() {
            Ok(mut emitter) => {
                emitter.emit(FAVORITES_CHANGED, event);
            }
            Err(_) => warn!("favorites emitter lock poisoned"),
        }
    }
}
