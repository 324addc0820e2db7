//! Screen controllers.
//!
//! Each screen owns the components for one view and talks to a
//! [`RenderSurface`]. Every failure from a round trip ends at the screen as a
//! dialog; nothing propagates further.
//!
//! List rows are re-derived whenever the observed user record changes, so a
//! screen picks up its own commits and other devices' the same way. None of
//! them subscribe to `FavoritesChanged`.

mod books;
mod favorites;
mod launch;
mod settings;

pub use books::BooksListScreen;
pub use favorites::FavoritesScreen;
pub use launch::LaunchScreen;
pub use settings::{SettingsForm, SettingsScreen};

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, error};

use crate::error::FavoritesError;
use crate::model::UserSession;
use crate::service::SyncService;
use crate::session::SessionHandle;
use crate::surface::{ActionButtonState, Alert, RenderSurface};
use crate::view_model::BookListViewModel;

pub const REGISTER_TITLE: &str = "Register";

/// Anonymous users get an enabled "Register" action and no shortcuts;
/// registered users see their name on a disabled action.
pub fn action_button_state(user: &UserSession) -> ActionButtonState {
    if user.registered {
        ActionButtonState {
            enabled: false,
            title: user
                .display_name()
                .or(user.user_name.as_deref())
                .unwrap_or_default()
                .to_string(),
            shortcuts_enabled: true,
        }
    } else {
        ActionButtonState {
            enabled: true,
            title: REGISTER_TITLE.to_string(),
            shortcuts_enabled: false,
        }
    }
}

pub fn registration_prompt(title: &str) -> Alert {
    Alert::new(
        "Register!",
        format!("To save {} as a favorite, you need to register first", title),
    )
}

fn lock_view(view: &Mutex<BookListViewModel>) -> MutexGuard<'_, BookListViewModel> {
    match view.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Recomputes `view` from the store and pushes the rows and the action state
/// to the surface. `user` is the record a change notification carried, when
/// there is one; otherwise it is read.
fn rederive<S, R>(
    session: &SessionHandle<S>,
    view: &Mutex<BookListViewModel>,
    surface: &R,
    user: Option<&UserSession>,
) where
    S: SyncService,
    R: RenderSurface + ?Sized,
{
    let loaded;
    let user = match user {
        Some(user) => user,
        None => match session.user() {
            Ok(Some(record)) => {
                loaded = record.data;
                &loaded
            }
            Ok(None) => {
                debug!("no user record to derive from");
                return;
            }
            Err(err) => {
                error!(error = %err, "could not read user record");
                return;
            }
        },
    };

    let catalog = match session.catalog() {
        Ok(catalog) => catalog,
        Err(err) => {
            error!(error = %err, "could not read catalog");
            return;
        }
    };

    let rows = lock_view(view)
        .recompute(&catalog, &user.favorite_book_ids)
        .to_vec();
    debug!(rows = rows.len(), "rows derived");
    surface.render_rows(&rows);
    surface.set_action_button_state(&action_button_state(user));
}

/// Turns a favorites failure into the dialog for it.
fn report_favorites_error<R>(surface: &R, err: &FavoritesError, title: &str)
where
    R: RenderSurface + ?Sized,
{
    match err {
        FavoritesError::Unauthorized { .. } => {
            surface.show_registration(&registration_prompt(title));
        }
        other => {
            error!(error = %other, "favorites update failed");
            surface.show_alert(&Alert::error(other));
        }
    }
}
