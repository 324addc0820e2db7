use std::sync::{Arc, Mutex};

use tracing::{debug, error, info};

use crate::favorites::{FavoritesDelta, FavoritesStore};
use crate::gate::SessionGate;
use crate::observer::ChangeObserver;
use crate::preferences::PreferencesChanged;
use crate::service::SyncService;
use crate::session::SessionHandle;
use crate::surface::{Alert, RenderSurface};
use crate::view_model::{BookListViewModel, ListKind, RowViewModel};

use super::{lock_view, rederive, report_favorites_error};

/// The catalog, with favorites marked and the user action button.
pub struct BooksListScreen<S, R> {
    gate: Arc<SessionGate<S>>,
    surface: Arc<R>,
    session: SessionHandle<S>,
    favorites: FavoritesStore<S>,
    view: Arc<Mutex<BookListViewModel>>,
    observer: Option<ChangeObserver>,
}

impl<S, R> BooksListScreen<S, R>
where
    S: SyncService,
    R: RenderSurface + 'static,
{
    pub fn new(gate: Arc<SessionGate<S>>, session: SessionHandle<S>, surface: Arc<R>) -> Self {
        Self {
            gate,
            surface,
            favorites: FavoritesStore::new(session.clone()),
            session,
            view: Arc::new(Mutex::new(BookListViewModel::new(ListKind::Catalog))),
            observer: None,
        }
    }

    pub fn session(&self) -> &SessionHandle<S> {
        &self.session
    }

    pub fn favorites(&self) -> &FavoritesStore<S> {
        &self.favorites
    }

    pub fn rows(&self) -> Vec<RowViewModel> {
        lock_view(&self.view).rows().to_vec()
    }

    pub fn is_observing(&self) -> bool {
        self.observer
            .as_ref()
            .map(ChangeObserver::is_observing)
            .unwrap_or(false)
    }

    /// Paints the accent color, starts observing the user, and renders.
    pub fn appear(&mut self) {
        self.surface.set_accent_color(&self.accent_color());
        self.observe();
        self.refresh();
    }

    pub fn disappear(&mut self) {
        if let Some(mut observer) = self.observer.take() {
            observer.stop();
        }
    }

    /// Re-derives rows from the store now.
    pub fn refresh(&self) {
        rederive(&self.session, &self.view, &*self.surface, None);
    }

    /// Toggles the book at `position` after confirmation. Unregistered users
    /// are sent to registration instead.
    pub fn select_row(&self, position: usize) -> Option<FavoritesDelta> {
        let Some(row) = lock_view(&self.view).row(position).cloned() else {
            debug!(position, "no row at position");
            return None;
        };

        match self.favorites.toggle_favorite(&row.book_id, &*self.surface) {
            Ok(delta) => {
                if !self.is_observing() {
                    self.refresh();
                }
                Some(delta)
            }
            Err(err) => {
                report_favorites_error(&*self.surface, &err, &row.title);
                None
            }
        }
    }

    /// The user action button. Only does something for unregistered users,
    /// whom it sends to registration. Returns whether it did.
    pub fn user_action(&self) -> bool {
        let registered = matches!(
            self.session.user(),
            Ok(Some(record)) if record.data.registered
        );
        if registered {
            return false;
        }
        self.surface.show_registration(&Alert::new(
            "Register!",
            "Register to keep favorites and settings",
        ));
        true
    }

    /// Called once registration succeeded: re-opens the session without
    /// re-running subscriptions, then resumes observing and re-renders.
    /// Listeners registered on the previous [`FavoritesStore`] are dropped.
    pub fn did_register(&mut self) -> bool {
        self.surface.set_loading_indicator(true);
        let result = self.gate.reopen_after_registration(&self.session);
        self.surface.set_loading_indicator(false);

        let session = match result {
            Ok(session) => session,
            Err(err) => {
                error!(error = %err, "re-open after registration failed");
                self.surface.show_alert(&Alert::error(&err));
                return false;
            }
        };

        let was_observing = self.observer.is_some();
        self.disappear();
        self.favorites = FavoritesStore::new(session.clone());
        self.session = session;
        info!(
            user_id = %self.session.identity().id,
            "session re-opened after registration"
        );

        if was_observing {
            self.observe();
        }
        self.refresh();
        true
    }

    pub fn apply_preferences(&self, event: &PreferencesChanged) {
        self.surface.set_accent_color(&event.color);
    }

    fn accent_color(&self) -> String {
        self.session
            .custom_data()
            .color
            .unwrap_or_else(|| self.session.config().default_color.clone())
    }

    fn observe(&mut self) {
        self.disappear();
        let session = self.session.clone();
        let view = Arc::clone(&self.view);
        let surface = Arc::clone(&self.surface);

        match ChangeObserver::start(&self.session, move |user| {
            rederive(&session, &view, &*surface, Some(user));
        }) {
            Ok(observer) => self.observer = Some(observer),
            Err(err) => {
                error!(error = %err, "could not observe user");
                self.surface.show_alert(&Alert::error(&err));
            }
        }
    }
}
