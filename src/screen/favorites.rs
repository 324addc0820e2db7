use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use crate::favorites::{FavoritesDelta, FavoritesStore};
use crate::observer::ChangeObserver;
use crate::service::SyncService;
use crate::session::SessionHandle;
use crate::surface::{Alert, RenderSurface};
use crate::view_model::{BookListViewModel, ListKind, RowViewModel};

use super::{lock_view, rederive, report_favorites_error};

/// Only the user's favorites, in the order they were added.
pub struct FavoritesScreen<S, R> {
    surface: Arc<R>,
    session: SessionHandle<S>,
    favorites: FavoritesStore<S>,
    view: Arc<Mutex<BookListViewModel>>,
    observer: Option<ChangeObserver>,
}

impl<S, R> FavoritesScreen<S, R>
where
    S: SyncService,
    R: RenderSurface + 'static,
{
    pub fn new(session: SessionHandle<S>, surface: Arc<R>) -> Self {
        Self {
            surface,
            favorites: FavoritesStore::new(session.clone()),
            session,
            view: Arc::new(Mutex::new(BookListViewModel::new(ListKind::Favorites))),
            observer: None,
        }
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

    pub fn appear(&mut self) {
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
        self.refresh();
    }

    pub fn disappear(&mut self) {
        if let Some(mut observer) = self.observer.take() {
            observer.stop();
        }
    }

    pub fn refresh(&self) {
        rederive(&self.session, &self.view, &*self.surface, None);
    }

    /// Swipe-to-delete. The position is resolved against the rows as they
    /// are rendered, never against the stored order.
    pub fn delete_row(&self, position: usize) -> Option<FavoritesDelta> {
        let Some(row) = lock_view(&self.view).row(position).cloned() else {
            debug!(position, "no row at position");
            return None;
        };

        match self.favorites.remove_favorite(&row.book_id) {
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
}
