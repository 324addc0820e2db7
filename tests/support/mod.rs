#![allow(dead_code)]

pub mod surface;

use std::sync::Arc;

use bookshelf_sync::{
    BookRecord, Config, InMemorySyncService, SessionGate, SessionHandle, SyncServiceExt,
    UserSession,
};

pub use surface::RecordingSurface;

pub type Backend = Arc<InMemorySyncService>;

/// A backend with the given visible books, in that order.
pub fn backend_with_catalog(books: &[(&str, &str)]) -> Backend {
    let service = Arc::new(InMemorySyncService::new());
    for (id, title) in books {
        service.seed(&BookRecord::new(*id, *title)).unwrap();
    }
    service
}

pub fn gate(service: &Backend) -> Arc<SessionGate<InMemorySyncService>> {
    gate_with_config(service, Config::default())
}

pub fn gate_with_config(
    service: &Backend,
    config: Config,
) -> Arc<SessionGate<InMemorySyncService>> {
    Arc::new(SessionGate::new(Arc::clone(service), Arc::new(config)))
}

/// Signs in anonymously, registers as `name`, and re-opens as registration does.
pub fn registered_session(
    service: &Backend,
    gate: &SessionGate<InMemorySyncService>,
    name: &str,
) -> SessionHandle<InMemorySyncService> {
    let anonymous = gate.resolve().unwrap();
    service.register_user(&anonymous.identity().id, name).unwrap();
    gate.reopen_after_registration(&anonymous).unwrap()
}

/// Overwrites the user's favorites as another device would.
pub fn set_favorites(service: &Backend, user_id: &str, ids: &[&str]) {
    let mut user: UserSession = service
        .get::<UserSession>(user_id)
        .unwrap()
        .unwrap()
        .data;
    user.favorite_book_ids = ids.iter().map(|id| id.to_string()).collect();
    service.seed(&user).unwrap();
}

pub fn favorites_of(session: &SessionHandle<InMemorySyncService>) -> Vec<String> {
    session.user().unwrap().unwrap().data.favorite_book_ids
}
