mod support;

use std::sync::Arc;

use bookshelf_sync::{
    ActionButtonState, BooksListScreen, Confirmation, FaultPoint, FavoritesDelta,
    FavoritesScreen, LaunchScreen, ServiceError,
};
use support::{
    backend_with_catalog, favorites_of, gate, registered_session, set_favorites, RecordingSurface,
};

#[test]
fn launch_signs_in_behind_loading_indicator() {
    let service = backend_with_catalog(&[("b1", "Dune")]);
    let surface = RecordingSurface::confirming();
    let launch = LaunchScreen::new(gate(&service));

    let session = launch.start(&surface).unwrap();

    assert!(session.identity().is_anonymous());
    assert_eq!(surface.loading_history(), vec![true, false]);
    assert!(surface.alerts().is_empty());
}

#[test]
fn launch_failure_shows_alert() {
    let service = backend_with_catalog(&[]);
    service.fail_next(FaultPoint::SignIn, ServiceError::Transport("offline".into()));
    let surface = RecordingSurface::confirming();
    let launch = LaunchScreen::new(gate(&service));

    assert!(launch.start(&surface).is_none());

    let alerts = surface.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Error");
    assert_eq!(alerts[0].message, "failed to log in: offline");
    assert_eq!(surface.loading_history(), vec![true, false]);

    // The user retries by launching again.
    assert!(launch.start(&surface).is_some());
}

#[test]
fn anonymous_list_offers_registration() {
    let service = backend_with_catalog(&[("b1", "Dune"), ("b2", "Emma")]);
    let gate = gate(&service);
    let session = gate.resolve().unwrap();
    let surface = Arc::new(RecordingSurface::confirming());
    let mut screen =
        BooksListScreen::new(Arc::clone(&gate), session.clone(), Arc::clone(&surface));

    screen.appear();

    assert_eq!(surface.last_rows().len(), 2);
    assert_eq!(
        surface.last_button(),
        Some(ActionButtonState {
            enabled: true,
            title: "Register".into(),
            shortcuts_enabled: false,
        })
    );

    assert_eq!(screen.select_row(1), None);
    let registrations = surface.registrations();
    assert_eq!(registrations[0].title, "Register!");
    assert_eq!(
        registrations[0].message,
        "To save Emma as a favorite, you need to register first"
    );
    assert!(surface.prompts().is_empty());
    assert!(favorites_of(&session).is_empty());

    assert!(screen.user_action());
    assert_eq!(surface.registrations().len(), 2);
}

#[test]
fn registration_reopens_and_enables_favorites() {
    let service = backend_with_catalog(&[("b1", "Dune"), ("b2", "Emma")]);
    let gate = gate(&service);
    let session = gate.resolve().unwrap();
    let surface = Arc::new(RecordingSurface::confirming());
    let mut screen =
        BooksListScreen::new(Arc::clone(&gate), session.clone(), Arc::clone(&surface));
    screen.appear();

    service.register_user(&session.identity().id, "Ada").unwrap();
    assert!(screen.did_register());

    assert!(!screen.session().subscriptions().rerun_on_open);
    assert!(screen.is_observing());
    assert_eq!(
        surface.last_button(),
        Some(ActionButtonState {
            enabled: false,
            title: "Ada".into(),
            shortcuts_enabled: true,
        })
    );
    assert!(!screen.user_action());

    assert_eq!(screen.select_row(0), Some(FavoritesDelta::Added("b1".into())));
    let flags: Vec<_> = surface
        .last_rows()
        .into_iter()
        .map(|row| row.is_favorite)
        .collect();
    assert_eq!(flags, vec![true, false]);
}

#[test]
fn cancelled_selection_leaves_rows_alone() {
    let service = backend_with_catalog(&[("b1", "Dune")]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    let surface = Arc::new(RecordingSurface::confirming());
    let mut screen =
        BooksListScreen::new(Arc::clone(&gate), session.clone(), Arc::clone(&surface));
    screen.appear();
    let renders = surface.render_count();

    surface.answer_next(Confirmation::Cancelled);
    assert_eq!(screen.select_row(0), Some(FavoritesDelta::Unchanged));

    assert_eq!(surface.render_count(), renders);
    assert!(favorites_of(&session).is_empty());
}

#[test]
fn write_conflict_is_reported() {
    let service = backend_with_catalog(&[("b1", "Dune")]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    let surface = Arc::new(RecordingSurface::confirming());
    let mut screen =
        BooksListScreen::new(Arc::clone(&gate), session.clone(), Arc::clone(&surface));
    screen.appear();

    service.invalidate_sessions().unwrap();
    assert_eq!(screen.select_row(0), None);

    let alerts = surface.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Error");
    assert_eq!(alerts[0].message, "session is no longer valid");
    assert!(favorites_of(&session).is_empty());
}

#[test]
fn both_screens_follow_the_same_user() {
    let service = backend_with_catalog(&[("b1", "Dune"), ("b2", "Emma")]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    let list_surface = Arc::new(RecordingSurface::confirming());
    let favorites_surface = Arc::new(RecordingSurface::confirming());

    let mut list =
        BooksListScreen::new(Arc::clone(&gate), session.clone(), Arc::clone(&list_surface));
    let mut favorites = FavoritesScreen::new(session.clone(), Arc::clone(&favorites_surface));
    list.appear();
    favorites.appear();
    assert!(favorites_surface.last_rows().is_empty());

    list.select_row(1).unwrap();

    let rows = favorites_surface.last_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Emma");

    favorites.delete_row(0).unwrap();
    assert!(!list_surface.last_rows()[1].is_favorite);
}

#[test]
fn leaving_the_screen_stops_observation() {
    let service = backend_with_catalog(&[("b1", "Dune")]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    let user_id = session.identity().id.clone();
    let surface = Arc::new(RecordingSurface::confirming());
    let mut screen =
        BooksListScreen::new(Arc::clone(&gate), session.clone(), Arc::clone(&surface));

    screen.appear();
    assert_eq!(service.listener_count("users", &user_id), 1);

    screen.disappear();
    assert!(!screen.is_observing());
    assert_eq!(service.listener_count("users", &user_id), 0);

    let renders = surface.render_count();
    set_favorites(&service, &user_id, &["b1"]);
    assert_eq!(surface.render_count(), renders);
}

#[test]
fn dropping_the_screen_releases_observation() {
    let service = backend_with_catalog(&[("b1", "Dune")]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    let user_id = session.identity().id.clone();
    let surface = Arc::new(RecordingSurface::confirming());

    {
        let mut screen = FavoritesScreen::new(session.clone(), Arc::clone(&surface));
        screen.appear();
        assert_eq!(service.listener_count("users", &user_id), 1);
    }

    assert_eq!(service.listener_count("users", &user_id), 0);
}

#[test]
fn deleted_user_stops_derivation() {
    let service = backend_with_catalog(&[("b1", "Dune")]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    let user_id = session.identity().id.clone();
    let surface = Arc::new(RecordingSurface::confirming());
    let mut screen =
        BooksListScreen::new(Arc::clone(&gate), session.clone(), Arc::clone(&surface));
    screen.appear();

    let user = session.user().unwrap().unwrap().data;
    service.delete_user(&user_id).unwrap();
    assert!(!screen.is_observing());
    assert_eq!(service.listener_count("users", &user_id), 0);

    let renders = surface.render_count();
    service.seed(&user).unwrap();
    assert_eq!(surface.render_count(), renders);
}
