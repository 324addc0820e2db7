mod support;

use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use bookshelf_sync::{
    BooksListScreen, ColorSegment, CustomData, FaultPoint, PreferencesChanged, PreferencesError,
    ServiceError, SettingsForm, SettingsScreen, UserPreferencesModel,
};
use serde_json::json;
use support::{backend_with_catalog, gate, registered_session, RecordingSurface};

#[test]
fn transport_failure_keeps_preferences() {
    let service = backend_with_catalog(&[]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    let model = UserPreferencesModel::new(session.clone());
    let before = model.confirmed();

    service.fail_next(
        FaultPoint::RemoteFunction,
        ServiceError::Transport("The Internet connection appears to be offline.".into()),
    );
    let err = model.save_preferences("#000000FF", true).unwrap_err();

    assert_eq!(
        err,
        PreferencesError::RemoteError("The Internet connection appears to be offline.".into())
    );
    assert_eq!(model.confirmed(), before);
}

#[test]
fn refresh_failure_keeps_last_confirmed_preferences() {
    let service = backend_with_catalog(&[]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    let model = UserPreferencesModel::new(session.clone());
    model.save_segment(ColorSegment::Red, false).unwrap();

    service.fail_next(
        FaultPoint::RefreshCustomData,
        ServiceError::Transport("timed out".into()),
    );
    let err = model.save_segment(ColorSegment::Black, true).unwrap_err();

    assert!(matches!(err, PreferencesError::RemoteError(_)));
    assert_eq!(model.confirmed(), CustomData::new("#B22222FF", false));
    assert_eq!(session.custom_data(), CustomData::new("#B22222FF", false));
}

#[test]
fn settings_screen_saves_and_paints() {
    let service = backend_with_catalog(&[]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    let surface = Arc::new(RecordingSurface::confirming());
    let screen = SettingsScreen::new(session, Arc::clone(&surface));

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    screen
        .model()
        .on_preferences_changed(move |event: PreferencesChanged| {
            let _ = tx.lock().unwrap().send(event);
        });

    assert_eq!(
        screen.form(),
        SettingsForm {
            color: ColorSegment::Blue,
            full_image_quality: false,
        }
    );

    let form = SettingsForm {
        color: ColorSegment::Black,
        full_image_quality: true,
    };
    let event = screen.save(&form).unwrap();

    assert_eq!(event.color, "#000000FF");
    assert_eq!(event.color_code, 1);
    assert_eq!(screen.form(), form);
    assert_eq!(surface.accents(), vec!["#000000FF"]);
    assert_eq!(surface.loading_history(), vec![true, false]);

    let emitted = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(emitted, event);
}

#[test]
fn settings_screen_reports_user_error() {
    let service = backend_with_catalog(&[]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    service.register_function("updateCustomData", |_, _| {
        Ok(Some(json!({ "error": "preferences are read-only" })))
    });
    let surface = Arc::new(RecordingSurface::confirming());
    let screen = SettingsScreen::new(session, Arc::clone(&surface));

    let saved = screen.save(&SettingsForm {
        color: ColorSegment::Red,
        full_image_quality: true,
    });

    assert!(saved.is_none());
    let alerts = surface.alerts();
    assert_eq!(alerts[0].title, "Error");
    assert_eq!(alerts[0].message, "preferences are read-only");
    assert!(surface.accents().is_empty());
    assert_eq!(screen.form().color, ColorSegment::Blue);
}

#[test]
fn malformed_result_is_reported() {
    let service = backend_with_catalog(&[]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    service.register_function("updateCustomData", |_, _| Ok(None));
    let surface = Arc::new(RecordingSurface::confirming());
    let screen = SettingsScreen::new(session, Arc::clone(&surface));

    assert!(screen
        .save(&SettingsForm {
            color: ColorSegment::Red,
            full_image_quality: false,
        })
        .is_none());
    assert_eq!(
        surface.alerts()[0].message,
        "Unexpected result returned from server"
    );
}

#[test]
fn list_screen_paints_confirmed_accent() {
    let service = backend_with_catalog(&[("b1", "Dune")]);
    let gate = gate(&service);
    let session = registered_session(&service, &gate, "reader");
    let settings_surface = Arc::new(RecordingSurface::confirming());
    let list_surface = Arc::new(RecordingSurface::confirming());
    let settings = SettingsScreen::new(session.clone(), Arc::clone(&settings_surface));
    let mut list = BooksListScreen::new(Arc::clone(&gate), session, Arc::clone(&list_surface));

    list.appear();
    let event = settings
        .save(&SettingsForm {
            color: ColorSegment::Red,
            full_image_quality: false,
        })
        .unwrap();
    list.apply_preferences(&event);
    list.disappear();
    list.appear();

    assert_eq!(
        list_surface.accents(),
        vec!["#1AA7ECFF", "#B22222FF", "#B22222FF"]
    );
}
