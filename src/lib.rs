mod codec;
mod config;
mod error;
mod favorites;
mod gate;
mod model;
mod observer;
mod preferences;
mod screen;
mod service;
mod session;
mod subscription;
mod surface;
mod view_model;

pub use config::Config;
pub use error::{
    AuthError, FavoritesError, OpenError, PreferencesError, ServiceError, SessionError,
};
pub use favorites::{FavoritesChanged, FavoritesDelta, FavoritesStore, FAVORITES_CHANGED};
pub use gate::{SessionGate, SyncSessionOpener};
pub use model::{
    BookId, BookRecord, ColorSegment, CustomData, Document, Model, ProviderKind,
    UserPreferences, UserSession, Versioned,
};
pub use observer::{ChangeObserver, ObserverState};
pub use preferences::{PreferencesChanged, UserPreferencesModel, PREFERENCES_CHANGED};
pub use screen::{
    action_button_state, registration_prompt, BooksListScreen, FavoritesScreen, LaunchScreen,
    SettingsForm, SettingsScreen,
};
pub use service::{
    ChangeNotification, FaultPoint, InMemorySyncService, NotificationToken, RawChange,
    RawListener, RemoteFunction, StoredObject, SyncService, SyncServiceExt, WriteBatch, WriteOp,
};
pub use session::{Identity, SessionHandle, Transaction};
pub use subscription::{
    OpenMode, Query, QuerySubscription, SubscriptionConfigurator, SubscriptionSpec,
};
pub use surface::{
    ActionButtonState, Alert, Confirmation, ConfirmationPrompt, ConfirmationPrompter,
    RenderSurface,
};
pub use view_model::{render, render_favorites, BookListViewModel, ListKind, RowViewModel};

// Re-export the EventEmitter from the event_emitter_rs crate
pub use event_emitter_rs::EventEmitter;
