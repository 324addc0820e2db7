//! Display preferences stored in the user's custom data.
//!
//! A save is two round trips: the remote function that writes the document,
//! then a refresh of the authoritative custom data. Only after the refresh
//! succeeds does the new value become the confirmed one. Until then, and on
//! any failure, readers keep seeing the previously confirmed preferences.

use std::sync::Mutex;

use event_emitter_rs::EventEmitter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::error::PreferencesError;
use crate::model::{ColorSegment, CustomData};
use crate::service::SyncService;
use crate::session::SessionHandle;

pub const PREFERENCES_CHANGED: &str = "PreferencesChanged";

/// Emitted once a save has been confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesChanged {
    pub color: String,
    pub color_code: u8,
    pub full_image_quality: bool,
}

impl PreferencesChanged {
    fn from_confirmed(data: &CustomData, default_color: &str) -> Self {
        let color = data.color.clone().unwrap_or_else(|| default_color.to_string());
        Self {
            color_code: data.color_segment().code(),
            color,
            full_image_quality: data.full_image,
        }
    }
}

pub struct UserPreferencesModel<S> {
    session: SessionHandle<S>,
    emitter: Mutex<EventEmitter>,
}

impl<S: SyncService> UserPreferencesModel<S> {
    pub fn new(session: SessionHandle<S>) -> Self {
        Self {
            session,
            emitter: Mutex::new(EventEmitter::new()),
        }
    }

    /// The last preferences the server confirmed.
    pub fn confirmed(&self) -> CustomData {
        self.session.custom_data()
    }

    /// Accent color to paint with: confirmed color, or the configured default.
    pub fn accent_color(&self) -> String {
        self.confirmed()
            .color
            .unwrap_or_else(|| self.session.config().default_color.clone())
    }

    pub fn on_preferences_changed<F>(&self, listener: F) -> Option<String>
    where
        F: Fn(PreferencesChanged) + Send + Sync + 'static,
    {
        match self.emitter.lock() {
            Ok(mut emitter) => Some(emitter.on(PREFERENCES_CHANGED, listener)),
            Err(_) => {
                warn!("preferences emitter lock poisoned");
                None
            }
        }
    }

    #[instrument(skip(self), fields(user_id = %self.session.identity().id))]
    pub fn save_preferences(
        &self,
        accent_color: &str,
        full_image_quality: bool,
    ) -> Result<PreferencesChanged, PreferencesError> {
        let args = [
            Value::String(accent_color.to_string()),
            Value::Bool(full_image_quality),
        ];
        let function = &self.session.config().update_custom_data_function;

        let result = self
            .session
            .service()
            .invoke_remote_function(self.session.identity(), function, &args)
            .map_err(|err| {
                error!(error = %err, "custom data update failed");
                PreferencesError::RemoteError(err.to_string())
            })?;
        check_result(result)?;

        let confirmed = self.session.refresh_custom_data().map_err(|err| {
            error!(error = %err, "custom data refresh failed");
            PreferencesError::RemoteError(err.to_string())
        })?;

        let event =
            PreferencesChanged::from_confirmed(&confirmed, &self.session.config().default_color);
        info!(
            color = %event.color,
            full_image_quality = event.full_image_quality,
            "preferences saved"
        );
        self.emit(event.clone());
        Ok(event)
    }

    /// [`Self::save_preferences`] with a palette color.
    pub fn save_segment(
        &self,
        color: ColorSegment,
        full_image_quality: bool,
    ) -> Result<PreferencesChanged, PreferencesError> {
        self.save_preferences(color.hex(), full_image_quality)
    }

    fn emit(&self, event: PreferencesChanged) {
        match self.emitter.lock() {
            Ok(mut emitter) => {
                emitter.emit(PREFERENCES_CHANGED, event);
            }
            Err(_) => warn!("preferences emitter lock poisoned"),
        }
    }
}

/// A successful call must return a document; an `error` field in it is an
/// application-level failure.
fn check_result(result: Option<Value>) -> Result<(), PreferencesError> {
    let Some(Value::Object(document)) = result else {
        return Err(PreferencesError::MalformedResult);
    };
    match document.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(message)) => Err(PreferencesError::UserError(message.clone())),
        Some(other) => Err(PreferencesError::UserError(other.to_string())),
    }
}
