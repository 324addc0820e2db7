use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::model::ColorSegment;
use crate::preferences::{PreferencesChanged, UserPreferencesModel};
use crate::service::SyncService;
use crate::session::SessionHandle;
use crate::surface::{Alert, RenderSurface};

/// What the settings form shows and edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsForm {
    pub color: ColorSegment,
    pub full_image_quality: bool,
}

pub struct SettingsScreen<S, R> {
    model: UserPreferencesModel<S>,
    surface: Arc<R>,
}

impl<S, R> SettingsScreen<S, R>
where
    S: SyncService,
    R: RenderSurface,
{
    pub fn new(session: SessionHandle<S>, surface: Arc<R>) -> Self {
        Self {
            model: UserPreferencesModel::new(session),
            surface,
        }
    }

    pub fn model(&self) -> &UserPreferencesModel<S> {
        &self.model
    }

    /// The form filled from the confirmed preferences.
    pub fn form(&self) -> SettingsForm {
        let confirmed = self.model.confirmed();
        SettingsForm {
            color: confirmed.color_segment(),
            full_image_quality: confirmed.full_image,
        }
    }

    /// Saves the form. On success the new accent color is painted; on failure
    /// an alert is shown and the confirmed preferences stay as they were.
    pub fn save(&self, form: &SettingsForm) -> Option<PreferencesChanged> {
        self.surface.set_loading_indicator(true);
        let result = self.model.save_segment(form.color, form.full_image_quality);
        self.surface.set_loading_indicator(false);

        match result {
            Ok(event) => {
                self.surface.set_accent_color(&event.color);
                Some(event)
            }
            Err(err) => {
                error!(error = %err, "saving preferences failed");
                self.surface.show_alert(&Alert::error(&err));
                None
            }
        }
    }
}
