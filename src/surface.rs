//! The rendering surface: whatever draws rows, dialogs, and buttons.
//!
//! Screens hand it view-model data and never read anything back except the
//! user's answer to a confirmation prompt.

use crate::view_model::RowViewModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

/// Blocking informational dialog with a single acknowledgement action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// The generic failure dialog: title "Error", the error's description as message.
    pub fn error(err: &dyn std::error::Error) -> Self {
        Self::new("Error", err.to_string())
    }
}

/// State of the user-action button and the shortcuts that require registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButtonState {
    pub enabled: bool,
    pub title: String,
    /// Favorites and settings shortcuts.
    pub shortcuts_enabled: bool,
}

pub trait ConfirmationPrompter {
    fn prompt_confirmation(&self, prompt: &ConfirmationPrompt) -> Confirmation;
}

pub trait RenderSurface: ConfirmationPrompter + Send + Sync {
    fn render_rows(&self, rows: &[RowViewModel]);

    fn set_loading_indicator(&self, loading: bool);

    fn set_action_button_state(&self, state: &ActionButtonState);

    fn show_alert(&self, alert: &Alert);

    /// Sends the user to the registration flow, explaining why.
    fn show_registration(&self, reason: &Alert);

    fn set_accent_color(&self, color: &str);
}
