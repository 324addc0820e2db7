use std::collections::VecDeque;
use std::sync::Mutex;

use bookshelf_sync::{
    ActionButtonState, Alert, Confirmation, ConfirmationPrompt, ConfirmationPrompter,
    RenderSurface, RowViewModel,
};

/// Records everything a screen draws. Confirmation prompts are answered from
/// a script, falling back to a default answer.
pub struct RecordingSurface {
    default_answer: Confirmation,
    answers: Mutex<VecDeque<Confirmation>>,
    prompts: Mutex<Vec<ConfirmationPrompt>>,
    renders: Mutex<Vec<Vec<RowViewModel>>>,
    loading: Mutex<Vec<bool>>,
    buttons: Mutex<Vec<ActionButtonState>>,
    alerts: Mutex<Vec<Alert>>,
    registrations: Mutex<Vec<Alert>>,
    accents: Mutex<Vec<String>>,
}

impl RecordingSurface {
    pub fn confirming() -> Self {
        Self::answering(Confirmation::Confirmed)
    }

    pub fn cancelling() -> Self {
        Self::answering(Confirmation::Cancelled)
    }

    fn answering(default_answer: Confirmation) -> Self {
        Self {
            default_answer,
            answers: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            renders: Mutex::new(Vec::new()),
            loading: Mutex::new(Vec::new()),
            buttons: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            accents: Mutex::new(Vec::new()),
        }
    }

    pub fn answer_next(&self, answer: Confirmation) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn prompts(&self) -> Vec<ConfirmationPrompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().unwrap().len()
    }

    pub fn last_rows(&self) -> Vec<RowViewModel> {
        self.renders.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn loading_history(&self) -> Vec<bool> {
        self.loading.lock().unwrap().clone()
    }

    pub fn last_button(&self) -> Option<ActionButtonState> {
        self.buttons.lock().unwrap().last().cloned()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> Vec<Alert> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn accents(&self) -> Vec<String> {
        self.accents.lock().unwrap().clone()
    }
}

impl ConfirmationPrompter for RecordingSurface {
    fn prompt_confirmation(&self, prompt: &ConfirmationPrompt) -> Confirmation {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default_answer)
    }
}

impl RenderSurface for RecordingSurface {
    fn render_rows(&self, rows: &[RowViewModel]) {
        self.renders.lock().unwrap().push(rows.to_vec());
    }

    fn set_loading_indicator(&self, loading: bool) {
        self.loading.lock().unwrap().push(loading);
    }

    fn set_action_button_state(&self, state: &ActionButtonState) {
        self.buttons.lock().unwrap().push(state.clone());
    }

    fn show_alert(&self, alert: &Alert) {
        self.alerts.lock().unwrap().push(alert.clone());
    }

    fn show_registration(&self, reason: &Alert) {
        self.registrations.lock().unwrap().push(reason.clone());
    }

    fn set_accent_color(&self, color: &str) {
        self.accents.lock().unwrap().push(color.to_string());
    }
}
