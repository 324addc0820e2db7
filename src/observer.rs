//! Observation of the signed-in user record.
//!
//! A [`ChangeObserver`] owns the notification subscription for as long as it
//! lives. It starts `Observing`; a deletion of the record or an explicit
//! [`ChangeObserver::stop`] moves it to `Stopped`, after which nothing is
//! derived any more. Either way the subscription is released at that point,
//! and dropping the observer stops it however the owning scope ends.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::model::UserSession;
use crate::service::{ChangeNotification, NotificationToken, SyncService};
use crate::session::SessionHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Observing,
    Stopped,
}

/// Shared with the listener so a deletion can release the subscription.
type TokenSlot = Arc<Mutex<Option<NotificationToken>>>;

pub struct ChangeObserver {
    state: Arc<Mutex<ObserverState>>,
    token: TokenSlot,
}

impl ChangeObserver {
    /// Subscribes to the session's user record. `on_change` runs for every
    /// change while observing, in the order the store applied them.
    pub fn start<S, F>(session: &SessionHandle<S>, on_change: F) -> Result<Self, ServiceError>
    where
        S: SyncService,
        F: Fn(&UserSession) + Send + Sync + 'static,
    {
        let state = Arc::new(Mutex::new(ObserverState::Observing));
        let slot: TokenSlot = Arc::new(Mutex::new(None));
        let shared = Arc::clone(&state);
        let released = Arc::clone(&slot);
        let token = session.observe_user(move |notification| {
            handle(&shared, &released, &on_change, notification);
        })?;
        debug!(user_id = %session.identity().id, "observing user");

        let mut observer = Self { state, token: slot };
        put_token(&observer.token, token);
        // A deletion delivered before the token was stored left it behind.
        if !observer.is_observing() {
            observer.stop();
        }
        Ok(observer)
    }

    pub fn state(&self) -> ObserverState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(_) => ObserverState::Stopped,
        }
    }

    pub fn is_observing(&self) -> bool {
        self.state() == ObserverState::Observing
    }

    /// Stops derivation and releases the subscription. Writes already in
    /// flight are not affected.
    pub fn stop(&mut self) {
        set_state(&self.state, ObserverState::Stopped);
        release(&self.token);
    }
}

impl Drop for ChangeObserver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn set_state(state: &Mutex<ObserverState>, next: ObserverState) {
    match state.lock() {
        Ok(mut state) => *state = next,
        Err(poisoned) => *poisoned.into_inner() = next,
    }
}

fn put_token(slot: &Mutex<Option<NotificationToken>>, token: NotificationToken) {
    match slot.lock() {
        Ok(mut slot) => *slot = Some(token),
        Err(poisoned) => *poisoned.into_inner() = Some(token),
    }
}

fn release(slot: &Mutex<Option<NotificationToken>>) {
    let token = match slot.lock() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(mut token) = token {
        token.invalidate();
        debug!("user observation released");
    }
}

fn handle<F>(
    state: &Mutex<ObserverState>,
    slot: &Mutex<Option<NotificationToken>>,
    on_change: &F,
    notification: ChangeNotification<UserSession>,
) where
    F: Fn(&UserSession),
{
    match notification {
        ChangeNotification::Change { object, properties } => {
            let observing = state
                .lock()
                .map(|state| *state == ObserverState::Observing)
                .unwrap_or(false);
            if !observing {
                return;
            }
            for property in &properties {
                debug!("Property '{}' changed", property);
            }
            on_change(&object);
        }
        ChangeNotification::Error(message) => {
            warn!(error = %message, "change stream error");
        }
        ChangeNotification::Deleted => {
            set_state(state, ObserverState::Stopped);
            info!("observed user was deleted");
            release(slot);
        }
    }
}
