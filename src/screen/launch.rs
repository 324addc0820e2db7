use std::sync::Arc;

use tracing::error;

use crate::gate::SessionGate;
use crate::service::SyncService;
use crate::session::SessionHandle;
use crate::surface::{Alert, RenderSurface};

/// First screen: resolves the session behind a loading indicator.
pub struct LaunchScreen<S> {
    gate: Arc<SessionGate<S>>,
}

impl<S: SyncService> LaunchScreen<S> {
    pub fn new(gate: Arc<SessionGate<S>>) -> Self {
        Self { gate }
    }

    /// Returns the opened session, or shows the failure and returns `None`.
    /// The user retries by starting again.
    pub fn start<R>(&self, surface: &R) -> Option<SessionHandle<S>>
    where
        R: RenderSurface + ?Sized,
    {
        surface.set_loading_indicator(true);
        let result = self.gate.resolve();
        surface.set_loading_indicator(false);

        match result {
            Ok(session) => Some(session),
            Err(err) => {
                error!(error = %err, "launch failed");
                surface.show_alert(&Alert::error(&err));
                None
            }
        }
    }
}
