//! Getting from app start to an opened session.
//!
//! [`SessionGate::resolve`] picks the identity (the persisted one, or a fresh
//! anonymous sign-in) and then hands off to [`SyncSessionOpener::open`]. Both
//! launch paths and the post-registration re-open go through that one open
//! step, so the subscription set is always built the same way.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::error::{AuthError, OpenError, SessionError};
use crate::model::CustomData;
use crate::service::SyncService;
use crate::session::{Identity, SessionHandle};
use crate::subscription::{OpenMode, SubscriptionConfigurator, SubscriptionSpec};

/// Opens the synchronized session for an identity.
pub struct SyncSessionOpener<S> {
    service: Arc<S>,
    config: Arc<Config>,
}

impl<S> Clone for SyncSessionOpener<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: SyncService> SyncSessionOpener<S> {
    pub fn new(service: Arc<S>, config: Arc<Config>) -> Self {
        Self { service, config }
    }

    /// Applies `spec` and returns the handle. A failure ends this attempt;
    /// nothing is retried here.
    #[instrument(
        skip(self, spec, custom_data),
        fields(user_id = %identity.id, rerun_on_open = spec.rerun_on_open)
    )]
    pub fn open(
        &self,
        identity: Identity,
        spec: SubscriptionSpec,
        custom_data: CustomData,
    ) -> Result<SessionHandle<S>, OpenError> {
        self.service
            .open_session(&identity, &spec)
            .map_err(|err| {
                error!(error = %err, "failed to open session");
                OpenError(err)
            })?;
        info!("session opened");

        Ok(SessionHandle::new(
            Arc::clone(&self.service),
            identity,
            spec,
            Arc::clone(&self.config),
            custom_data,
        ))
    }
}

/// Decides at start-up whether a session already exists and opens one.
pub struct SessionGate<S> {
    service: Arc<S>,
    configurator: SubscriptionConfigurator,
    opener: SyncSessionOpener<S>,
}

impl<S: SyncService> SessionGate<S> {
    pub fn new(service: Arc<S>, config: Arc<Config>) -> Self {
        Self {
            configurator: SubscriptionConfigurator::new(&config),
            opener: SyncSessionOpener::new(Arc::clone(&service), config),
            service,
        }
    }

    pub fn opener(&self) -> &SyncSessionOpener<S> {
        &self.opener
    }

    /// Existing identity: refresh custom data, then open. No identity: sign
    /// in anonymously, then open. May be called again after a failure.
    #[instrument(skip(self))]
    pub fn resolve(&self) -> Result<SessionHandle<S>, SessionError> {
        let (identity, custom_data) = match self.service.current_identity() {
            Some(identity) => {
                let custom_data = self.load_custom_data(&identity);
                (identity, custom_data)
            }
            None => {
                let identity = self.service.sign_in_anonymous().map_err(|err| {
                    error!(error = %err, "anonymous sign-in failed");
                    AuthError(err)
                })?;
                info!(user_id = %identity.id, "signed in anonymously");
                (identity, CustomData::default())
            }
        };

        Ok(self.open(identity, OpenMode::Launch, custom_data)?)
    }

    /// Re-opens after the user registered, keeping the subscription set the
    /// identity already has.
    #[instrument(skip(self, session), fields(user_id = %session.identity().id))]
    pub fn reopen_after_registration(
        &self,
        session: &SessionHandle<S>,
    ) -> Result<SessionHandle<S>, OpenError> {
        let identity = self
            .service
            .current_identity()
            .filter(|current| current.id == session.identity().id)
            .unwrap_or_else(|| session.identity().clone());
        self.open(identity, OpenMode::AfterRegistration, session.custom_data())
    }

    fn open(
        &self,
        identity: Identity,
        mode: OpenMode,
        custom_data: CustomData,
    ) -> Result<SessionHandle<S>, OpenError> {
        let spec = self.configurator.build(&identity, mode);
        self.opener.open(identity, spec, custom_data)
    }

    fn load_custom_data(&self, identity: &Identity) -> CustomData {
        match self.service.refresh_custom_data(identity) {
            Ok(document) => {
                info!(user_id = %identity.id, "loaded custom user data");
                CustomData::from_document(&document)
            }
            Err(err) => {
                warn!(
                    user_id = %identity.id,
                    error = %err,
                    "custom data refresh failed, opening anyway"
                );
                CustomData::default()
            }
        }
    }
}
