//! The opened synchronized session.
//!
//! A [`SessionHandle`] is what every component is constructed with. It carries
//! the backend, the signed-in identity, the subscription set the session was
//! opened with, and the last server-confirmed custom data. There is no ambient
//! "current user": whoever needs one is handed a handle.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::codec;
use crate::config::Config;
use crate::error::ServiceError;
use crate::model::{
    object_key, BookRecord, CustomData, Model, ProviderKind, UserSession, Versioned,
};
use crate::service::{
    ChangeNotification, NotificationToken, SyncService, SyncServiceExt, WriteBatch, WriteOp,
};
use crate::subscription::SubscriptionSpec;

/// An authenticated identity issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub provider: ProviderKind,
}

impl Identity {
    pub fn new(id: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            id: id.into(),
            provider,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.provider == ProviderKind::Anonymous
    }
}

pub struct SessionHandle<S> {
    service: Arc<S>,
    identity: Identity,
    spec: SubscriptionSpec,
    config: Arc<Config>,
    custom_data: Arc<RwLock<CustomData>>,
}

impl<S> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            identity: self.identity.clone(),
            spec: self.spec.clone(),
            config: Arc::clone(&self.config),
            custom_data: Arc::clone(&self.custom_data),
        }
    }
}

impl<S: SyncService> SessionHandle<S> {
    pub fn new(
        service: Arc<S>,
        identity: Identity,
        spec: SubscriptionSpec,
        config: Arc<Config>,
        custom_data: CustomData,
    ) -> Self {
        Self {
            service,
            identity,
            spec,
            config,
            custom_data: Arc::new(RwLock::new(custom_data)),
        }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn subscriptions(&self) -> &SubscriptionSpec {
        &self.spec
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The user record, re-read from the store on every call.
    pub fn user(&self) -> Result<Option<Versioned<UserSession>>, ServiceError> {
        if !self.spec.covers(UserSession::COLLECTION, &self.identity.id) {
            return Ok(None);
        }
        self.service.get::<UserSession>(&self.identity.id)
    }

    /// Visible books covered by the session's subscriptions, in store order.
    pub fn catalog(&self) -> Result<Vec<BookRecord>, ServiceError> {
        self.service.find::<BookRecord>(|book| {
            book.show && self.spec.covers(BookRecord::COLLECTION, &book.id)
        })
    }

    /// The last custom data the server confirmed.
    pub fn custom_data(&self) -> CustomData {
        match self.custom_data.read() {
            Ok(data) => data.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Fetches authoritative custom data. The cached copy only changes when the
    /// round trip succeeds.
    pub fn refresh_custom_data(&self) -> Result<CustomData, ServiceError> {
        let document = self.service.refresh_custom_data(&self.identity)?;
        let data = CustomData::from_document(&document);
        {
            let mut cached = self
                .custom_data
                .write()
                .map_err(|_| ServiceError::LockPoisoned("custom data write"))?;
            *cached = data.clone();
        }
        info!(user_id = %self.identity.id, "loaded custom user data");
        Ok(data)
    }

    pub fn observe_user<F>(&self, callback: F) -> Result<NotificationToken, ServiceError>
    where
        F: Fn(ChangeNotification<UserSession>) + Send + Sync + 'static,
    {
        self.service.observe::<UserSession, _>(&self.identity.id, callback)
    }

    pub fn begin_transaction(&self) -> Transaction<'_, S> {
        Transaction::begin(self)
    }
}

/// Read-then-write unit against the store.
///
/// Reads record the version they saw; writes are checked against those
/// versions at commit, so a transaction whose reads went stale fails instead
/// of overwriting. A transaction dropped without commit is aborted.
pub struct Transaction<'a, S: SyncService> {
    session: &'a SessionHandle<S>,
    read_versions: HashMap<String, u64>,
    batch: WriteBatch,
    finished: bool,
}

impl<'a, S: SyncService> Transaction<'a, S> {
    fn begin(session: &'a SessionHandle<S>) -> Self {
        trace!(user_id = %session.identity.id, "begin transaction");
        Self {
            session,
            read_versions: HashMap::new(),
            batch: WriteBatch::new(),
            finished: false,
        }
    }

    pub fn read<M: Model>(&mut self, id: &str) -> Result<Option<M>, ServiceError> {
        let record = self.session.service.get::<M>(id)?;
        let version = record.as_ref().map(|r| r.version).unwrap_or(0);
        self.read_versions
            .insert(object_key(M::COLLECTION, id), version);
        Ok(record.map(|r| r.data))
    }

    pub fn put<M: Model>(&mut self, model: &M) -> Result<(), ServiceError> {
        let key = object_key(M::COLLECTION, model.id());
        let expected_version = self.read_versions.get(&key).copied().unwrap_or(0);
        self.batch.push(WriteOp::Put {
            collection: M::COLLECTION.to_string(),
            id: model.id().to_string(),
            bytes: codec::encode(model)?,
            expected_version,
        });
        Ok(())
    }

    pub fn commit(mut self) -> Result<(), ServiceError> {
        self.finished = true;
        let batch = std::mem::take(&mut self.batch);
        if batch.is_empty() {
            return Ok(());
        }
        self.session.service.commit(&self.session.identity, batch)
    }

    pub fn abort(mut self) {
        self.finished = true;
        debug!(user_id = %self.session.identity.id, "transaction aborted");
    }
}

impl<S: SyncService> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                user_id = %self.session.identity.id,
                pending = self.batch.ops().len(),
                "transaction dropped without commit"
            );
        }
    }
}
