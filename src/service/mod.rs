//! The remote sync/auth backend as seen by the client.
//!
//! [`SyncService`] is the narrow surface the rest of the crate talks to:
//! authentication, custom data, session open, object reads, atomic commits,
//! change observation, and remote function calls. Everything behind it
//! (transport, storage engine, conflict resolution) is the backend's business.
//!
//! Typed access goes through [`SyncServiceExt`], which is implemented for every
//! service and decodes stored bytes into [`Model`] records.

mod in_memory;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::codec;
use crate::error::ServiceError;
use crate::model::{Document, Model, Versioned};
use crate::session::Identity;
use crate::subscription::SubscriptionSpec;

pub use in_memory::{FaultPoint, InMemorySyncService, RemoteFunction};

/// Encoded bytes of a record plus its store version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub version: u64,
}

/// One mutation inside a [`WriteBatch`].
///
/// `expected_version` is the version the writer read; `0` means the object
/// must not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put {
        collection: String,
        id: String,
        bytes: Vec<u8>,
        expected_version: u64,
    },
    Delete {
        collection: String,
        id: String,
        expected_version: u64,
    },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Put { collection, .. } | WriteOp::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Put { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }

    pub fn expected_version(&self) -> u64 {
        match self {
            WriteOp::Put {
                expected_version, ..
            }
            | WriteOp::Delete {
                expected_version, ..
            } => *expected_version,
        }
    }
}

/// Mutations applied all-or-nothing by [`SyncService::commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Untyped change as produced by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawChange {
    Modified {
        old: Option<Vec<u8>>,
        new: Vec<u8>,
    },
    Deleted,
    Error(String),
}

pub type RawListener = Arc<dyn Fn(&RawChange) + Send + Sync>;

/// A change to an observed object, delivered in the order the store applied it.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeNotification<M> {
    Change { object: M, properties: Vec<String> },
    Error(String),
    Deleted,
}

/// Keeps a change observation alive. Dropping or invalidating it stops delivery.
pub struct NotificationToken {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl NotificationToken {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn invalidate(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for NotificationToken {
    fn drop(&mut self) {
        self.invalidate();
    }
}

impl fmt::Debug for NotificationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationToken")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Operations consumed from the remote sync/auth backend.
///
/// Each call is a single-shot round trip: it completes exactly once, with
/// either a value or an error.
pub trait SyncService: Send + Sync + 'static {
    fn sign_in_anonymous(&self) -> Result<Identity, ServiceError>;

    /// The identity persisted from a previous launch, if any.
    fn current_identity(&self) -> Option<Identity>;

    fn refresh_custom_data(&self, identity: &Identity) -> Result<Document, ServiceError>;

    fn open_session(&self, identity: &Identity, spec: &SubscriptionSpec)
        -> Result<(), ServiceError>;

    fn load(&self, collection: &str, id: &str) -> Result<Option<StoredObject>, ServiceError>;

    /// Every object in `collection`, in insertion order.
    fn scan(&self, collection: &str) -> Result<Vec<StoredObject>, ServiceError>;

    /// Applies the batch atomically, or fails with `ConcurrentWrite` when any
    /// object moved past the version its writer read.
    fn commit(&self, identity: &Identity, batch: WriteBatch) -> Result<(), ServiceError>;

    fn observe_raw(
        &self,
        collection: &str,
        id: &str,
        listener: RawListener,
    ) -> Result<NotificationToken, ServiceError>;

    fn invoke_remote_function(
        &self,
        identity: &Identity,
        name: &str,
        args: &[Value],
    ) -> Result<Option<Value>, ServiceError>;
}

/// Typed reads and observation on top of [`SyncService`].
pub trait SyncServiceExt: SyncService {
    fn get<M: Model>(&self, id: &str) -> Result<Option<Versioned<M>>, ServiceError> {
        self.load(M::COLLECTION, id)?
            .map(|stored| codec::decode_versioned(&stored))
            .transpose()
    }

    fn find<M: Model>(&self, predicate: impl Fn(&M) -> bool) -> Result<Vec<M>, ServiceError> {
        let mut found = Vec::new();
        for stored in self.scan(M::COLLECTION)? {
            let model: M = codec::decode(&stored.bytes)?;
            if predicate(&model) {
                found.push(model);
            }
        }
        Ok(found)
    }

    fn observe<M, F>(&self, id: &str, callback: F) -> Result<NotificationToken, ServiceError>
    where
        M: Model,
        F: Fn(ChangeNotification<M>) + Send + Sync + 'static,
    {
        let listener: RawListener = Arc::new(move |change: &RawChange| {
            let notification = match change {
                RawChange::Modified { old, new } => match codec::decode::<M>(new) {
                    Ok(object) => {
                        let properties = old
                            .as_deref()
                            .and_then(|bytes| codec::decode::<M>(bytes).ok())
                            .map(|old| codec::changed_properties(&old, &object))
                            .unwrap_or_default();
                        ChangeNotification::Change { object, properties }
                    }
                    Err(err) => ChangeNotification::Error(err.to_string()),
                },
                RawChange::Deleted => ChangeNotification::Deleted,
                RawChange::Error(message) => ChangeNotification::Error(message.clone()),
            };
            callback(notification);
        });
        self.observe_raw(M::COLLECTION, id, listener)
    }
}

impl<T: SyncService + ?Sized> SyncServiceExt for T {}
