//! InMemorySyncService - HashMap-backed sync backend for testing and development.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{
    NotificationToken, RawChange, RawListener, StoredObject, SyncService, WriteBatch, WriteOp,
};
use crate::codec;
use crate::error::ServiceError;
use crate::model::{object_key, CustomData, Document, Model, ProviderKind, UserSession};
use crate::session::Identity;
use crate::subscription::SubscriptionSpec;

/// Operations whose next call can be made to fail with [`InMemorySyncService::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    SignIn,
    RefreshCustomData,
    OpenSession,
    Load,
    Commit,
    RemoteFunction,
}

/// Server-side function callable through [`SyncService::invoke_remote_function`].
pub type RemoteFunction =
    Arc<dyn Fn(&Identity, &[Value]) -> Result<Option<Value>, ServiceError> + Send + Sync>;

type CommitHook = Box<dyn FnOnce(&InMemorySyncService) + Send>;
type Listeners = HashMap<String, Vec<(u64, RawListener)>>;

/// Internal stored representation of an object.
struct StoredEntry {
    bytes: Vec<u8>,
    version: u64,
    /// Insertion order within the store; kept across updates.
    seq: u64,
}

struct IdentityRecord {
    identity: Identity,
    invalidated: bool,
}

/// Changes waiting to be handed to listeners, in the order they were applied.
#[derive(Default)]
struct Delivery {
    queue: VecDeque<(String, RawChange)>,
    draining: bool,
}

/// Marks the single active drainer. A listener that panics unwinds through
/// the guard, which hands draining back so later changes are still delivered.
struct DrainGuard<'a> {
    delivery: &'a Mutex<Delivery>,
}

impl<'a> DrainGuard<'a> {
    fn acquire(delivery: &'a Mutex<Delivery>) -> Option<Self> {
        let mut state = delivery.lock().ok()?;
        if state.draining {
            return None;
        }
        state.draining = true;
        Some(DrainGuard { delivery })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        // On the normal path the flag is cleared under the same lock that
        // saw the queue empty.
        if std::thread::panicking() {
            let mut state = match self.delivery.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.draining = false;
        }
    }
}

/// In-memory sync backend.
///
/// Storage key is `"collection:id"`. Clone-friendly via Arc: clones share
/// every piece of state, including observers.
#[derive(Clone)]
pub struct InMemorySyncService {
    storage: Arc<RwLock<HashMap<String, StoredEntry>>>,
    identities: Arc<RwLock<HashMap<String, IdentityRecord>>>,
    current: Arc<RwLock<Option<Identity>>>,
    custom_data: Arc<RwLock<HashMap<String, Document>>>,
    subscriptions: Arc<RwLock<HashMap<String, SubscriptionSpec>>>,
    listeners: Arc<RwLock<Listeners>>,
    delivery: Arc<Mutex<Delivery>>,
    faults: Arc<Mutex<HashMap<FaultPoint, ServiceError>>>,
    functions: Arc<RwLock<HashMap<String, RemoteFunction>>>,
    before_commit: Arc<Mutex<Option<CommitHook>>>,
    sequence: Arc<AtomicU64>,
}

impl Default for InMemorySyncService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySyncService {
    /// Create an empty backend with the `updateCustomData` function installed.
    pub fn new() -> Self {
        let custom_data: Arc<RwLock<HashMap<String, Document>>> =
            Arc::new(RwLock::new(HashMap::new()));

        let mut functions: HashMap<String, RemoteFunction> = HashMap::new();
        let store = Arc::clone(&custom_data);
        functions.insert(
            "updateCustomData".to_string(),
            Arc::new(move |identity: &Identity, args: &[Value]| {
                update_custom_data(&store, identity, args)
            }),
        );

        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            identities: Arc::new(RwLock::new(HashMap::new())),
            current: Arc::new(RwLock::new(None)),
            custom_data,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            listeners: Arc::new(RwLock::new(HashMap::new())),
            delivery: Arc::new(Mutex::new(Delivery::default())),
            faults: Arc::new(Mutex::new(HashMap::new())),
            functions: Arc::new(RwLock::new(functions)),
            before_commit: Arc::new(Mutex::new(None)),
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Upsert a record with no version check, as the server side would.
    pub fn seed<M: Model>(&self, model: &M) -> Result<(), ServiceError> {
        let bytes = codec::encode(model)?;
        self.upsert_raw(&object_key(M::COLLECTION, model.id()), bytes)
    }

    /// Links the identity to a username/password provider and marks its user
    /// record as registered.
    pub fn register_user(&self, id: &str, display_name: &str) -> Result<Identity, ServiceError> {
        let identity = {
            let mut identities = self
                .identities
                .write()
                .map_err(|_| ServiceError::LockPoisoned("identities write"))?;
            let record = identities.get_mut(id).ok_or(ServiceError::Unauthenticated)?;
            record.identity.provider = ProviderKind::UserPassword;
            record.identity.clone()
        };

        {
            let mut current = self
                .current
                .write()
                .map_err(|_| ServiceError::LockPoisoned("current identity write"))?;
            if current.as_ref().map(|c| c.id.as_str()) == Some(id) {
                *current = Some(identity.clone());
            }
        }

        let key = object_key(UserSession::COLLECTION, id);
        let mut user = match self.load(UserSession::COLLECTION, id)? {
            Some(stored) => codec::decode::<UserSession>(&stored.bytes)?,
            None => UserSession::anonymous(id),
        };
        user.registered = true;
        user.provider_kind = ProviderKind::UserPassword;
        user.user_name = Some(display_name.to_string());
        user.preferences.display_name = Some(display_name.to_string());
        self.upsert_raw(&key, codec::encode(&user)?)?;

        info!(user_id = %id, provider = identity.provider.as_str(), "user registered");
        Ok(identity)
    }

    /// Removes the user record. Observers of it receive a deletion.
    pub fn delete_user(&self, id: &str) -> Result<bool, ServiceError> {
        let key = object_key(UserSession::COLLECTION, id);
        let mut storage = self
            .storage
            .write()
            .map_err(|_| ServiceError::LockPoisoned("write"))?;
        let Some(entry) = storage.get(&key) else {
            return Ok(false);
        };
        let op = WriteOp::Delete {
            collection: UserSession::COLLECTION.to_string(),
            id: id.to_string(),
            expected_version: entry.version,
        };
        let changes: Vec<_> = self.apply(&mut storage, op).into_iter().collect();
        self.enqueue(changes)?;
        drop(storage);
        self.drain();
        Ok(true)
    }

    /// Revokes every issued session; later commits and calls fail.
    pub fn invalidate_sessions(&self) -> Result<(), ServiceError> {
        let mut identities = self
            .identities
            .write()
            .map_err(|_| ServiceError::LockPoisoned("identities write"))?;
        for record in identities.values_mut() {
            record.invalidated = true;
        }
        Ok(())
    }

    /// Delivers an error notification to observers of the object.
    pub fn notify_error(&self, collection: &str, id: &str, message: &str) {
        let key = object_key(collection, id);
        if let Err(err) = self.enqueue(vec![(key, RawChange::Error(message.to_string()))]) {
            warn!(error = %err, "could not queue error notification");
        }
        self.drain();
    }

    /// The next call through `point` fails with `error`.
    pub fn fail_next(&self, point: FaultPoint, error: ServiceError) {
        match self.faults.lock() {
            Ok(mut faults) => {
                faults.insert(point, error);
            }
            Err(_) => warn!(?point, "fault table lock poisoned"),
        }
    }

    /// Installs or replaces a remote function.
    pub fn register_function<F>(&self, name: &str, function: F)
    where
        F: Fn(&Identity, &[Value]) -> Result<Option<Value>, ServiceError> + Send + Sync + 'static,
    {
        match self.functions.write() {
            Ok(mut functions) => {
                functions.insert(name.to_string(), Arc::new(function));
            }
            Err(_) => warn!(name, "function table lock poisoned"),
        }
    }

    /// Runs `hook` inside the next commit, after the writer's reads and before
    /// its version check, as a concurrent writer would.
    pub fn before_next_commit<F>(&self, hook: F)
    where
        F: FnOnce(&InMemorySyncService) + Send + 'static,
    {
        match self.before_commit.lock() {
            Ok(mut slot) => *slot = Some(Box::new(hook)),
            Err(_) => warn!("commit hook lock poisoned"),
        }
    }

    pub fn active_subscriptions(&self, identity_id: &str) -> Option<SubscriptionSpec> {
        self.subscriptions
            .read()
            .ok()
            .and_then(|subscriptions| subscriptions.get(identity_id).cloned())
    }

    pub fn listener_count(&self, collection: &str, id: &str) -> usize {
        self.listeners
            .read()
            .map(|listeners| {
                listeners
                    .get(&object_key(collection, id))
                    .map(Vec::len)
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    fn take_fault(&self, point: FaultPoint) -> Result<(), ServiceError> {
        let fault = self
            .faults
            .lock()
            .map_err(|_| ServiceError::LockPoisoned("faults"))?
            .remove(&point);
        match fault {
            Some(error) => {
                debug!(?point, %error, "injected fault");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn ensure_valid(&self, identity: &Identity) -> Result<(), ServiceError> {
        let identities = self
            .identities
            .read()
            .map_err(|_| ServiceError::LockPoisoned("identities read"))?;
        match identities.get(&identity.id) {
            Some(record) if !record.invalidated => Ok(()),
            Some(_) => Err(ServiceError::SessionInvalidated),
            None => Err(ServiceError::Unauthenticated),
        }
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn put_entry(
        &self,
        storage: &mut HashMap<String, StoredEntry>,
        key: &str,
        bytes: Vec<u8>,
    ) -> RawChange {
        let (old, version, seq) = match storage.get(key) {
            Some(entry) => (Some(entry.bytes.clone()), entry.version + 1, entry.seq),
            None => (None, 1, self.next_seq()),
        };
        storage.insert(
            key.to_string(),
            StoredEntry {
                bytes: bytes.clone(),
                version,
                seq,
            },
        );
        RawChange::Modified { old, new: bytes }
    }

    fn upsert_raw(&self, key: &str, bytes: Vec<u8>) -> Result<(), ServiceError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| ServiceError::LockPoisoned("write"))?;
        let change = self.put_entry(&mut storage, key, bytes);
        self.enqueue(vec![(key.to_string(), change)])?;
        drop(storage);
        self.drain();
        Ok(())
    }

    /// Applies one already version-checked write, returning the change to
    /// deliver for it.
    fn apply(
        &self,
        storage: &mut HashMap<String, StoredEntry>,
        op: WriteOp,
    ) -> Option<(String, RawChange)> {
        match op {
            WriteOp::Put {
                collection,
                id,
                bytes,
                ..
            } => {
                let key = object_key(&collection, &id);
                let change = self.put_entry(storage, &key, bytes);
                Some((key, change))
            }
            WriteOp::Delete { collection, id, .. } => {
                let key = object_key(&collection, &id);
                storage.remove(&key).map(|_| (key, RawChange::Deleted))
            }
        }
    }

    /// Called with the storage lock held so queue order matches apply order.
    fn enqueue(&self, changes: Vec<(String, RawChange)>) -> Result<(), ServiceError> {
        let mut delivery = self
            .delivery
            .lock()
            .map_err(|_| ServiceError::LockPoisoned("delivery"))?;
        delivery.queue.extend(changes);
        Ok(())
    }

    /// Hands queued changes to listeners. Only one caller drains at a time;
    /// others leave their changes to it.
    fn drain(&self) {
        let Some(_guard) = DrainGuard::acquire(&self.delivery) else {
            return;
        };

        loop {
            let (key, change) = match self.delivery.lock() {
                Ok(mut delivery) => match delivery.queue.pop_front() {
                    Some(next) => next,
                    None => {
                        delivery.draining = false;
                        return;
                    }
                },
                Err(_) => return,
            };
            self.dispatch(&key, &change);
        }
    }

    fn dispatch(&self, key: &str, change: &RawChange) {
        let targets: Vec<RawListener> = match self.listeners.read() {
            Ok(listeners) => listeners
                .get(key)
                .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default(),
            Err(_) => {
                warn!(key, "listener table lock poisoned");
                return;
            }
        };
        for listener in targets {
            listener(change);
        }
    }
}

impl SyncService for InMemorySyncService {
    fn sign_in_anonymous(&self) -> Result<Identity, ServiceError> {
        self.take_fault(FaultPoint::SignIn)?;

        let identity = Identity::new(format!("anon-{}", self.next_seq()), ProviderKind::Anonymous);
        self.identities
            .write()
            .map_err(|_| ServiceError::LockPoisoned("identities write"))?
            .insert(
                identity.id.clone(),
                IdentityRecord {
                    identity: identity.clone(),
                    invalidated: false,
                },
            );
        *self
            .current
            .write()
            .map_err(|_| ServiceError::LockPoisoned("current identity write"))? =
            Some(identity.clone());

        self.seed(&UserSession::anonymous(&identity.id))?;
        info!(user_id = %identity.id, "anonymous identity issued");
        Ok(identity)
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current.read().ok().and_then(|current| current.clone())
    }

    fn refresh_custom_data(&self, identity: &Identity) -> Result<Document, ServiceError> {
        self.take_fault(FaultPoint::RefreshCustomData)?;
        self.ensure_valid(identity)?;
        let custom_data = self
            .custom_data
            .read()
            .map_err(|_| ServiceError::LockPoisoned("custom data read"))?;
        Ok(custom_data.get(&identity.id).cloned().unwrap_or_default())
    }

    fn open_session(
        &self,
        identity: &Identity,
        spec: &SubscriptionSpec,
    ) -> Result<(), ServiceError> {
        self.take_fault(FaultPoint::OpenSession)?;
        self.ensure_valid(identity)?;
        let mut subscriptions = self
            .subscriptions
            .write()
            .map_err(|_| ServiceError::LockPoisoned("subscriptions write"))?;
        if spec.rerun_on_open || !subscriptions.contains_key(&identity.id) {
            subscriptions.insert(identity.id.clone(), spec.clone());
        }
        Ok(())
    }

    fn load(&self, collection: &str, id: &str) -> Result<Option<StoredObject>, ServiceError> {
        self.take_fault(FaultPoint::Load)?;
        let storage = self
            .storage
            .read()
            .map_err(|_| ServiceError::LockPoisoned("read"))?;
        Ok(storage
            .get(&object_key(collection, id))
            .map(|entry| StoredObject {
                bytes: entry.bytes.clone(),
                version: entry.version,
            }))
    }

    fn scan(&self, collection: &str) -> Result<Vec<StoredObject>, ServiceError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| ServiceError::LockPoisoned("read"))?;
        let prefix = format!("{}:", collection);
        let mut entries: Vec<&StoredEntry> = storage
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, entry)| entry)
            .collect();
        entries.sort_by_key(|entry| entry.seq);
        Ok(entries
            .into_iter()
            .map(|entry| StoredObject {
                bytes: entry.bytes.clone(),
                version: entry.version,
            })
            .collect())
    }

    fn commit(&self, identity: &Identity, batch: WriteBatch) -> Result<(), ServiceError> {
        self.take_fault(FaultPoint::Commit)?;

        let hook = self
            .before_commit
            .lock()
            .map_err(|_| ServiceError::LockPoisoned("commit hook"))?
            .take();
        if let Some(hook) = hook {
            hook(self);
        }

        self.ensure_valid(identity)?;

        let mut storage = self
            .storage
            .write()
            .map_err(|_| ServiceError::LockPoisoned("write"))?;

        for op in batch.ops() {
            let key = object_key(op.collection(), op.id());
            let actual = storage.get(&key).map(|entry| entry.version).unwrap_or(0);
            if actual != op.expected_version() {
                return Err(ServiceError::ConcurrentWrite {
                    key,
                    expected: op.expected_version(),
                    actual,
                });
            }
        }

        let count = batch.ops().len();
        let changes: Vec<_> = batch
            .into_ops()
            .into_iter()
            .filter_map(|op| self.apply(&mut storage, op))
            .collect();
        self.enqueue(changes)?;
        drop(storage);
        self.drain();

        debug!(user_id = %identity.id, writes = count, "batch committed");
        Ok(())
    }

    fn observe_raw(
        &self,
        collection: &str,
        id: &str,
        listener: RawListener,
    ) -> Result<NotificationToken, ServiceError> {
        let key = object_key(collection, id);
        let listener_id = self.next_seq();
        self.listeners
            .write()
            .map_err(|_| ServiceError::LockPoisoned("listeners write"))?
            .entry(key.clone())
            .or_default()
            .push((listener_id, listener));

        let listeners = Arc::clone(&self.listeners);
        Ok(NotificationToken::new(move || {
            if let Ok(mut listeners) = listeners.write() {
                if let Some(entries) = listeners.get_mut(&key) {
                    entries.retain(|(id, _)| *id != listener_id);
                    if entries.is_empty() {
                        listeners.remove(&key);
                    }
                }
            }
        }))
    }

    fn invoke_remote_function(
        &self,
        identity: &Identity,
        name: &str,
        args: &[Value],
    ) -> Result<Option<Value>, ServiceError> {
        self.take_fault(FaultPoint::RemoteFunction)?;
        self.ensure_valid(identity)?;
        let function = self
            .functions
            .read()
            .map_err(|_| ServiceError::LockPoisoned("functions read"))?
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownFunction(name.to_string()))?;
        function(identity, args)
    }
}

/// `updateCustomData(color, fullImage)`: writes both fields into the caller's
/// custom data document.
fn update_custom_data(
    store: &RwLock<HashMap<String, Document>>,
    identity: &Identity,
    args: &[Value],
) -> Result<Option<Value>, ServiceError> {
    let (Some(color), Some(full_image)) = (
        args.first().and_then(Value::as_str),
        args.get(1).and_then(Value::as_bool),
    ) else {
        return Ok(Some(json!({ "error": "expected arguments (color, fullImage)" })));
    };

    let mut store = store
        .write()
        .map_err(|_| ServiceError::LockPoisoned("custom data write"))?;
    store
        .entry(identity.id.clone())
        .or_default()
        .extend(CustomData::new(color, full_image).to_document());
    Ok(Some(json!({ "matchedCount": 1, "modifiedCount": 1 })))
}
