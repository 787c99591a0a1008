//! In-memory [`ObjectStore`] driven by explicit fixtures
//!
//! Objects are kept as JSON keyed by kind, namespace and name. Tests seed it
//! with [`InMemoryStore::with_object`], inject failures with
//! [`InMemoryStore::fail_on`] and inspect the journal of every call made.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{object_key, ObjectStore, StoreObject};
use crate::error::{Error, Result};

/// Store operation, as recorded in the call journal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Create,
    Update,
    UpdateStatus,
    Delete,
}

/// One recorded store call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreCall {
    pub operation: Operation,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

type ObjectKey = (String, String, String);

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, serde_json::Value>,
    faults: HashMap<(Operation, String), String>,
    calls: Vec<StoreCall>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing object
    pub fn with_object<K: StoreObject>(self, object: K) -> Self {
        self.insert(&object);
        self
    }

    /// Make every `operation` on objects of kind `K` fail with `StoreUnavailable(message)`
    pub fn fail_on<K: StoreObject>(self, operation: Operation, message: &str) -> Self {
        self.lock()
            .faults
            .insert((operation, K::kind(&()).to_string()), message.to_string());
        self
    }

    /// Put an object into the store without recording a call
    pub fn insert<K: StoreObject>(&self, object: &K) {
        let (namespace, name) = object_key(object);
        match serde_json::to_value(object) {
            Ok(value) => {
                self.lock()
                    .objects
                    .insert((K::kind(&()).to_string(), namespace, name), value);
            }
            Err(e) => tracing::warn!("Dropping unserializable fixture {}: {}", name, e),
        }
    }

    /// Read an object without recording a call
    pub fn object<K: StoreObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let key = (
            K::kind(&()).to_string(),
            namespace.to_string(),
            name.to_string(),
        );
        self.lock()
            .objects
            .get(&key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Number of `operation` calls made against objects of kind `K`
    pub fn count<K: StoreObject>(&self, operation: Operation) -> usize {
        let kind = K::kind(&());
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation && call.kind == kind)
            .count()
    }

    /// Number of `operation` calls regardless of kind
    pub fn count_all(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and return the injected fault for it, if any
    fn record<K: StoreObject>(
        state: &mut State,
        operation: Operation,
        namespace: &str,
        name: &str,
    ) -> Result<ObjectKey> {
        let kind = K::kind(&()).to_string();
        state.calls.push(StoreCall {
            operation,
            kind: kind.clone(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        if let Some(message) = state.faults.get(&(operation, kind.clone())) {
            return Err(Error::StoreUnavailable(message.clone()));
        }
        Ok((kind, namespace.to_string(), name.to_string()))
    }
}

fn not_found(key: ObjectKey) -> Error {
    let (kind, namespace, name) = key;
    Error::NotFound {
        kind,
        namespace,
        name,
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K> {
        let mut state = self.lock();
        let key = Self::record::<K>(&mut state, Operation::Get, namespace, name)?;
        match state.objects.get(&key) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(not_found(key)),
        }
    }

    async fn create<K: StoreObject>(&self, object: &K) -> Result<K> {
        let (namespace, name) = object_key(object);
        let mut state = self.lock();
        let key = Self::record::<K>(&mut state, Operation::Create, &namespace, &name)?;
        if state.objects.contains_key(&key) {
            return Err(Error::AlreadyExists {
                kind: key.0,
                namespace,
                name,
            });
        }
        state.objects.insert(key, serde_json::to_value(object)?);
        Ok(object.clone())
    }

    async fn update<K: StoreObject>(&self, object: &K) -> Result<K> {
        let (namespace, name) = object_key(object);
        let mut state = self.lock();
        let key = Self::record::<K>(&mut state, Operation::Update, &namespace, &name)?;
        if !state.objects.contains_key(&key) {
            return Err(not_found(key));
        }
        state.objects.insert(key, serde_json::to_value(object)?);
        Ok(object.clone())
    }

    async fn update_status<K: StoreObject>(&self, object: &K) -> Result<K> {
        let (namespace, name) = object_key(object);
        let mut state = self.lock();
        let key = Self::record::<K>(&mut state, Operation::UpdateStatus, &namespace, &name)?;
        let status = serde_json::to_value(object)?
            .get("status")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let Some(stored) = state.objects.get_mut(&key) else {
            return Err(not_found(key));
        };
        if let Some(fields) = stored.as_object_mut() {
            fields.insert("status".to_string(), status);
        }
        Ok(serde_json::from_value(stored.clone())?)
    }

    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.lock();
        let key = Self::record::<K>(&mut state, Operation::Delete, namespace, name)?;
        match state.objects.remove(&key) {
            Some(_) => Ok(()),
            None => Err(not_found(key)),
        }
    }
}
