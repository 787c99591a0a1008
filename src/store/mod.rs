//! Object store abstraction
//!
//! The reconciler only ever needs five round trips against the cluster:
//! get, create, update, status update and delete. [`ObjectStore`] captures
//! exactly that, so the same reconciliation code runs against the API
//! server ([`KubeStore`]) and against fixtures in tests ([`InMemoryStore`]).

mod kube_store;
mod memory;

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub use kube_store::KubeStore;
pub use memory::{InMemoryStore, Operation, StoreCall};

/// A namespaced object that can round-trip through a store
pub trait StoreObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoreObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Blocking-per-call access to the object store
///
/// Every call is a single awaited round trip. A missing object is reported
/// as an error for which [`crate::Error::is_not_found`] is true; that is the
/// only error class callers are expected to branch on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object by namespace and name
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K>;

    /// Create an object in the namespace recorded in its metadata
    async fn create<K: StoreObject>(&self, object: &K) -> Result<K>;

    /// Replace an existing object
    async fn update<K: StoreObject>(&self, object: &K) -> Result<K>;

    /// Write the status subresource of an existing object
    async fn update_status<K: StoreObject>(&self, object: &K) -> Result<K>;

    /// Delete an object by namespace and name
    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Namespace and name of an object, as required by every store call
pub(crate) fn object_key<K: StoreObject>(object: &K) -> (String, String) {
    let meta = object.meta();
    (
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    )
}
