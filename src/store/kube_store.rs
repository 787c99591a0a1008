//! [`ObjectStore`] backed by the Kubernetes API server

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::Client;
use tracing::{debug, instrument};

use super::{object_key, ObjectStore, StoreObject};
use crate::error::{Error, Result};

const FIELD_MANAGER: &str = "jira-operator";

/// Store that talks to the cluster through a shared [`Client`]
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Translate API answers the reconciler branches on into typed errors
fn map_api_error<K: StoreObject>(err: kube::Error, namespace: &str, name: &str) -> Error {
    match err {
        kube::Error::Api(ref response) if response.code == 404 => Error::NotFound {
            kind: K::kind(&()).to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        other => Error::KubeError(other),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    #[instrument(skip(self), fields(kind = %K::kind(&())))]
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K> {
        self.api::<K>(namespace)
            .get(name)
            .await
            .map_err(|e| map_api_error::<K>(e, namespace, name))
    }

    #[instrument(skip(self, object), fields(kind = %K::kind(&())))]
    async fn create<K: StoreObject>(&self, object: &K) -> Result<K> {
        let (namespace, name) = object_key(object);
        debug!("Creating {} {}/{}", K::kind(&()), namespace, name);
        self.api::<K>(&namespace)
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| match e {
                kube::Error::Api(ref response) if response.code == 409 => Error::AlreadyExists {
                    kind: K::kind(&()).to_string(),
                    namespace: namespace.clone(),
                    name: name.clone(),
                },
                other => map_api_error::<K>(other, &namespace, &name),
            })
    }

    #[instrument(skip(self, object), fields(kind = %K::kind(&())))]
    async fn update<K: StoreObject>(&self, object: &K) -> Result<K> {
        let (namespace, name) = object_key(object);
        self.api::<K>(&namespace)
            .replace(&name, &PostParams::default(), object)
            .await
            .map_err(|e| map_api_error::<K>(e, &namespace, &name))
    }

    #[instrument(skip(self, object), fields(kind = %K::kind(&())))]
    async fn update_status<K: StoreObject>(&self, object: &K) -> Result<K> {
        let (namespace, name) = object_key(object);
        let value = serde_json::to_value(object)?;
        let patch = serde_json::json!({ "status": value.get("status") });
        self.api::<K>(&namespace)
            .patch_status(
                &name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| map_api_error::<K>(e, &namespace, &name))
    }

    #[instrument(skip(self), fields(kind = %K::kind(&())))]
    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<()> {
        self.api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| map_api_error::<K>(e, namespace, name))
    }
}
