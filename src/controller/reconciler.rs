//! Main reconciler for Jira resources
//!
//! [`Reconciler`] drives one Jira towards its desired state through an
//! [`ObjectStore`]. The kube-rs runtime glue at the bottom of this file
//! feeds it from a `Controller<Jira>` and syncs status after each pass.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Pod, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::Api,
    client::Client,
    runtime::{
        controller::{Action, Controller},
        watcher::Config,
    },
    Resource, ResourceExt,
};
use tracing::{debug, error, info, instrument, warn};

use crate::config::OperatorConfig;
use crate::crd::Jira;
use crate::error::{Error, Result};
use crate::store::{object_key, KubeStore, ObjectStore, StoreObject};

use super::normalize::{normalize, Normalized};
use super::resources::{
    build_config_map, build_ingress, build_pod, build_pvc, build_service, build_tls_secret,
    owner_reference, resource_labels,
};
use super::status::sync_status;
use super::tls::ingress_tls_bundle;

/// How a reconciliation pass ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Defaults were persisted; children are left for the next pass
    Normalized,
    /// Every applicable child exists
    Converged,
}

/// Reconciles Jira resources against an object store
pub struct Reconciler<S> {
    store: S,
    config: Arc<OperatorConfig>,
}

impl<S: ObjectStore> Reconciler<S> {
    pub fn new(store: S, config: Arc<OperatorConfig>) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Run one reconciliation pass for `desired`
    ///
    /// Store errors other than not-found abort the pass and are returned
    /// unchanged. Nothing created earlier in the pass is rolled back.
    #[instrument(skip(self, desired), fields(name = desired.metadata.name.as_deref(), namespace = desired.metadata.namespace.as_deref()))]
    pub async fn reconcile(&self, desired: &Jira) -> Result<Outcome> {
        if desired.metadata.name.as_deref().unwrap_or_default().is_empty()
            || desired.metadata.namespace.as_deref().unwrap_or_default().is_empty()
        {
            return Err(Error::InvalidInput(
                "Jira resource has no name or namespace".to_string(),
            ));
        }

        let Normalized { resource, changed } = normalize(desired, &self.config);
        if changed {
            info!("Persisting defaulted spec for {}", resource.name_any());
            self.store.update(&resource).await?;
            return Ok(Outcome::Normalized);
        }

        let jira = &resource;
        let config = self.config.as_ref();

        self.ensure(jira, build_config_map(jira), Ok).await?;

        match build_pvc(jira) {
            Some(pvc) => self.ensure(jira, pvc, Ok).await?,
            None => debug!("Persistent storage disabled, skipping PVC"),
        }

        self.ensure(jira, build_pod(jira, config), Ok).await?;
        self.ensure(jira, build_service(jira, config), Ok).await?;

        match build_tls_secret(jira) {
            Some(secret) => {
                self.ensure(jira, secret, |mut secret: Secret| {
                    secret.data = Some(ingress_tls_bundle(jira, config)?.into_secret_data());
                    Ok(secret)
                })
                .await?
            }
            None => debug!("Ingress TLS disabled, skipping TLS secret"),
        }

        match build_ingress(jira, config) {
            Some(ingress) => self.ensure(jira, ingress, Ok).await?,
            None => debug!("No ingress policy, skipping Ingress"),
        }

        Ok(Outcome::Converged)
    }

    /// Create `child` unless an object of its kind and name already exists
    ///
    /// `finish` runs only on the create path, after ownership metadata has
    /// been attached.
    async fn ensure<K, F>(&self, owner: &Jira, mut child: K, finish: F) -> Result<()>
    where
        K: StoreObject,
        F: FnOnce(K) -> Result<K> + Send,
    {
        let (namespace, name) = object_key(&child);
        let kind = K::kind(&());

        match self.store.get::<K>(&namespace, &name).await {
            Ok(_) => {
                debug!("{} {}/{} already exists", kind, namespace, name);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                let meta = child.meta_mut();
                meta.owner_references = Some(vec![owner_reference(owner)]);
                meta.labels = Some(resource_labels(owner));
                let child = finish(child)?;

                info!("Creating {} {}/{}", kind, namespace, name);
                self.store.create(&child).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// Controller runtime
// ============================================================================

/// Shared state for the controller
pub struct ControllerState {
    pub client: Client,
    pub reconciler: Reconciler<KubeStore>,
}

impl ControllerState {
    pub fn new(client: Client, config: Arc<OperatorConfig>) -> Self {
        let reconciler = Reconciler::new(KubeStore::new(client.clone()), config);
        Self { client, reconciler }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        match self.reconciler.config().watch_namespace.as_deref() {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }
}

/// Main entry point to start the controller
pub async fn run_controller(state: Arc<ControllerState>) -> Result<()> {
    let jiras: Api<Jira> = state.api();

    info!("Starting Jira controller");

    // Verify CRD exists
    match jiras.list(&Default::default()).await {
        Ok(_) => info!("Jira CRD is available"),
        Err(e) => {
            error!("Jira CRD not found. Please install the CRD first: {:?}", e);
            return Err(Error::ConfigError("Jira CRD not installed".to_string()));
        }
    }

    Controller::new(jiras, Config::default())
        .owns::<ConfigMap>(state.api(), Config::default())
        .owns::<PersistentVolumeClaim>(state.api(), Config::default())
        .owns::<Pod>(state.api(), Config::default())
        .owns::<Service>(state.api(), Config::default())
        .owns::<Secret>(state.api(), Config::default())
        .owns::<Ingress>(state.api(), Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, state)
        .for_each(|res| async move {
            match res {
                Ok(obj) => debug!("Reconciled: {:?}", obj),
                Err(e) => error!("Reconcile error: {:?}", e),
            }
        })
        .await;

    Ok(())
}

/// Typed entry point invoked by the controller for every Jira event
async fn reconcile(jira: Arc<Jira>, ctx: Arc<ControllerState>) -> Result<Action> {
    let reconciler = &ctx.reconciler;
    let resync = Action::requeue(reconciler.config().resync_period);

    match reconciler.reconcile(&jira).await? {
        Outcome::Normalized => Ok(resync),
        Outcome::Converged => {
            if let Err(e) = sync_status(&jira, reconciler.store(), reconciler.config()).await {
                warn!("Failed to update status of {}: {}", jira.name_any(), e);
            }
            Ok(resync)
        }
    }
}

/// Error policy for the controller
fn error_policy(jira: Arc<Jira>, error: &Error, _ctx: Arc<ControllerState>) -> Action {
    error!("Reconciliation error for {}: {:?}", jira.name_any(), error);

    let retry_duration = if error.is_retriable() {
        Duration::from_secs(15)
    } else {
        Duration::from_secs(60)
    };

    Action::requeue(retry_duration)
}
