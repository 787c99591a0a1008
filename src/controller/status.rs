//! Observed state of a Jira resource
//!
//! The projector derives `JiraStatus` from the live Pod. Store failures are
//! folded into [`AppState::Unavailable`]; only the status write itself can
//! fail [`sync_status`].

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tracing::{debug, info, instrument, warn};

use crate::config::OperatorConfig;
use crate::crd::{AppState, Jira, JiraStatus};
use crate::error::Result;
use crate::store::ObjectStore;

/// Externally reachable URI of a Jira
///
/// With an ingress policy this is `{scheme}://{host}{path}`, `https` only
/// when TLS is enabled. Without one it points at the in-cluster Service.
pub fn format_endpoint(jira: &Jira, config: &OperatorConfig) -> String {
    match jira.spec.ingress.as_ref() {
        Some(ingress) => {
            let scheme = if jira.spec.is_ingress_tls_enabled() {
                "https"
            } else {
                "http"
            };
            format!("{}://{}{}", scheme, ingress.host, ingress.path)
        }
        None => format!(
            "http://{}:{}{}",
            jira.name_any(),
            config.service_port,
            config.default_ingress_path
        ),
    }
}

/// Map the Jira container's readiness to an application state
pub fn app_state(pod: &Pod) -> AppState {
    let first = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .and_then(|statuses| statuses.first());

    match first {
        Some(container) if container.ready => AppState::Available,
        Some(_) => AppState::Initializing,
        None => AppState::Unavailable,
    }
}

/// Project the current status of `jira` from the live Pod
pub async fn project_status<S: ObjectStore>(
    jira: &Jira,
    store: &S,
    config: &OperatorConfig,
) -> JiraStatus {
    let name = jira.name_any();
    let namespace = jira.namespace().unwrap_or_default();

    let state = match store.get::<Pod>(&namespace, &name).await {
        Ok(pod) => app_state(&pod),
        Err(e) if e.is_not_found() => AppState::Initializing,
        Err(e) => {
            warn!("Failed to read Pod {}/{}: {}", namespace, name, e);
            AppState::Unavailable
        }
    };

    JiraStatus {
        endpoint: format_endpoint(jira, config),
        service_name: name,
        state,
    }
}

/// Write the projected status when it differs from the stored one
///
/// Returns whether a write happened.
#[instrument(skip(jira, store, config), fields(name = %jira.name_any(), namespace = jira.namespace()))]
pub async fn sync_status<S: ObjectStore>(
    jira: &Jira,
    store: &S,
    config: &OperatorConfig,
) -> Result<bool> {
    let status = project_status(jira, store, config).await;
    if jira.status.as_ref() == Some(&status) {
        debug!("Status unchanged ({})", status.state);
        return Ok(false);
    }

    info!("Updating status: state={} endpoint={}", status.state, status.endpoint);
    let mut updated = jira.clone();
    updated.status = Some(status);
    store.update_status(&updated).await?;
    Ok(true)
}
