//! Jira Custom Resource Definition
//!
//! A `Jira` resource declares one Jira server: the image to run, where Jira
//! home lives, optional persistent storage and an optional ingress route
//! with operator-minted TLS.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::core::v1::{PersistentVolumeClaimSpec, ResourceRequirements};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "jira.atlassian.com",
    version = "v1alpha1",
    kind = "Jira",
    namespaced,
    status = "JiraStatus",
    derive = "PartialEq",
    derive = "Default",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Endpoint","type":"string","jsonPath":".status.endpoint"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct JiraSpec {
    /// Image to run, without tag
    #[serde(default, rename = "base_image")]
    pub base_image: String,

    /// Tag of the base image
    #[serde(default, rename = "base_image_version")]
    pub base_image_version: String,

    /// Jira home inside the container
    #[serde(default, rename = "data_mount_path")]
    pub data_mount_path: String,

    /// Name of the ConfigMap holding `dbconfig.xml`
    #[serde(default)]
    pub config_map_name: String,

    #[serde(default)]
    pub secret_name: String,

    /// Pod policy. Cannot be changed once the resource is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<JiraPodPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<JiraIngressPolicy>,
}

impl JiraSpec {
    /// Persistent storage is enabled when the pod policy carries a claim template
    pub fn is_pv_enabled(&self) -> bool {
        self.pod
            .as_ref()
            .is_some_and(|pod| pod.persistent_volume_claim_spec.is_some())
    }

    pub fn is_ingress_tls_enabled(&self) -> bool {
        self.ingress.as_ref().is_some_and(|ingress| ingress.tls)
    }
}

/// Policy for the Pod that runs Jira
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JiraPodPolicy {
    /// Resource requirements for the Jira container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub resources: Option<ResourceRequirements>,

    /// Claim template for Jira home. Without it the Pod gets no data volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub persistent_volume_claim_spec: Option<PersistentVolumeClaimSpec>,
}

/// Policy for exposing Jira through an Ingress
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JiraIngressPolicy {
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub path: String,

    /// Terminate TLS at the ingress with an operator-generated certificate
    #[serde(default)]
    pub tls: bool,

    /// Secret holding the ingress certificate
    #[serde(default)]
    pub secret_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// Observed state of a Jira resource
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JiraStatus {
    /// URI clients use to reach Jira
    pub endpoint: String,

    /// Service fronting the Jira Pod
    pub service_name: String,

    pub state: AppState,
}

/// Coarse lifecycle of the Jira application
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum AppState {
    #[default]
    Initializing,
    Available,
    Unavailable,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppState::Initializing => "Initializing",
            AppState::Available => "Available",
            AppState::Unavailable => "Unavailable",
        };
        write!(f, "{s}")
    }
}
