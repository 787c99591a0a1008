//! Operator-wide configuration
//!
//! Built once at startup from command-line flags (each backed by an
//! environment variable) and shared read-only with the reconciler, the
//! resource builders and the status projector.

use std::time::Duration;

use clap::Args;

use crate::error::{Error, Result};

/// Immutable defaults and fixed policy values used while reconciling
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Image used when a Jira resource does not name one
    pub default_base_image: String,
    /// Image tag used when a Jira resource does not name one
    pub default_base_image_version: String,
    /// Jira home directory inside the container
    pub default_data_mount_path: String,
    /// Path used for endpoints and ingress rules when none is given
    pub default_ingress_path: String,
    /// Port exposed by the Jira container and its Service
    pub service_port: i32,
    /// Name of the exposed port
    pub service_port_name: String,
    /// Image of the init container that seeds the data volume
    pub init_image: String,
    /// Common name of the per-secret certificate authority
    pub ca_common_name: String,
    /// Organization written into CA and leaf certificates
    pub tls_organization: String,
    /// Requeue interval after a successful pass
    pub resync_period: Duration,
    /// Namespace to watch, all namespaces when unset
    pub watch_namespace: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            default_base_image: "cptactionhank/atlassian-jira".to_string(),
            default_base_image_version: "7.10.2".to_string(),
            default_data_mount_path: "/var/atlassian/jira".to_string(),
            default_ingress_path: "/".to_string(),
            service_port: 8080,
            service_port_name: "http".to_string(),
            init_image: "busybox".to_string(),
            ca_common_name: "Jira Operator CA".to_string(),
            tls_organization: "jira-operator".to_string(),
            resync_period: Duration::from_secs(5),
            watch_namespace: None,
        }
    }
}

impl OperatorConfig {
    /// Reject configurations that would produce invalid child objects
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("default base image", &self.default_base_image),
            ("default base image version", &self.default_base_image_version),
            ("default data mount path", &self.default_data_mount_path),
            ("default ingress path", &self.default_ingress_path),
            ("service port name", &self.service_port_name),
            ("init image", &self.init_image),
            ("CA common name", &self.ca_common_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::ConfigError(format!("{field} must not be empty")));
            }
        }

        if !(1..=65535).contains(&self.service_port) {
            return Err(Error::ConfigError(format!(
                "service port {} is outside 1..=65535",
                self.service_port
            )));
        }

        if self.resync_period.is_zero() {
            return Err(Error::ConfigError(
                "resync period must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

/// Command-line flags that make up an [`OperatorConfig`]
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Image used when a Jira resource does not set `base_image`
    #[arg(
        long,
        env = "JIRA_DEFAULT_BASE_IMAGE",
        default_value = "cptactionhank/atlassian-jira"
    )]
    pub default_base_image: String,

    /// Tag used when a Jira resource does not set `base_image_version`
    #[arg(long, env = "JIRA_DEFAULT_BASE_IMAGE_VERSION", default_value = "7.10.2")]
    pub default_base_image_version: String,

    /// Jira home used when a Jira resource does not set `data_mount_path`
    #[arg(
        long,
        env = "JIRA_DEFAULT_DATA_MOUNT_PATH",
        default_value = "/var/atlassian/jira"
    )]
    pub default_data_mount_path: String,

    /// Ingress path used when an ingress policy leaves it empty
    #[arg(long, env = "JIRA_DEFAULT_INGRESS_PATH", default_value = "/")]
    pub default_ingress_path: String,

    /// Port exposed by the Jira container and Service
    #[arg(long, env = "JIRA_SERVICE_PORT", default_value_t = 8080)]
    pub service_port: i32,

    /// Image for the init container that seeds persistent storage
    #[arg(long, env = "JIRA_INIT_IMAGE", default_value = "busybox")]
    pub init_image: String,

    /// Common name of the generated certificate authorities
    #[arg(long, env = "JIRA_CA_COMMON_NAME", default_value = "Jira Operator CA")]
    pub ca_common_name: String,

    /// Organization written into generated certificates
    #[arg(long, env = "JIRA_TLS_ORGANIZATION", default_value = "jira-operator")]
    pub tls_organization: String,

    /// Seconds between periodic resyncs of every Jira resource
    #[arg(long, env = "RESYNC_PERIOD", default_value_t = 5)]
    pub resync_seconds: u64,

    /// Restrict the operator to a single namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,
}

impl From<ConfigArgs> for OperatorConfig {
    fn from(args: ConfigArgs) -> Self {
        Self {
            default_base_image: args.default_base_image,
            default_base_image_version: args.default_base_image_version,
            default_data_mount_path: args.default_data_mount_path,
            default_ingress_path: args.default_ingress_path,
            service_port: args.service_port,
            init_image: args.init_image,
            ca_common_name: args.ca_common_name,
            tls_organization: args.tls_organization,
            resync_period: Duration::from_secs(args.resync_seconds),
            watch_namespace: args.watch_namespace.filter(|ns| !ns.is_empty()),
            ..Self::default()
        }
    }
}
