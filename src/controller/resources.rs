//! Kubernetes resource builders for Jira
//!
//! Each builder is a pure function of the (normalized) Jira resource and the
//! operator configuration. Builders fill in structural fields only; owner
//! references and labels are attached by the reconciler right before a
//! child is created.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EnvVar, ExecAction,
    HTTPGetAction, KeyToPath, PersistentVolumeClaim, PersistentVolumeClaimVolumeSource, Pod,
    PodSpec, Probe, Secret, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Resource, ResourceExt};

use crate::config::OperatorConfig;
use crate::crd::Jira;

/// Key of the database configuration inside the ConfigMap
pub const DB_CONFIG_KEY: &str = "dbconfig.xml";

/// Default configuration for the embedded H2 database
pub const DEFAULT_DATABASE_CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<jira-database-config>
	<name>defaultDS</name>
	<delegator-name>default</delegator-name>
	<database-type>h2</database-type>
	<schema-name>PUBLIC</schema-name>
	<jdbc-datasource>
		<url>jdbc:h2:file:/var/atlassian/jira/database/h2db</url>
		<driver-class>org.h2.Driver</driver-class>
		<username>sa</username>
		<password></password>
		<pool-min-size>20</pool-min-size>
		<pool-max-size>20</pool-max-size>
		<pool-max-wait>30000</pool-max-wait>
		<min-evictable-idle-time-millis>4000</min-evictable-idle-time-millis>
		<time-between-eviction-runs-millis>5000</time-between-eviction-runs-millis>
		<pool-max-idle>20</pool-max-idle>
		<pool-remove-abandoned>true</pool-remove-abandoned>
		<pool-remove-abandoned-timeout>300</pool-remove-abandoned-timeout>
	</jdbc-datasource>
</jira-database-config>
"#;

const CONTAINER_NAME: &str = "jira";
const INIT_CONTAINER_NAME: &str = "init";
const CONFIG_VOLUME: &str = "jira-config";
const DATA_VOLUME: &str = "jira-data";
const CONFIG_MOUNT_PATH: &str = "/etc/jira";

/// Get the fixed identity labels for a Jira's resources
pub fn standard_labels(jira: &Jira) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), "jira".to_string());
    labels.insert("cluster".to_string(), jira.name_any());
    labels
}

/// Identity labels merged with the Jira's own labels, the latter winning
pub fn resource_labels(jira: &Jira) -> BTreeMap<String, String> {
    let mut labels = standard_labels(jira);
    labels.extend(jira.labels().clone());
    labels
}

/// Create an OwnerReference for garbage collection
pub fn owner_reference(jira: &Jira) -> OwnerReference {
    OwnerReference {
        api_version: Jira::api_version(&()).to_string(),
        kind: Jira::kind(&()).to_string(),
        name: jira.name_any(),
        uid: jira.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

fn child_meta(jira: &Jira, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: jira.namespace(),
        ..Default::default()
    }
}

// ============================================================================
// ConfigMap
// ============================================================================

pub fn build_config_map(jira: &Jira) -> ConfigMap {
    ConfigMap {
        metadata: child_meta(jira, &jira.spec.config_map_name),
        data: Some(BTreeMap::from([(
            DB_CONFIG_KEY.to_string(),
            DEFAULT_DATABASE_CONFIG.to_string(),
        )])),
        ..Default::default()
    }
}

// ============================================================================
// PersistentVolumeClaim
// ============================================================================

/// Claim for Jira home, `None` unless the pod policy carries a claim template
pub fn build_pvc(jira: &Jira) -> Option<PersistentVolumeClaim> {
    let claim_spec = jira
        .spec
        .pod
        .as_ref()
        .and_then(|pod| pod.persistent_volume_claim_spec.clone())?;

    Some(PersistentVolumeClaim {
        metadata: child_meta(jira, &jira.name_any()),
        spec: Some(claim_spec),
        status: None,
    })
}

// ============================================================================
// Pod
// ============================================================================

pub fn build_pod(jira: &Jira, config: &OperatorConfig) -> Pod {
    Pod {
        metadata: child_meta(jira, &jira.name_any()),
        spec: Some(PodSpec {
            init_containers: Some(build_init_containers(jira, config)),
            containers: vec![build_container(jira, config)],
            volumes: Some(build_volumes(jira)),
            ..Default::default()
        }),
        status: None,
    }
}

fn build_container(jira: &Jira, config: &OperatorConfig) -> Container {
    Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(format!(
            "{}:{}",
            jira.spec.base_image, jira.spec.base_image_version
        )),
        ports: Some(vec![ContainerPort {
            container_port: config.service_port,
            name: Some(config.service_port_name.clone()),
            ..Default::default()
        }]),
        env: Some(container_env(jira)),
        liveness_probe: Some(liveness_probe(config)),
        readiness_probe: Some(readiness_probe(config)),
        resources: jira.spec.pod.as_ref().and_then(|pod| pod.resources.clone()),
        stdin: Some(true),
        tty: Some(true),
        volume_mounts: Some(container_volume_mounts(jira)),
        ..Default::default()
    }
}

/// Reverse-proxy settings understood by the Jira image
pub fn container_env(jira: &Jira) -> Vec<EnvVar> {
    let Some(ingress) = jira.spec.ingress.as_ref() else {
        return Vec::new();
    };

    let (port, scheme) = if jira.spec.is_ingress_tls_enabled() {
        ("443", "https")
    } else {
        ("80", "http")
    };

    [
        ("X_PROXY_NAME", ingress.host.as_str()),
        ("X_PATH", ingress.path.as_str()),
        ("X_PROXY_PORT", port),
        ("X_PROXY_SCHEME", scheme),
    ]
    .into_iter()
    .map(|(name, value)| EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    })
    .collect()
}

pub fn liveness_probe(config: &OperatorConfig) -> Probe {
    Probe {
        exec: Some(ExecAction {
            command: Some(vec![
                "curl".to_string(),
                "--connect-timeout".to_string(),
                "5".to_string(),
                "--max-time".to_string(),
                "10".to_string(),
                "-k".to_string(),
                "-s".to_string(),
                format!("http://localhost:{}/", config.service_port),
            ]),
        }),
        initial_delay_seconds: Some(120),
        timeout_seconds: Some(10),
        period_seconds: Some(120),
        failure_threshold: Some(3),
        ..Default::default()
    }
}

pub fn readiness_probe(config: &OperatorConfig) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some("/".to_string()),
            port: IntOrString::Int(config.service_port),
            scheme: Some("HTTP".to_string()),
            ..Default::default()
        }),
        initial_delay_seconds: Some(60),
        timeout_seconds: Some(10),
        period_seconds: Some(30),
        failure_threshold: Some(5),
        ..Default::default()
    }
}

/// Seed the data volume with `dbconfig.xml` before Jira starts
fn build_init_containers(jira: &Jira, config: &OperatorConfig) -> Vec<Container> {
    if !jira.spec.is_pv_enabled() {
        return Vec::new();
    }

    let mount_path = &jira.spec.data_mount_path;
    vec![Container {
        name: INIT_CONTAINER_NAME.to_string(),
        image: Some(config.init_image.clone()),
        command: Some(vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            format!("cp {CONFIG_MOUNT_PATH}/{DB_CONFIG_KEY} {mount_path}/; chown -R 2:2 {mount_path}"),
        ]),
        volume_mounts: Some(vec![
            VolumeMount {
                name: DATA_VOLUME.to_string(),
                mount_path: mount_path.clone(),
                ..Default::default()
            },
            VolumeMount {
                name: CONFIG_VOLUME.to_string(),
                mount_path: CONFIG_MOUNT_PATH.to_string(),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }]
}

fn container_volume_mounts(jira: &Jira) -> Vec<VolumeMount> {
    if !jira.spec.is_pv_enabled() {
        return Vec::new();
    }
    vec![VolumeMount {
        name: DATA_VOLUME.to_string(),
        mount_path: jira.spec.data_mount_path.clone(),
        ..Default::default()
    }]
}

fn build_volumes(jira: &Jira) -> Vec<Volume> {
    let mut volumes = vec![Volume {
        name: CONFIG_VOLUME.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: Some(jira.spec.config_map_name.clone()),
            items: Some(vec![KeyToPath {
                key: DB_CONFIG_KEY.to_string(),
                path: DB_CONFIG_KEY.to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }];

    if jira.spec.is_pv_enabled() {
        volumes.push(Volume {
            name: DATA_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: jira.name_any(),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    volumes
}

// ============================================================================
// Service
// ============================================================================

pub fn build_service(jira: &Jira, config: &OperatorConfig) -> Service {
    Service {
        metadata: child_meta(jira, &jira.name_any()),
        spec: Some(ServiceSpec {
            selector: Some(resource_labels(jira)),
            session_affinity: Some("ClientIP".to_string()),
            type_: Some("NodePort".to_string()),
            ports: Some(vec![ServicePort {
                name: Some(config.service_port_name.clone()),
                port: config.service_port,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

// ============================================================================
// Ingress
// ============================================================================

/// Ingress routing the policy's host and path to the Service
pub fn build_ingress(jira: &Jira, config: &OperatorConfig) -> Option<Ingress> {
    let policy = jira.spec.ingress.as_ref()?;

    let rule = IngressRule {
        host: Some(policy.host.clone()),
        http: Some(HTTPIngressRuleValue {
            paths: vec![HTTPIngressPath {
                path: Some(policy.path.clone()),
                path_type: "Prefix".to_string(),
                backend: IngressBackend {
                    service: Some(IngressServiceBackend {
                        name: jira.name_any(),
                        port: Some(ServiceBackendPort {
                            number: Some(config.service_port),
                            name: None,
                        }),
                    }),
                    ..Default::default()
                },
            }],
        }),
    };

    let tls = jira.spec.is_ingress_tls_enabled().then(|| {
        vec![IngressTLS {
            hosts: Some(vec![policy.host.clone()]),
            secret_name: Some(policy.secret_name.clone()),
        }]
    });

    let mut metadata = child_meta(jira, &jira.name_any());
    metadata.annotations = policy
        .annotations
        .clone()
        .filter(|annotations| !annotations.is_empty());

    Some(Ingress {
        metadata,
        spec: Some(IngressSpec {
            rules: Some(vec![rule]),
            tls,
            ..Default::default()
        }),
        status: None,
    })
}

// ============================================================================
// TLS Secret
// ============================================================================

/// Secret for the ingress certificate, `None` unless ingress TLS is enabled
///
/// The payload is minted only when the secret is actually created, see
/// [`crate::controller::tls::ingress_tls_bundle`].
pub fn build_tls_secret(jira: &Jira) -> Option<Secret> {
    if !jira.spec.is_ingress_tls_enabled() {
        return None;
    }
    let policy = jira.spec.ingress.as_ref()?;

    Some(Secret {
        metadata: child_meta(jira, &policy.secret_name),
        type_: Some("kubernetes.io/tls".to_string()),
        ..Default::default()
    })
}
