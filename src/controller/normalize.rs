//! Defaulting of Jira resources
//!
//! Children are only ever built from a fully defaulted spec. The reconciler
//! normalizes first and, when anything changed, persists the result and
//! waits for the next pass.

use crate::config::OperatorConfig;
use crate::crd::{Jira, JiraSpec};

/// Result of normalizing a Jira resource
#[derive(Clone, Debug, PartialEq)]
pub struct Normalized {
    pub resource: Jira,
    pub changed: bool,
}

/// Return a copy of `desired` with every unset field defaulted
pub fn normalize(desired: &Jira, config: &OperatorConfig) -> Normalized {
    let mut resource = desired.clone();
    let name = resource.metadata.name.clone().unwrap_or_default();
    let changed = apply_defaults(&mut resource.spec, &name, config);
    Normalized { resource, changed }
}

fn set_if_empty(field: &mut String, value: &str) -> bool {
    if field.is_empty() && !value.is_empty() {
        *field = value.to_string();
        return true;
    }
    false
}

fn apply_defaults(spec: &mut JiraSpec, name: &str, config: &OperatorConfig) -> bool {
    let mut changed = false;
    changed |= set_if_empty(&mut spec.base_image, &config.default_base_image);
    changed |= set_if_empty(
        &mut spec.base_image_version,
        &config.default_base_image_version,
    );
    changed |= set_if_empty(&mut spec.config_map_name, name);
    changed |= set_if_empty(&mut spec.data_mount_path, &config.default_data_mount_path);
    changed |= set_if_empty(&mut spec.secret_name, name);

    let secret_name = spec.secret_name.clone();
    if let Some(ingress) = spec.ingress.as_mut() {
        changed |= set_if_empty(&mut ingress.host, name);
        changed |= set_if_empty(&mut ingress.path, &config.default_ingress_path);
        changed |= set_if_empty(&mut ingress.secret_name, &secret_name);
    }
    changed
}

#[cfg(test)]
mod tests {
    use kube::api::ObjectMeta;

    use super::*;
    use crate::crd::JiraIngressPolicy;

    fn jira(name: &str, spec: JiraSpec) -> Jira {
        Jira {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns".to_string()),
                ..Default::default()
            },
            spec,
            status: None,
        }
    }

    #[test]
    fn test_empty_spec_gets_defaults() {
        let config = OperatorConfig::default();
        let normalized = normalize(&jira("app", JiraSpec::default()), &config);

        assert!(normalized.changed);
        let spec = &normalized.resource.spec;
        assert_eq!(spec.base_image, "cptactionhank/atlassian-jira");
        assert_eq!(spec.base_image_version, "7.10.2");
        assert_eq!(spec.data_mount_path, "/var/atlassian/jira");
        assert_eq!(spec.config_map_name, "app");
        assert_eq!(spec.secret_name, "app");
        assert!(spec.ingress.is_none());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let config = OperatorConfig::default();
        let spec = JiraSpec {
            ingress: Some(JiraIngressPolicy::default()),
            ..Default::default()
        };
        let first = normalize(&jira("app", spec), &config);
        let second = normalize(&first.resource, &config);

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.resource, second.resource);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let config = OperatorConfig::default();
        let original = jira("app", JiraSpec::default());
        let snapshot = original.clone();
        let _ = normalize(&original, &config);
        assert_eq!(original, snapshot);
    }

    #[test]
    fn test_fully_specified_spec_is_unchanged() {
        let config = OperatorConfig::default();
        let spec = JiraSpec {
            base_image: "test".to_string(),
            base_image_version: "test".to_string(),
            config_map_name: "test".to_string(),
            data_mount_path: "test".to_string(),
            secret_name: "test".to_string(),
            ..Default::default()
        };
        let normalized = normalize(&jira("app", spec.clone()), &config);
        assert!(!normalized.changed);
        assert_eq!(normalized.resource.spec, spec);
    }

    #[test]
    fn test_single_missing_field_reports_change() {
        let config = OperatorConfig::default();
        let spec = JiraSpec {
            base_image: "test".to_string(),
            base_image_version: "test".to_string(),
            config_map_name: "test".to_string(),
            data_mount_path: "test".to_string(),
            ..Default::default()
        };
        let normalized = normalize(&jira("app", spec), &config);
        assert!(normalized.changed);
        assert_eq!(normalized.resource.spec.secret_name, "app");
    }

    #[test]
    fn test_ingress_defaults() {
        let config = OperatorConfig::default();
        let spec = JiraSpec {
            secret_name: "custom-secret".to_string(),
            ingress: Some(JiraIngressPolicy {
                tls: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let normalized = normalize(&jira("test-jira", spec), &config);
        let ingress = normalized.resource.spec.ingress.unwrap();
        assert_eq!(ingress.host, "test-jira");
        assert_eq!(ingress.path, "/");
        assert_eq!(ingress.secret_name, "custom-secret");
        assert!(ingress.tls);
    }

    #[test]
    fn test_explicit_ingress_values_are_kept() {
        let config = OperatorConfig::default();
        let spec = JiraSpec {
            ingress: Some(JiraIngressPolicy {
                host: "jira.example.com".to_string(),
                path: "/jira".to_string(),
                secret_name: "jira-tls".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let normalized = normalize(&jira("app", spec), &config);
        let ingress = normalized.resource.spec.ingress.unwrap();
        assert_eq!(ingress.host, "jira.example.com");
        assert_eq!(ingress.path, "/jira");
        assert_eq!(ingress.secret_name, "jira-tls");
    }

    #[test]
    fn test_config_defaults_are_used() {
        let config = OperatorConfig {
            default_base_image: "atlassian/jira-software".to_string(),
            default_base_image_version: "9.4.0".to_string(),
            ..OperatorConfig::default()
        };
        let normalized = normalize(&jira("app", JiraSpec::default()), &config);
        assert_eq!(normalized.resource.spec.base_image, "atlassian/jira-software");
        assert_eq!(normalized.resource.spec.base_image_version, "9.4.0");
    }
}
