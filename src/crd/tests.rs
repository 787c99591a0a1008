//! Unit tests for the Jira custom resource
//!
//! Covers the wire format of existing manifests and the policy helpers the
//! reconciler gates its optional steps on.

#[cfg(test)]
mod jira_spec {
    use k8s_openapi::api::core::v1::PersistentVolumeClaimSpec;
    use kube::CustomResourceExt;

    use crate::crd::{AppState, Jira, JiraIngressPolicy, JiraPodPolicy, JiraSpec, JiraStatus};

    #[test]
    fn test_deserialize_manifest_spec() {
        let spec: JiraSpec = serde_json::from_value(serde_json::json!({
            "base_image": "atlassian/jira-software",
            "base_image_version": "8.0.0",
            "data_mount_path": "/data",
            "configMapName": "jira-config",
            "secretName": "jira-secret",
            "pod": {
                "resources": { "requests": { "memory": "2Gi" } },
                "persistentVolumeClaimSpec": {
                    "accessModes": ["ReadWriteOnce"],
                    "resources": { "requests": { "storage": "10Gi" } }
                }
            },
            "ingress": {
                "host": "jira.example.com",
                "path": "/jira",
                "tls": true,
                "secretName": "jira-tls",
                "annotations": { "kubernetes.io/ingress.class": "nginx" }
            }
        }))
        .unwrap();

        assert_eq!(spec.base_image, "atlassian/jira-software");
        assert_eq!(spec.base_image_version, "8.0.0");
        assert_eq!(spec.data_mount_path, "/data");
        assert_eq!(spec.config_map_name, "jira-config");
        assert_eq!(spec.secret_name, "jira-secret");
        assert!(spec.is_pv_enabled());
        assert!(spec.is_ingress_tls_enabled());

        let ingress = spec.ingress.unwrap();
        assert_eq!(ingress.host, "jira.example.com");
        assert_eq!(ingress.secret_name, "jira-tls");
        assert_eq!(
            ingress
                .annotations
                .unwrap()
                .get("kubernetes.io/ingress.class")
                .map(String::as_str),
            Some("nginx")
        );
    }

    #[test]
    fn test_empty_spec_deserializes_to_defaults() {
        let spec: JiraSpec = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(spec, JiraSpec::default());
        assert!(!spec.is_pv_enabled());
        assert!(spec.ingress.is_none());
    }

    #[test]
    fn test_snake_case_fields_are_serialized_as_is() {
        let spec = JiraSpec {
            base_image: "img".to_string(),
            base_image_version: "1".to_string(),
            data_mount_path: "/home".to_string(),
            config_map_name: "cm".to_string(),
            secret_name: "sec".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["base_image"], "img");
        assert_eq!(value["base_image_version"], "1");
        assert_eq!(value["data_mount_path"], "/home");
        assert_eq!(value["configMapName"], "cm");
        assert_eq!(value["secretName"], "sec");
        assert!(value.get("pod").is_none());
    }

    #[test]
    fn test_pod_policy_without_claim_disables_pv() {
        let spec = JiraSpec {
            pod: Some(JiraPodPolicy::default()),
            ..Default::default()
        };
        assert!(!spec.is_pv_enabled());

        let spec = JiraSpec {
            pod: Some(JiraPodPolicy {
                persistent_volume_claim_spec: Some(PersistentVolumeClaimSpec::default()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(spec.is_pv_enabled());
    }

    #[test]
    fn test_tls_requires_ingress_flag() {
        let spec = JiraSpec {
            ingress: Some(JiraIngressPolicy {
                host: "h".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(spec.ingress.is_some());
        assert!(!spec.is_ingress_tls_enabled());
    }

    #[test]
    fn test_status_wire_format() {
        let status = JiraStatus {
            endpoint: "https://jira.example.com/".to_string(),
            service_name: "jira".to_string(),
            state: AppState::Available,
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["serviceName"], "jira");
        assert_eq!(value["state"], "Available");
        assert_eq!(AppState::Unavailable.to_string(), "Unavailable");
    }

    #[test]
    fn test_crd_metadata() {
        let crd = Jira::crd();
        assert_eq!(crd.spec.group, "jira.atlassian.com");
        assert_eq!(crd.spec.names.kind, "Jira");
        assert_eq!(crd.spec.versions[0].name, "v1alpha1");
        assert_eq!(crd.spec.scope, "Namespaced");
    }
}
