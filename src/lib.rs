//! jira-operator: Kubernetes operator for Jira
//!
//! This crate reconciles `Jira` custom resources into the ConfigMap,
//! storage, Pod, Service, Ingress and TLS Secret that run one Jira server.

pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod store;
pub mod telemetry;

pub use crate::error::{Error, Result};
