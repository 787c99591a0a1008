//! Error types for the Jira operator

use thiserror::Error;

/// Errors surfaced by the reconciler, the object stores and the certificate authority
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Object store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Certificate generation failed: {0}")]
    CertificateGeneration(#[from] rcgen::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// True for the store's "object does not exist" answer, the trigger for a create
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::KubeError(kube::Error::Api(e)) => e.code == 404,
            _ => false,
        }
    }

    /// Transient failures are requeued quickly by the controller's error policy
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::KubeError(_) | Error::StoreUnavailable(_) | Error::AlreadyExists { .. }
        )
    }
}
