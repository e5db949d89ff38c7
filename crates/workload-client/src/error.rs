//! Workload client errors

use thiserror::Error;

/// Errors that can occur when talking to the cluster
#[derive(Debug, Error)]
pub enum ClientError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Request rejected by the API server
    #[error("API error: {0}")]
    Api(String),

    /// Kubeconfig could not be loaded
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(String),

    /// Resource not found
    #[error("{kind} {name:?} not found")]
    NotFound {
        /// Kind of the missing resource
        kind: String,
        /// `namespace/name` or `name` of the missing resource
        name: String,
    },

    /// Optimistic concurrency conflict, the object changed on the server
    #[error("conflict updating {kind} {name:?}: {message}")]
    Conflict {
        /// Kind of the conflicting resource
        kind: String,
        /// Name of the conflicting resource
        name: String,
        /// Server provided message
        message: String,
    },

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Log streaming failed
    #[error("Log streaming failed: {0}")]
    Logs(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// `true` for [`ClientError::NotFound`] and API 404 responses.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Kube(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }

    /// `true` for [`ClientError::Conflict`] and API 409 responses.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::Kube(kube::Error::Api(resp)) => resp.code == 409,
            _ => false,
        }
    }

    /// Translate API 404/409 responses into typed variants.
    pub(crate) fn from_api(err: kube::Error, kind: &str, name: &str) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => Self::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(resp) if resp.code == 409 => Self::Conflict {
                kind: kind.to_string(),
                name: name.to_string(),
                message: resp.message.clone(),
            },
            _ => Self::Kube(err),
        }
    }
}
