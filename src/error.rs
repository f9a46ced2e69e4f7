//! Error types for the Sync Agent
//!
//! Provides structured error types for volume reconciliation, the pod
//! watcher, the reply gateway and configuration loading.

use thiserror::Error;

/// Unified error type for the agent
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Volume Descriptor Errors
    // =========================================================================
    #[error("Invalid source config for volume {volume_id}: {reason}")]
    InvalidVolumeSource { volume_id: String, reason: String },

    #[error("Claim {claim} requests access mode {requested} but only {supported} is supported")]
    AccessModeMismatch {
        claim: String,
        requested: String,
        supported: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Kubernetes API call failed for {kind}/{name}: {source}")]
    ClusterApi {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("Storage class not found: {name}")]
    StorageClassNotFound { name: String },

    #[error("Pod watch failed: {0}")]
    Watch(String),

    // =========================================================================
    // Gateway Errors
    // =========================================================================
    #[error("Error sending reply {event_id}: {reason}")]
    Reply { event_id: String, reason: String },

    #[error("Reply transport error: {0}")]
    ReplyTransport(#[from] reqwest::Error),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad classification of an error, used when reporting a failure upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller-side input problem; resubmitting the same request fails again
    Config,
    /// Cluster API or watch failure; resubmitting may succeed
    ClusterTransport,
    /// Reply could not be delivered to the origin
    Gateway,
    /// Anything else
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::ClusterTransport => write!(f, "cluster_transport"),
            ErrorCategory::Gateway => write!(f, "gateway"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

impl Error {
    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Configuration(_)
            | Error::InvalidVolumeSource { .. }
            | Error::AccessModeMismatch { .. }
            | Error::InvalidRequest(_)
            | Error::JsonParse(_)
            | Error::YamlParse(_) => ErrorCategory::Config,

            Error::Kube(_)
            | Error::ClusterApi { .. }
            | Error::StorageClassNotFound { .. }
            | Error::Watch(_) => ErrorCategory::ClusterTransport,

            Error::Reply { .. } | Error::ReplyTransport(_) => ErrorCategory::Gateway,

            Error::Internal(_) | Error::Io(_) => ErrorCategory::Internal,
        }
    }

    /// Check if replaying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        self.category() != ErrorCategory::Config
    }

    /// Wrap a failed cluster call with the kind and name of the object involved
    pub fn cluster(kind: &str, name: &str, source: kube::Error) -> Self {
        Error::ClusterApi {
            kind: kind.to_string(),
            name: name.to_string(),
            source,
        }
    }
}

/// Result type alias for the agent
pub type Result<T> = std::result::Result<T, Error>;
