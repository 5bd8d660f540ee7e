// ABOUTME: Defines all error types for the dining library using thiserror.
// ABOUTME: Each submodule has its own error enum, unified under DiningError.

use crate::resource::HolderId;

/// Top-level error type for the dining library.
#[derive(Debug, thiserror::Error)]
pub enum DiningError {
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Caller misuse of a shared resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("{requester} released resource {resource_id}, which is not held")]
    NotHeld {
        resource_id: usize,
        requester: HolderId,
    },

    #[error("{requester} does not hold resource {resource_id} (held by {owner})")]
    NotOwner {
        resource_id: usize,
        owner: HolderId,
        requester: HolderId,
    },
}

/// Errors from loading or validating a simulation configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
