use hsse_types::{LifecycleError, ReasonCode};
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// `current_state` is the status found when a guard did not hold
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        current_state: Option<String>,
    },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn conflict(message: impl Into<String>) -> Self {
        StorageError::Conflict {
            message: message.into(),
            current_state: None,
        }
    }

    /// A guard found `current` where it expected something else
    pub fn stale(message: impl Into<String>, current: impl std::fmt::Display) -> Self {
        StorageError::Conflict {
            message: message.into(),
            current_state: Some(current.to_string()),
        }
    }
}

impl From<StorageError> for LifecycleError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => LifecycleError::NotFound {
                entity: "record",
                id: what,
            },
            StorageError::Conflict {
                message,
                current_state,
            } => LifecycleError::Conflict {
                code: ReasonCode::ConcurrentModification,
                message,
                current_state,
                attempted: None,
            },
            other => LifecycleError::Storage(other.to_string()),
        }
    }
}
