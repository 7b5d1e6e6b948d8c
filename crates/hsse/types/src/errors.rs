//! Error types for the lifecycle layer

use crate::ActorId;
use serde::{Deserialize, Serialize};

/// Machine-readable reason attached to every [`LifecycleError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    ReasonTooShort,
    NotesTooShort,
    DueDateNotInFuture,
    ChecklistIncomplete,
    InvalidSeverity,
    MissingInvestigator,
    InvalidInput,
    PermissionDenied,
    InvalidTransition,
    TerminalState,
    ConcurrentModification,
    ExtensionAlreadyOpen,
    RequestAlreadyDecided,
    NotFound,
    CoverageIncomplete,
    ValidationNotAccepted,
    ValidationNotRequired,
    SelfCloseNotPermitted,
    ManagerCloseRequired,
    StorageFailure,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::ReasonTooShort => "reason_too_short",
            ReasonCode::NotesTooShort => "notes_too_short",
            ReasonCode::DueDateNotInFuture => "due_date_not_in_future",
            ReasonCode::ChecklistIncomplete => "checklist_incomplete",
            ReasonCode::InvalidSeverity => "invalid_severity",
            ReasonCode::MissingInvestigator => "missing_investigator",
            ReasonCode::InvalidInput => "invalid_input",
            ReasonCode::PermissionDenied => "permission_denied",
            ReasonCode::InvalidTransition => "invalid_transition",
            ReasonCode::TerminalState => "terminal_state",
            ReasonCode::ConcurrentModification => "concurrent_modification",
            ReasonCode::ExtensionAlreadyOpen => "extension_already_open",
            ReasonCode::RequestAlreadyDecided => "request_already_decided",
            ReasonCode::NotFound => "not_found",
            ReasonCode::CoverageIncomplete => "coverage_incomplete",
            ReasonCode::ValidationNotAccepted => "validation_not_accepted",
            ReasonCode::ValidationNotRequired => "validation_not_required",
            ReasonCode::SelfCloseNotPermitted => "self_close_not_permitted",
            ReasonCode::ManagerCloseRequired => "manager_close_required",
            ReasonCode::StorageFailure => "storage_failure",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported synchronously by lifecycle operations.
///
/// Any error means nothing was committed: no status changed and no audit
/// entry was appended.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("validation failed ({code}): {message}")]
    Validation { code: ReasonCode, message: String },

    #[error("permission denied: {actor} lacks capability '{capability}'")]
    Permission { actor: ActorId, capability: String },

    #[error("conflict ({code}): {message}")]
    Conflict {
        code: ReasonCode,
        message: String,
        current_state: Option<String>,
        attempted: Option<String>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invariant violation ({code}): {message}")]
    InvariantViolation {
        code: ReasonCode,
        message: String,
        missing: Vec<String>,
    },

    #[error("storage failure: {0}")]
    Storage(String),
}

impl LifecycleError {
    pub fn validation(code: ReasonCode, message: impl Into<String>) -> Self {
        LifecycleError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn permission(actor: &ActorId, capability: impl Into<String>) -> Self {
        LifecycleError::Permission {
            actor: actor.clone(),
            capability: capability.into(),
        }
    }

    pub fn conflict(code: ReasonCode, message: impl Into<String>) -> Self {
        LifecycleError::Conflict {
            code,
            message: message.into(),
            current_state: None,
            attempted: None,
        }
    }

    /// A command that has no row in the transition table for the current
    /// status.
    pub fn invalid_transition(current: &str, attempted: &str, terminal: bool) -> Self {
        let (code, message) = if terminal {
            (
                ReasonCode::TerminalState,
                format!("'{}' is terminal; cannot apply '{}'", current, attempted),
            )
        } else {
            (
                ReasonCode::InvalidTransition,
                format!("cannot apply '{}' while in '{}'", attempted, current),
            )
        };
        LifecycleError::Conflict {
            code,
            message,
            current_state: Some(current.to_string()),
            attempted: Some(attempted.to_string()),
        }
    }

    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        LifecycleError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invariant(code: ReasonCode, message: impl Into<String>, missing: Vec<String>) -> Self {
        LifecycleError::InvariantViolation {
            code,
            message: message.into(),
            missing,
        }
    }

    pub fn invalid_severity(level: u8) -> Self {
        LifecycleError::validation(
            ReasonCode::InvalidSeverity,
            format!("severity must be between 1 and 5, got {}", level),
        )
    }

    /// Machine-readable reason for this error
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            LifecycleError::Validation { code, .. }
            | LifecycleError::Conflict { code, .. }
            | LifecycleError::InvariantViolation { code, .. } => *code,
            LifecycleError::Permission { .. } => ReasonCode::PermissionDenied,
            LifecycleError::NotFound { .. } => ReasonCode::NotFound,
            LifecycleError::Storage(_) => ReasonCode::StorageFailure,
        }
    }

    /// Error family name (`validation`, `permission`, ...)
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Validation { .. } => "validation",
            LifecycleError::Permission { .. } => "permission",
            LifecycleError::Conflict { .. } => "conflict",
            LifecycleError::NotFound { .. } => "not_found",
            LifecycleError::InvariantViolation { .. } => "invariant_violation",
            LifecycleError::Storage(_) => "storage",
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, LifecycleError::Conflict { .. })
    }
}

/// Result type alias for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_names_state_and_command() {
        let err = LifecycleError::invalid_transition("closed", "final_close", true);
        assert_eq!(err.reason_code(), ReasonCode::TerminalState);
        assert!(err.to_string().contains("closed"));
        assert!(err.to_string().contains("final_close"));

        let err = LifecycleError::invalid_transition("submitted", "final_close", false);
        assert_eq!(err.reason_code(), ReasonCode::InvalidTransition);
    }

    #[test]
    fn reason_codes_serialize_snake_case() {
        let json = serde_json::to_string(&ReasonCode::ExtensionAlreadyOpen).unwrap();
        assert_eq!(json, "\"extension_already_open\"");
        assert_eq!(ReasonCode::ExtensionAlreadyOpen.as_str(), "extension_already_open");
    }

    #[test]
    fn permission_error_reports_denied_code() {
        let err = LifecycleError::permission(&ActorId::new("bob"), "manager_close");
        assert_eq!(err.reason_code(), ReasonCode::PermissionDenied);
        assert_eq!(err.kind(), "permission");
    }
}
