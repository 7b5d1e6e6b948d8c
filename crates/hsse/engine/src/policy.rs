//! Severity policy resolver
//!
//! Pure mapping from a severity level to the closure rules that apply to an
//! Event. No I/O and no side effects.

use hsse_types::{EventCommand, LifecycleResult, Severity};
use serde::{Deserialize, Serialize};

/// Closure rules for one severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosurePolicy {
    pub severity: Severity,
    /// The reporter may close the Event personally
    pub self_close_allowed: bool,
    /// HSSE must accept the investigation before closure
    pub requires_expert_validation: bool,
    /// Closure goes through `pending_final_closure` and a manager
    pub requires_manager_close: bool,
}

impl ClosurePolicy {
    pub fn for_severity(severity: Severity) -> Self {
        match severity.level() {
            1 | 2 => Self {
                severity,
                self_close_allowed: true,
                requires_expert_validation: false,
                requires_manager_close: false,
            },
            3 | 4 => Self {
                severity,
                self_close_allowed: false,
                requires_expert_validation: true,
                requires_manager_close: false,
            },
            _ => Self {
                severity,
                self_close_allowed: false,
                requires_expert_validation: true,
                requires_manager_close: true,
            },
        }
    }

    /// The command a closure request turns into under this policy
    pub fn closure_command(&self) -> EventCommand {
        if self.requires_manager_close {
            EventCommand::SubmitForFinalClosure
        } else {
            EventCommand::CloseDirect
        }
    }
}

/// Resolve the closure policy for a raw severity level.
///
/// Fails with a validation error for levels outside 1..=5.
pub fn resolve_policy(level: u8) -> LifecycleResult<ClosurePolicy> {
    Severity::new(level).map(ClosurePolicy::for_severity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hsse_types::ReasonCode;
    use proptest::prelude::*;

    #[test]
    fn severity_five_requires_manager_and_validation() {
        let policy = resolve_policy(5).unwrap();
        assert!(policy.requires_expert_validation);
        assert!(policy.requires_manager_close);
        assert!(!policy.self_close_allowed);
        assert_eq!(policy.closure_command(), EventCommand::SubmitForFinalClosure);
    }

    #[test]
    fn out_of_range_is_a_validation_error() {
        let err = resolve_policy(0).unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::InvalidSeverity);
        assert_eq!(err.kind(), "validation");
    }

    proptest! {
        #[test]
        fn low_severity_allows_self_close(level in 1u8..=2) {
            let policy = resolve_policy(level).unwrap();
            prop_assert!(policy.self_close_allowed);
            prop_assert!(!policy.requires_expert_validation);
            prop_assert!(!policy.requires_manager_close);
        }

        #[test]
        fn medium_severity_requires_validation_only(level in 3u8..=4) {
            let policy = resolve_policy(level).unwrap();
            prop_assert!(!policy.self_close_allowed);
            prop_assert!(policy.requires_expert_validation);
            prop_assert!(!policy.requires_manager_close);
            prop_assert_eq!(policy.closure_command(), EventCommand::CloseDirect);
        }

        #[test]
        fn resolution_is_total_over_u8(level in any::<u8>()) {
            let resolved = resolve_policy(level);
            prop_assert_eq!(resolved.is_ok(), (1..=5).contains(&level));
        }

        #[test]
        fn self_close_and_validation_are_exclusive(level in 1u8..=5) {
            let policy = resolve_policy(level).unwrap();
            prop_assert!(policy.self_close_allowed != policy.requires_expert_validation);
        }
    }
}
