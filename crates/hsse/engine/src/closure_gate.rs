//! Closure gate: checklist and corrective-action coverage
//!
//! Before an Event may be closed or submitted for final closure, the
//! caller's investigation checklist must be complete and every recorded
//! root cause and contributing factor must have at least one linked action
//! that is verified or closed.

use hsse_types::{
    CausalFactor, Checklist, CorrectiveAction, LifecycleError, LifecycleResult, ReasonCode,
};
use serde::{Deserialize, Serialize};

/// Result of a closure-readiness check
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureAssessment {
    pub allowed: bool,
    /// Human-readable unmet items; empty when `allowed`
    pub missing_items: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ClosureGate;

impl ClosureGate {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate readiness without side effects
    pub fn assess(
        &self,
        checklist: &Checklist,
        factors: &[CausalFactor],
        actions: &[CorrectiveAction],
    ) -> ClosureAssessment {
        let mut missing_items = checklist.missing_items();
        missing_items.extend(Self::uncovered(factors, actions));
        ClosureAssessment {
            allowed: missing_items.is_empty(),
            missing_items,
        }
    }

    /// Fail with `Validation` for an incomplete checklist, then with
    /// `InvariantViolation` for uncovered factors
    pub fn enforce(
        &self,
        checklist: &Checklist,
        factors: &[CausalFactor],
        actions: &[CorrectiveAction],
    ) -> LifecycleResult<()> {
        let unchecked = checklist.missing_items();
        if !unchecked.is_empty() {
            return Err(LifecycleError::validation(
                ReasonCode::ChecklistIncomplete,
                format!("checklist incomplete: {}", unchecked.join(", ")),
            ));
        }

        let uncovered = Self::uncovered(factors, actions);
        if !uncovered.is_empty() {
            return Err(LifecycleError::invariant(
                ReasonCode::CoverageIncomplete,
                format!(
                    "{} causal factor(s) lack a verified or closed corrective action",
                    uncovered.len()
                ),
                uncovered,
            ));
        }
        Ok(())
    }

    fn uncovered(factors: &[CausalFactor], actions: &[CorrectiveAction]) -> Vec<String> {
        factors
            .iter()
            .filter(|factor| {
                !actions
                    .iter()
                    .any(|a| a.remedies(&factor.id) && a.counts_toward_coverage())
            })
            .map(|factor| {
                format!(
                    "{} '{}' has no verified or closed corrective action",
                    factor.kind.label(),
                    factor.description
                )
            })
            .collect()
    }
}
