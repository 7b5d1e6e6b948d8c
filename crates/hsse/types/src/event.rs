//! Events: the aggregate root of the lifecycle
//!
//! An Event is created on submission and afterwards mutated only through
//! orchestrator-approved transitions. It is never physically deleted.

use crate::{ActorId, EventId, FactorId, LifecycleError, LifecycleResult, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Classification ───────────────────────────────────────────────────

/// Kind of safety event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Observation,
    Incident,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Observation => "observation",
            EventType::Incident => "incident",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk classification, 1 (lowest) to 5 (highest)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(level: u8) -> LifecycleResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(LifecycleError::invalid_severity(level))
        }
    }

    pub fn level(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Severity {
    type Error = LifecycleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Severity::new(value)
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value.0
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Status ───────────────────────────────────────────────────────────

/// Lifecycle status of an Event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Submitted,
    PendingDeptRepApproval,
    PendingHsseEscalationReview,
    PendingHsseRejectionReview,
    InvestigationInProgress,
    PendingHsseValidation,
    PendingContractControllerApproval,
    PendingFinalClosure,
    Closed,
    /// Observation rejection confirmed by HSSE review
    Rejected,
    /// Observation superseded by a new incident Event
    Upgraded,
}

impl EventStatus {
    pub const ALL: [EventStatus; 11] = [
        EventStatus::Submitted,
        EventStatus::PendingDeptRepApproval,
        EventStatus::PendingHsseEscalationReview,
        EventStatus::PendingHsseRejectionReview,
        EventStatus::InvestigationInProgress,
        EventStatus::PendingHsseValidation,
        EventStatus::PendingContractControllerApproval,
        EventStatus::PendingFinalClosure,
        EventStatus::Closed,
        EventStatus::Rejected,
        EventStatus::Upgraded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Submitted => "submitted",
            EventStatus::PendingDeptRepApproval => "pending_dept_rep_approval",
            EventStatus::PendingHsseEscalationReview => "pending_hsse_escalation_review",
            EventStatus::PendingHsseRejectionReview => "pending_hsse_rejection_review",
            EventStatus::InvestigationInProgress => "investigation_in_progress",
            EventStatus::PendingHsseValidation => "pending_hsse_validation",
            EventStatus::PendingContractControllerApproval => {
                "pending_contract_controller_approval"
            }
            EventStatus::PendingFinalClosure => "pending_final_closure",
            EventStatus::Closed => "closed",
            EventStatus::Rejected => "rejected",
            EventStatus::Upgraded => "upgraded",
        }
    }

    /// No transition is defined out of a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventStatus::Closed | EventStatus::Rejected | EventStatus::Upgraded
        )
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of HSSE expert validation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HsseValidationStatus {
    #[default]
    None,
    Accepted,
    Rejected,
}

impl HsseValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HsseValidationStatus::None => "none",
            HsseValidationStatus::Accepted => "accepted",
            HsseValidationStatus::Rejected => "rejected",
        }
    }
}

// ── Contractor violations ────────────────────────────────────────────

/// Status of a contractor violation determination
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationStatus {
    PendingApproval,
    /// Penalty approved by the contract controller
    Enforceable,
    ReturnedForRework,
}

/// A contractor violation and its proposed financial penalty
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationDetermination {
    pub contractor: String,
    /// Penalty in minor currency units
    pub penalty_amount_minor: i64,
    pub currency: String,
    pub status: ViolationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ViolationDetermination {
    pub fn new(
        contractor: impl Into<String>,
        penalty_amount_minor: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            contractor: contractor.into(),
            penalty_amount_minor,
            currency: currency.into(),
            status: ViolationStatus::PendingApproval,
            notes: None,
        }
    }

    pub fn is_enforceable(&self) -> bool {
        self.status == ViolationStatus::Enforceable
    }
}

// ── Causal factors ───────────────────────────────────────────────────

/// Root cause or contributing factor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    RootCause,
    ContributingFactor,
}

impl FactorKind {
    pub fn label(&self) -> &'static str {
        match self {
            FactorKind::RootCause => "root cause",
            FactorKind::ContributingFactor => "contributing factor",
        }
    }
}

/// A root cause or contributing factor recorded during investigation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalFactor {
    pub id: FactorId,
    pub tenant_id: TenantId,
    pub event_id: EventId,
    pub kind: FactorKind,
    pub description: String,
    pub recorded_by: ActorId,
    pub recorded_at: DateTime<Utc>,
}

// ── Event ────────────────────────────────────────────────────────────

/// Submission payload for a new Event
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_type: EventType,
    pub severity: u8,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

impl NewEvent {
    pub fn observation(severity: u8, title: impl Into<String>) -> Self {
        Self {
            event_type: EventType::Observation,
            severity,
            title: title.into(),
            description: String::new(),
            department: None,
            due_date: None,
        }
    }

    pub fn incident(severity: u8, title: impl Into<String>) -> Self {
        Self {
            event_type: EventType::Incident,
            ..Self::observation(severity, title)
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A reported safety occurrence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub tenant_id: TenantId,
    /// Human-facing reference, e.g. `INC-2026-00042`
    pub reference_code: String,
    pub event_type: EventType,
    pub severity: Severity,
    pub status: EventStatus,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub reporter_id: ActorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investigator_id: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Derived from severity at submission
    pub closure_requires_manager_close: bool,
    pub hsse_validation_status: HsseValidationStatus,
    /// Set on an incident created by upgrading an observation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_event_id: Option<EventId>,
    /// Set on an observation that was upgraded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgraded_to: Option<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<ViolationDetermination>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Write counter maintained by storage; used for optimistic concurrency
    #[serde(default)]
    pub revision: u64,
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn validation_accepted(&self) -> bool {
        self.hsse_validation_status == HsseValidationStatus::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_rejects_out_of_range() {
        assert!(Severity::new(0).is_err());
        assert!(Severity::new(6).is_err());
        for level in 1..=5 {
            assert_eq!(Severity::new(level).unwrap().level(), level);
        }
    }

    #[test]
    fn severity_deserialization_is_range_checked() {
        assert!(serde_json::from_str::<Severity>("3").is_ok());
        assert!(serde_json::from_str::<Severity>("9").is_err());
    }

    #[test]
    fn terminal_statuses() {
        let terminal: Vec<_> = EventStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                &EventStatus::Closed,
                &EventStatus::Rejected,
                &EventStatus::Upgraded
            ]
        );
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&EventStatus::PendingHsseEscalationReview).unwrap();
        assert_eq!(json, "\"pending_hsse_escalation_review\"");
        assert_eq!(
            EventStatus::PendingHsseEscalationReview.as_str(),
            "pending_hsse_escalation_review"
        );
    }
}
