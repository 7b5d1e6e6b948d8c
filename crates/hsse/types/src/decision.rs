//! Review decisions and the closure checklist

use crate::{ActorId, DecisionId, EventId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of an HSSE escalation review
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationOutcome {
    /// Send the observation back to the department
    Reject,
    /// Keep it as an observation and move on to HSSE validation
    AcceptObservation,
    /// Supersede the observation with a new incident Event
    UpgradeIncident,
}

impl EscalationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationOutcome::Reject => "reject",
            EscalationOutcome::AcceptObservation => "accept_observation",
            EscalationOutcome::UpgradeIncident => "upgrade_incident",
        }
    }
}

/// Record of a department escalation outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationDecision {
    pub id: DecisionId,
    pub tenant_id: TenantId,
    pub event_id: EventId,
    pub decision: EscalationOutcome,
    pub decided_by: ActorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Set only for [`EscalationOutcome::UpgradeIncident`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resulting_event_id: Option<EventId>,
    pub decided_at: DateTime<Utc>,
}

/// Outcome of a second-opinion review of a rejected observation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReviewOutcome {
    /// Confirm the rejection; the Event ends as rejected
    ApproveRejection,
    /// Overturn the rejection; the department must act on the Event
    RejectRejection,
}

impl RejectionReviewOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReviewOutcome::ApproveRejection => "approve_rejection",
            RejectionReviewOutcome::RejectRejection => "reject_rejection",
        }
    }
}

/// Record of a rejection review
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionReviewDecision {
    pub id: DecisionId,
    pub tenant_id: TenantId,
    pub event_id: EventId,
    pub decision: RejectionReviewOutcome,
    pub decided_by: ActorId,
    pub notes: String,
    pub decided_at: DateTime<Utc>,
}

/// Binary decision used by the validation and contract-controller steps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    Approved,
    Rejected,
}

/// Investigation checklist supplied when closure is requested
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub evidence_collected: bool,
    pub witnesses_interviewed: bool,
    pub root_cause_analysis_complete: bool,
    pub actions_assigned: bool,
}

impl Checklist {
    pub fn complete() -> Self {
        Self {
            evidence_collected: true,
            witnesses_interviewed: true,
            root_cause_analysis_complete: true,
            actions_assigned: true,
        }
    }

    /// Human-readable labels of unchecked items
    pub fn missing_items(&self) -> Vec<String> {
        [
            (self.evidence_collected, "evidence collected"),
            (self.witnesses_interviewed, "witnesses interviewed"),
            (self.root_cause_analysis_complete, "root-cause analysis complete"),
            (self.actions_assigned, "corrective actions assigned"),
        ]
        .into_iter()
        .filter(|(done, _)| !done)
        .map(|(_, label)| format!("checklist: {}", label))
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_items().is_empty()
    }
}
