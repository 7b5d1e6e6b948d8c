//! Extension requests: changing a corrective action's due date
//!
//! A request carries its own approval chain. With a single-level chain the
//! HSSE manager's decision is final; with a two-level chain the line manager
//! decides first.

use crate::{ActionId, ActorId, EventId, ExtensionId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of an extension request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ExtensionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionStatus::Pending => "pending",
            ExtensionStatus::Approved => "approved",
            ExtensionStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExtensionStatus::Pending)
    }
}

impl std::fmt::Display for ExtensionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who decides a step of the approval chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalLevel {
    LineManager,
    HsseManager,
}

impl ApprovalLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalLevel::LineManager => "line_manager",
            ApprovalLevel::HsseManager => "hsse_manager",
        }
    }
}

/// Decision on a request or one of its steps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionDecision {
    Approve,
    Reject,
}

/// One level of the approval chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub level: ApprovalLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<ExtensionDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl ApprovalStep {
    pub fn pending(level: ApprovalLevel) -> Self {
        Self {
            level,
            decided_by: None,
            decision: None,
            notes: None,
            decided_at: None,
        }
    }

    pub fn is_decided(&self) -> bool {
        self.decision.is_some()
    }
}

/// Request to move a corrective action's due date
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRequest {
    pub id: ExtensionId,
    pub tenant_id: TenantId,
    pub event_id: EventId,
    pub action_id: ActionId,
    pub requester_id: ActorId,
    pub current_due_date: DateTime<Utc>,
    pub requested_due_date: DateTime<Utc>,
    pub reason: String,
    pub approval_chain: Vec<ApprovalStep>,
    /// Index of the next undecided step
    pub current_step: usize,
    pub status: ExtensionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl ExtensionRequest {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The step awaiting a decision, if any
    pub fn pending_step(&self) -> Option<&ApprovalStep> {
        if self.is_terminal() {
            return None;
        }
        self.approval_chain.get(self.current_step)
    }

    pub fn is_final_step(&self) -> bool {
        self.current_step + 1 >= self.approval_chain.len()
    }
}
