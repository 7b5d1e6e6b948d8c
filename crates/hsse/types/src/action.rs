//! Corrective actions: remedial tasks owned by an Event

use crate::{ActionId, ActorId, EventId, ExtensionId, FactorId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a corrective action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Assigned,
    InProgress,
    Completed,
    ReturnedForCorrection,
    Verified,
    Closed,
}

impl ActionStatus {
    pub const ALL: [ActionStatus; 6] = [
        ActionStatus::Assigned,
        ActionStatus::InProgress,
        ActionStatus::Completed,
        ActionStatus::ReturnedForCorrection,
        ActionStatus::Verified,
        ActionStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Assigned => "assigned",
            ActionStatus::InProgress => "in_progress",
            ActionStatus::Completed => "completed",
            ActionStatus::ReturnedForCorrection => "returned_for_correction",
            ActionStatus::Verified => "verified",
            ActionStatus::Closed => "closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Closed)
    }

    /// Whether an action in this status satisfies closure coverage
    pub fn counts_toward_coverage(&self) -> bool {
        matches!(self, ActionStatus::Verified | ActionStatus::Closed)
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remedial task tied to an Event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectiveAction {
    pub id: ActionId,
    pub tenant_id: TenantId,
    pub event_id: EventId,
    /// Root cause / contributing factor this action remedies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor_id: Option<FactorId>,
    pub title: String,
    pub owner_id: ActorId,
    pub status: ActionStatus,
    pub due_date: DateTime<Utc>,
    /// Incremented each time a verifier sends the action back
    pub return_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_extension_id: Option<ExtensionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl CorrectiveAction {
    pub fn counts_toward_coverage(&self) -> bool {
        self.status.counts_toward_coverage()
    }

    pub fn remedies(&self, factor: &FactorId) -> bool {
        self.factor_id.as_ref() == Some(factor)
    }
}
