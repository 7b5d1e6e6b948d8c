//! Commands accepted by the lifecycle state machine

use serde::{Deserialize, Serialize};

/// A request to move an Event from one status to another
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCommand {
    ForwardToDepartment,
    StartInvestigation,
    RequestEscalation,
    RejectObservation,
    EscalationReject,
    EscalationAcceptObservation,
    EscalationUpgrade,
    ApproveRejection,
    OverturnRejection,
    SubmitForValidation,
    AcceptValidation,
    RejectValidation,
    SelfClose,
    CloseDirect,
    SubmitForFinalClosure,
    FinalClose,
    SubmitViolation,
    ApproveViolation,
    ReturnViolation,
}

impl EventCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCommand::ForwardToDepartment => "forward_to_department",
            EventCommand::StartInvestigation => "start_investigation",
            EventCommand::RequestEscalation => "request_escalation",
            EventCommand::RejectObservation => "reject_observation",
            EventCommand::EscalationReject => "escalation_reject",
            EventCommand::EscalationAcceptObservation => "escalation_accept_observation",
            EventCommand::EscalationUpgrade => "escalation_upgrade",
            EventCommand::ApproveRejection => "approve_rejection",
            EventCommand::OverturnRejection => "overturn_rejection",
            EventCommand::SubmitForValidation => "submit_for_validation",
            EventCommand::AcceptValidation => "accept_validation",
            EventCommand::RejectValidation => "reject_validation",
            EventCommand::SelfClose => "self_close",
            EventCommand::CloseDirect => "close_direct",
            EventCommand::SubmitForFinalClosure => "submit_for_final_closure",
            EventCommand::FinalClose => "final_close",
            EventCommand::SubmitViolation => "submit_violation",
            EventCommand::ApproveViolation => "approve_violation",
            EventCommand::ReturnViolation => "return_violation",
        }
    }
}

impl std::fmt::Display for EventCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to move a CorrectiveAction from one status to another
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCommand {
    Start,
    Complete,
    Verify,
    ReturnForCorrection,
    Close,
}

impl ActionCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionCommand::Start => "start_action",
            ActionCommand::Complete => "complete_action",
            ActionCommand::Verify => "verify_action",
            ActionCommand::ReturnForCorrection => "return_action_for_correction",
            ActionCommand::Close => "close_action",
        }
    }
}

impl std::fmt::Display for ActionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
