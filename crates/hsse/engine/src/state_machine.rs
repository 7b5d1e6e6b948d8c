//! Lifecycle state machine
//!
//! Every legal move of an Event or a CorrectiveAction is one row of a
//! static transition table. `apply` checks, in order:
//!
//! 1. that a row exists for the current status and command (else `Conflict`)
//! 2. that the actor holds the row's capability (else `Permission`)
//! 3. that the severity policy admits the move (else `InvariantViolation`)
//!
//! It returns the target status and never mutates anything; the caller
//! persists the result together with its audit entry.

use crate::guard::{AuthorizationGuard, Capability, EventContext};
use crate::policy::ClosurePolicy;
use hsse_types::{
    ActionCommand, ActionStatus, ActorId, CorrectiveAction, Event, EventCommand, EventStatus,
    LifecycleError, LifecycleResult, ReasonCode,
};
use hsse_types::{ActionStatus as A, EventCommand as C, EventStatus as S};

/// One row of the Event transition table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: EventStatus,
    pub command: EventCommand,
    pub to: EventStatus,
    pub capability: Capability,
}

/// One row of the CorrectiveAction transition table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionTransition {
    pub from: ActionStatus,
    pub command: ActionCommand,
    pub to: ActionStatus,
    pub capability: Capability,
}

const fn row(
    from: EventStatus,
    command: EventCommand,
    to: EventStatus,
    capability: Capability,
) -> Transition {
    Transition {
        from,
        command,
        to,
        capability,
    }
}

const fn action_row(
    from: ActionStatus,
    command: ActionCommand,
    to: ActionStatus,
    capability: Capability,
) -> ActionTransition {
    ActionTransition {
        from,
        command,
        to,
        capability,
    }
}

/// Every legal Event transition
#[rustfmt::skip]
pub static TRANSITIONS: &[Transition] = &[
    // Intake and department routing
    row(S::Submitted, C::ForwardToDepartment, S::PendingDeptRepApproval, Capability::RouteEvent),
    row(S::Submitted, C::StartInvestigation, S::InvestigationInProgress, Capability::RouteEvent),
    row(S::PendingDeptRepApproval, C::StartInvestigation, S::InvestigationInProgress, Capability::RouteEvent),
    row(S::PendingDeptRepApproval, C::RequestEscalation, S::PendingHsseEscalationReview, Capability::ReviewAsDepartment),
    row(S::PendingDeptRepApproval, C::RejectObservation, S::PendingHsseRejectionReview, Capability::ReviewAsDepartment),
    // Escalation review
    row(S::PendingHsseEscalationReview, C::EscalationReject, S::PendingDeptRepApproval, Capability::ReviewEscalation),
    row(S::PendingHsseEscalationReview, C::EscalationAcceptObservation, S::PendingHsseValidation, Capability::ReviewEscalation),
    row(S::PendingHsseEscalationReview, C::EscalationUpgrade, S::Upgraded, Capability::ReviewEscalation),
    // Rejection review
    row(S::PendingHsseRejectionReview, C::ApproveRejection, S::Rejected, Capability::ReviewRejection),
    row(S::PendingHsseRejectionReview, C::OverturnRejection, S::PendingDeptRepApproval, Capability::ReviewRejection),
    // Investigation and expert validation
    row(S::InvestigationInProgress, C::SubmitForValidation, S::PendingHsseValidation, Capability::RecordInvestigation),
    row(S::PendingHsseValidation, C::AcceptValidation, S::PendingHsseValidation, Capability::ValidateEvent),
    row(S::PendingHsseValidation, C::RejectValidation, S::InvestigationInProgress, Capability::ValidateEvent),
    // Closure
    row(S::InvestigationInProgress, C::SelfClose, S::Closed, Capability::SelfClose),
    row(S::InvestigationInProgress, C::CloseDirect, S::Closed, Capability::CloseEvent),
    row(S::PendingHsseValidation, C::CloseDirect, S::Closed, Capability::CloseEvent),
    row(S::InvestigationInProgress, C::SubmitForFinalClosure, S::PendingFinalClosure, Capability::CloseEvent),
    row(S::PendingHsseValidation, C::SubmitForFinalClosure, S::PendingFinalClosure, Capability::CloseEvent),
    row(S::PendingFinalClosure, C::FinalClose, S::Closed, Capability::ManagerClose),
    // Contractor violations
    row(S::InvestigationInProgress, C::SubmitViolation, S::PendingContractControllerApproval, Capability::RecordInvestigation),
    row(S::PendingContractControllerApproval, C::ApproveViolation, S::InvestigationInProgress, Capability::ApproveViolation),
    row(S::PendingContractControllerApproval, C::ReturnViolation, S::InvestigationInProgress, Capability::ApproveViolation),
];

/// Every legal CorrectiveAction transition
#[rustfmt::skip]
pub static ACTION_TRANSITIONS: &[ActionTransition] = &[
    action_row(A::Assigned, ActionCommand::Start, A::InProgress, Capability::WorkAction),
    action_row(A::ReturnedForCorrection, ActionCommand::Start, A::InProgress, Capability::WorkAction),
    action_row(A::InProgress, ActionCommand::Complete, A::Completed, Capability::WorkAction),
    action_row(A::Completed, ActionCommand::Verify, A::Verified, Capability::VerifyAction),
    action_row(A::Completed, ActionCommand::ReturnForCorrection, A::ReturnedForCorrection, Capability::VerifyAction),
    action_row(A::Verified, ActionCommand::Close, A::Closed, Capability::CloseAction),
];

/// Validates transitions against the tables, the guard and the severity
/// policy
#[derive(Clone, Debug, Default)]
pub struct StateMachine;

impl StateMachine {
    pub fn new() -> Self {
        Self
    }

    pub fn lookup(&self, from: EventStatus, command: EventCommand) -> Option<&'static Transition> {
        TRANSITIONS
            .iter()
            .find(|t| t.from == from && t.command == command)
    }

    pub fn lookup_action(
        &self,
        from: ActionStatus,
        command: ActionCommand,
    ) -> Option<&'static ActionTransition> {
        ACTION_TRANSITIONS
            .iter()
            .find(|t| t.from == from && t.command == command)
    }

    /// Commands with a row out of `status`
    pub fn available_commands(&self, status: EventStatus) -> Vec<EventCommand> {
        TRANSITIONS
            .iter()
            .filter(|t| t.from == status)
            .map(|t| t.command)
            .collect()
    }

    /// Validate `command` against `event` and return the target status
    pub fn apply(
        &self,
        event: &Event,
        command: EventCommand,
        actor: &ActorId,
        guard: &dyn AuthorizationGuard,
    ) -> LifecycleResult<EventStatus> {
        let transition = self.lookup(event.status, command).ok_or_else(|| {
            LifecycleError::invalid_transition(
                event.status.as_str(),
                command.as_str(),
                event.status.is_terminal(),
            )
        })?;

        let context = EventContext::for_event(event);
        if !guard.can_perform(actor, transition.capability, &context) {
            return Err(LifecycleError::permission(actor, transition.capability.as_str()));
        }

        Self::check_policy(event, command)?;
        Ok(transition.to)
    }

    /// Validate `command` against `action` (owned by `event`) and return
    /// the target status
    pub fn apply_action(
        &self,
        action: &CorrectiveAction,
        event: &Event,
        command: ActionCommand,
        actor: &ActorId,
        guard: &dyn AuthorizationGuard,
    ) -> LifecycleResult<ActionStatus> {
        let transition = self.lookup_action(action.status, command).ok_or_else(|| {
            LifecycleError::invalid_transition(
                action.status.as_str(),
                command.as_str(),
                action.status.is_terminal(),
            )
        })?;

        let context = EventContext::for_event(event).with_action_owner(action.owner_id.clone());
        if !guard.can_perform(actor, transition.capability, &context) {
            return Err(LifecycleError::permission(actor, transition.capability.as_str()));
        }
        Ok(transition.to)
    }

    fn check_policy(event: &Event, command: EventCommand) -> LifecycleResult<()> {
        let policy = ClosurePolicy::for_severity(event.severity);
        match command {
            EventCommand::SubmitForValidation if !policy.requires_expert_validation => {
                Err(LifecycleError::invariant(
                    ReasonCode::ValidationNotRequired,
                    format!("severity {} events do not need HSSE validation", event.severity),
                    vec![],
                ))
            }
            EventCommand::AcceptValidation if event.validation_accepted() => {
                Err(LifecycleError::conflict(
                    ReasonCode::RequestAlreadyDecided,
                    "validation has already been accepted",
                ))
            }
            EventCommand::SelfClose if !policy.self_close_allowed => Err(LifecycleError::invariant(
                ReasonCode::SelfCloseNotPermitted,
                format!("severity {} events cannot be self-closed", event.severity),
                vec![],
            )),
            EventCommand::CloseDirect if policy.requires_manager_close => {
                Err(LifecycleError::invariant(
                    ReasonCode::ManagerCloseRequired,
                    format!("severity {} events require final closure by a manager", event.severity),
                    vec![],
                ))
            }
            EventCommand::SubmitForFinalClosure if !policy.requires_manager_close => {
                Err(LifecycleError::invariant(
                    ReasonCode::InvalidTransition,
                    format!("severity {} events are closed directly", event.severity),
                    vec![],
                ))
            }
            EventCommand::CloseDirect
            | EventCommand::SubmitForFinalClosure
            | EventCommand::FinalClose
                if policy.requires_expert_validation && !event.validation_accepted() =>
            {
                Err(LifecycleError::invariant(
                    ReasonCode::ValidationNotAccepted,
                    "HSSE validation has not been accepted",
                    vec!["hsse validation accepted".to_string()],
                ))
            }
            _ => Ok(()),
        }
    }
}
