//! Contractor violation sub-workflow
//!
//! The investigator proposes a penalty, the contract controller either
//! makes it enforceable or returns it for rework. Both outcomes hand the
//! Event back to the investigation.

use crate::notifier::Topic;
use crate::orchestrator::{require_justification, ApprovalOrchestrator, Notice};
use hsse_types::{
    Event, EventCommand, EventId, EventStatus, LifecycleError, LifecycleResult, ReasonCode,
    RequestContext, ReviewVerdict, ViolationDetermination, ViolationStatus,
};

fn validate_determination(determination: &ViolationDetermination) -> LifecycleResult<()> {
    if determination.contractor.trim().is_empty() {
        return Err(LifecycleError::validation(
            ReasonCode::InvalidInput,
            "contractor must not be empty",
        ));
    }
    if determination.penalty_amount_minor < 0 {
        return Err(LifecycleError::validation(
            ReasonCode::InvalidInput,
            "penalty amount must not be negative",
        ));
    }
    let currency = determination.currency.as_str();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(LifecycleError::validation(
            ReasonCode::InvalidInput,
            format!("'{}' is not an ISO 4217 currency code", currency),
        ));
    }
    Ok(())
}

impl ApprovalOrchestrator {
    /// Propose a contractor violation for contract-controller approval
    pub async fn submit_violation(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        determination: ViolationDetermination,
    ) -> LifecycleResult<Event> {
        validate_determination(&determination)?;
        let event = self.load_event(ctx, event_id).await?;
        if event.violation.as_ref().map(|v| v.is_enforceable()).unwrap_or(false) {
            return Err(LifecycleError::conflict(
                ReasonCode::RequestAlreadyDecided,
                "an enforceable violation is already recorded",
            ));
        }

        let determination = ViolationDetermination {
            status: ViolationStatus::PendingApproval,
            notes: None,
            ..determination
        };
        let summary = format!(
            "{}: {} {}",
            determination.contractor, determination.penalty_amount_minor, determination.currency
        );
        self.transition_event(
            ctx,
            &event,
            EventCommand::SubmitViolation,
            Some(&summary),
            Notice::new(Topic::ViolationSubmitted),
            |next| next.violation = Some(determination),
        )
        .await
    }

    /// Contract controller decision on a proposed violation.
    ///
    /// Approval makes the penalty enforceable. A return needs notes of at
    /// least ten characters.
    pub async fn decide_contract_controller_approval(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        verdict: ReviewVerdict,
        notes: Option<&str>,
    ) -> LifecycleResult<Event> {
        let (command, status) = match verdict {
            ReviewVerdict::Approved => (EventCommand::ApproveViolation, ViolationStatus::Enforceable),
            ReviewVerdict::Rejected => {
                require_justification(ReasonCode::NotesTooShort, "rework notes", notes)?;
                (EventCommand::ReturnViolation, ViolationStatus::ReturnedForRework)
            }
        };
        let event = self.load_event(ctx, event_id).await?;
        let violation = event.violation.clone().map(|mut violation| {
            violation.status = status;
            violation.notes = notes.map(str::to_string);
            violation
        });
        if violation.is_none() && event.status == EventStatus::PendingContractControllerApproval {
            return Err(LifecycleError::invariant(
                ReasonCode::InvalidInput,
                "no violation determination recorded",
                vec!["violation determination".to_string()],
            ));
        }

        let notice = Notice::new(Topic::ViolationDecided).to(event.investigator_id.as_ref());
        self.transition_event(ctx, &event, command, notes, notice, |next| {
            next.violation = violation;
        })
        .await
    }
}
