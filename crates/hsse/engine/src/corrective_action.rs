//! Corrective action sub-workflow
//!
//! `assigned → in_progress → completed → verified → closed`, with
//! `completed → returned_for_correction → in_progress` as the rework loop.

use crate::audit_logger::AuditRecord;
use crate::guard::{Capability, EventContext};
use crate::notifier::Topic;
use crate::orchestrator::{require_justification, ApprovalOrchestrator, Notice};
use chrono::{DateTime, Utc};
use hsse_storage::{StatusGuard, Transaction, Write};
use hsse_types::{
    ActionCommand, ActionId, ActionStatus, ActorId, CorrectiveAction, EntityKind, EventId,
    FactorId, LifecycleError, LifecycleResult, ReasonCode, RequestContext, ReviewVerdict,
};
use serde::{Deserialize, Serialize};

/// Assignment payload for a new corrective action
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCorrectiveAction {
    pub title: String,
    pub owner_id: ActorId,
    pub due_date: DateTime<Utc>,
    /// Root cause or contributing factor the action remedies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor_id: Option<FactorId>,
}

impl NewCorrectiveAction {
    pub fn new(title: impl Into<String>, owner_id: ActorId, due_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            owner_id,
            due_date,
            factor_id: None,
        }
    }

    pub fn for_factor(mut self, factor_id: FactorId) -> Self {
        self.factor_id = Some(factor_id);
        self
    }
}

impl ApprovalOrchestrator {
    /// Assign a corrective action on an open Event
    pub async fn assign_corrective_action(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        new: NewCorrectiveAction,
    ) -> LifecycleResult<CorrectiveAction> {
        if new.title.trim().is_empty() {
            return Err(LifecycleError::validation(
                ReasonCode::InvalidInput,
                "action title must not be empty",
            ));
        }
        if new.due_date <= ctx.now {
            return Err(LifecycleError::validation(
                ReasonCode::DueDateNotInFuture,
                "due date must be in the future",
            ));
        }

        let event = self.load_event(ctx, event_id).await?;
        if event.is_terminal() {
            return Err(LifecycleError::invalid_transition(
                event.status.as_str(),
                "assign_corrective_action",
                true,
            ));
        }
        self.authorize(ctx, Capability::ManageActions, &EventContext::for_event(&event))?;

        if let Some(factor_id) = &new.factor_id {
            let factors = self.store.list_factors(&ctx.tenant_id, &event.id).await?;
            if !factors.iter().any(|f| &f.id == factor_id) {
                return Err(LifecycleError::not_found("causal factor", factor_id));
            }
        }

        let action = CorrectiveAction {
            id: ActionId::generate(),
            tenant_id: ctx.tenant_id.clone(),
            event_id: event.id.clone(),
            factor_id: new.factor_id,
            title: new.title.trim().to_string(),
            owner_id: new.owner_id,
            status: ActionStatus::Assigned,
            due_date: new.due_date,
            return_count: 0,
            open_extension_id: None,
            created_at: ctx.now,
            updated_at: ctx.now,
            revision: 1,
        };

        let audit = AuditRecord::new(
            ctx,
            &event.id,
            EntityKind::CorrectiveAction,
            &action.id,
            "assign_corrective_action",
        )
        .to_value(action.status.as_str())
        .notes(Some(&action.title))
        .build();
        // The Event guard orders the assignment against a concurrent closure
        let tx = Transaction::new(audit)
            .guard(StatusGuard::event(&event))
            .write(Write::Action(action.clone()));
        self.commit(tx, Notice::new(Topic::ActionAssigned).to(Some(&action.owner_id)))
            .await?;
        Ok(action)
    }

    /// Validate, apply and commit a single CorrectiveAction transition
    async fn transition_action(
        &self,
        ctx: &RequestContext,
        action_id: &ActionId,
        command: ActionCommand,
        notes: Option<&str>,
        mutate: impl FnOnce(&mut CorrectiveAction),
    ) -> LifecycleResult<CorrectiveAction> {
        let action = self.load_action(ctx, action_id).await?;
        let event = self.load_event(ctx, &action.event_id).await?;

        let to = self
            .machine
            .apply_action(&action, &event, command, &ctx.actor_id, self.guard.as_ref())
            .map_err(|err| {
                tracing::warn!(
                    tenant = %ctx.tenant_id,
                    action_id = %action.id,
                    actor = %ctx.actor_id,
                    command = %command,
                    from = %action.status,
                    reason = %err.reason_code(),
                    "Command rejected"
                );
                err
            })?;

        let mut next = action.clone();
        next.status = to;
        next.updated_at = ctx.now;
        mutate(&mut next);
        next.revision = action.revision + 1;

        let audit = AuditRecord::new(
            ctx,
            &action.event_id,
            EntityKind::CorrectiveAction,
            &action.id,
            command.as_str(),
        )
        .from_value(action.status.as_str())
        .to_value(to.as_str())
        .notes(notes)
        .build();
        let tx = Transaction::new(audit)
            .guard(StatusGuard::action(&action))
            .write(Write::Action(next.clone()));

        let notice = Notice::new(Topic::ActionUpdated)
            .to(Some(&action.owner_id))
            .to(event.investigator_id.as_ref());
        self.commit(tx, notice).await?;
        Ok(next)
    }

    /// `assigned | returned_for_correction → in_progress`
    pub async fn start_action(
        &self,
        ctx: &RequestContext,
        action_id: &ActionId,
    ) -> LifecycleResult<CorrectiveAction> {
        self.transition_action(ctx, action_id, ActionCommand::Start, None, |_| {})
            .await
    }

    /// `in_progress → completed`
    pub async fn complete_action(
        &self,
        ctx: &RequestContext,
        action_id: &ActionId,
        notes: Option<&str>,
    ) -> LifecycleResult<CorrectiveAction> {
        self.transition_action(ctx, action_id, ActionCommand::Complete, notes, |_| {})
            .await
    }

    /// Verify completed work, or send it back. A return needs notes of at
    /// least ten characters and counts toward `return_count`.
    pub async fn verify_action(
        &self,
        ctx: &RequestContext,
        action_id: &ActionId,
        verdict: ReviewVerdict,
        notes: Option<&str>,
    ) -> LifecycleResult<CorrectiveAction> {
        match verdict {
            ReviewVerdict::Approved => {
                self.transition_action(ctx, action_id, ActionCommand::Verify, notes, |_| {})
                    .await
            }
            ReviewVerdict::Rejected => {
                require_justification(ReasonCode::NotesTooShort, "return notes", notes)?;
                self.transition_action(
                    ctx,
                    action_id,
                    ActionCommand::ReturnForCorrection,
                    notes,
                    |next| next.return_count += 1,
                )
                .await
            }
        }
    }

    /// `verified → closed`
    pub async fn close_action(
        &self,
        ctx: &RequestContext,
        action_id: &ActionId,
    ) -> LifecycleResult<CorrectiveAction> {
        self.transition_action(ctx, action_id, ActionCommand::Close, None, |_| {})
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::NewCorrectiveAction;
    use crate::test_support::*;
    use chrono::Duration;
    use hsse_types::*;

    #[tokio::test]
    async fn assignment_validates_input() {
        let h = harness();
        let event = h.investigating(NewEvent::incident(3, "Chemical splash")).await;
        let ctx = h.ctx(COORDINATOR);

        let past = NewCorrectiveAction::new("Install eyewash", ActorId::new(OWNER), ctx.now - Duration::days(1));
        let err = h.engine.assign_corrective_action(&ctx, &event.id, past).await.unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::DueDateNotInFuture);

        let unknown = NewCorrectiveAction::new("Install eyewash", ActorId::new(OWNER), ctx.now + Duration::days(7))
            .for_factor(FactorId::new("missing"));
        let err = h.engine.assign_corrective_action(&ctx, &event.id, unknown).await.unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::NotFound);
    }

    #[tokio::test]
    async fn owner_works_and_hsse_verifies() {
        let h = harness();
        let event = h.investigating(NewEvent::incident(3, "Chemical splash")).await;
        let action = h.assign(&event, None).await;
        assert_eq!(action.status, ActionStatus::Assigned);

        let owner = h.ctx(OWNER);
        h.engine.start_action(&owner, &action.id).await.unwrap();
        h.engine.complete_action(&owner, &action.id, Some("eyewash fitted")).await.unwrap();

        let err = h
            .engine
            .verify_action(&owner, &action.id, ReviewVerdict::Approved, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "permission");

        let verified = h
            .engine
            .verify_action(&h.ctx(HSSE), &action.id, ReviewVerdict::Approved, None)
            .await
            .unwrap();
        assert_eq!(verified.status, ActionStatus::Verified);

        let closed = h.engine.close_action(&h.ctx(HSSE), &action.id).await.unwrap();
        assert_eq!(closed.status, ActionStatus::Closed);
    }

    #[tokio::test]
    async fn return_for_correction_counts_each_pass() {
        let h = harness();
        let event = h.investigating(NewEvent::incident(3, "Chemical splash")).await;
        let action = h.assign(&event, None).await;
        let owner = h.ctx(OWNER);
        let hsse = h.ctx(HSSE);

        for round in 1..=2u32 {
            h.engine.start_action(&owner, &action.id).await.unwrap();
            h.engine.complete_action(&owner, &action.id, None).await.unwrap();
            let returned = h
                .engine
                .verify_action(&hsse, &action.id, ReviewVerdict::Rejected, Some("Signage is still missing"))
                .await
                .unwrap();
            assert_eq!(returned.status, ActionStatus::ReturnedForCorrection);
            assert_eq!(returned.return_count, round);
        }
    }

    #[tokio::test]
    async fn return_requires_notes() {
        let h = harness();
        let event = h.investigating(NewEvent::incident(3, "Chemical splash")).await;
        let action = h.assign(&event, None).await;
        let owner = h.ctx(OWNER);
        h.engine.start_action(&owner, &action.id).await.unwrap();
        h.engine.complete_action(&owner, &action.id, None).await.unwrap();

        let err = h
            .engine
            .verify_action(&h.ctx(HSSE), &action.id, ReviewVerdict::Rejected, None)
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::NotesTooShort);
        assert_eq!(h.engine.action(&owner, &action.id).await.unwrap().status, ActionStatus::Completed);
    }

    #[tokio::test]
    async fn closed_action_is_terminal() {
        let h = harness();
        let event = h.investigating(NewEvent::incident(3, "Chemical splash")).await;
        let action = h.closed_action(&event, None).await;
        let err = h.engine.start_action(&h.ctx(OWNER), &action.id).await.unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::TerminalState);
    }

    #[tokio::test]
    async fn stranger_cannot_work_someone_elses_action() {
        let h = harness();
        let event = h.investigating(NewEvent::incident(3, "Chemical splash")).await;
        let action = h.assign(&event, None).await;
        let err = h.engine.start_action(&h.ctx(OUTSIDER), &action.id).await.unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::PermissionDenied);
    }
}
