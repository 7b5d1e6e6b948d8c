//! Rejection review sub-workflow
//!
//! A department's rejection of an observation only takes effect once HSSE
//! confirms it. Overturning it puts the Event back in the department's
//! queue.

use crate::notifier::Topic;
use crate::orchestrator::{require_justification, ApprovalOrchestrator, Notice};
use hsse_storage::Write;
use hsse_types::{
    DecisionId, Event, EventCommand, EventId, LifecycleResult, ReasonCode,
    RejectionReviewDecision, RejectionReviewOutcome, RequestContext,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RejectionReview {
    pub event: Event,
    pub decision: RejectionReviewDecision,
}

impl ApprovalOrchestrator {
    /// Confirm or overturn a department rejection. Notes of at least ten
    /// characters are required either way.
    pub async fn decide_rejection_review(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        outcome: RejectionReviewOutcome,
        notes: &str,
    ) -> LifecycleResult<RejectionReview> {
        require_justification(ReasonCode::NotesTooShort, "review notes", Some(notes))?;
        let event = self.load_event(ctx, event_id).await?;

        let command = match outcome {
            RejectionReviewOutcome::ApproveRejection => EventCommand::ApproveRejection,
            RejectionReviewOutcome::RejectRejection => EventCommand::OverturnRejection,
        };
        let (next, tx) = self.prepare_transition(ctx, &event, command, Some(notes), |_| {})?;

        let decision = RejectionReviewDecision {
            id: DecisionId::generate(),
            tenant_id: ctx.tenant_id.clone(),
            event_id: event.id.clone(),
            decision: outcome,
            decided_by: ctx.actor_id.clone(),
            notes: notes.trim().to_string(),
            decided_at: ctx.now,
        };
        self.commit(
            tx.write(Write::RejectionReview(decision.clone())),
            Notice::new(Topic::RejectionReviewed).to(Some(&event.reporter_id)),
        )
        .await?;

        Ok(RejectionReview {
            event: next,
            decision,
        })
    }
}
