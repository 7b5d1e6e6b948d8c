//! Extension sub-workflow: moving a corrective action's due date
//!
//! A request walks its approval chain one step at a time. The action's due
//! date changes only when the final step approves, and at most one request
//! per action is open at any time. The store enforces the same rule, so a
//! racing second request loses with a conflict.

use crate::audit_logger::AuditRecord;
use crate::guard::{Capability, EventContext};
use crate::notifier::Topic;
use crate::orchestrator::{require_justification, ApprovalOrchestrator, Notice};
use chrono::{DateTime, Utc};
use hsse_storage::{StatusGuard, Transaction, Write};
use hsse_types::{
    ActionId, ApprovalLevel, ApprovalStep, EntityKind, ExtensionDecision, ExtensionId,
    ExtensionRequest, ExtensionStatus, LifecycleError, LifecycleResult, ReasonCode,
    RequestContext,
};

fn capability_for(level: ApprovalLevel) -> Capability {
    match level {
        ApprovalLevel::LineManager => Capability::ApproveExtensionLineManager,
        ApprovalLevel::HsseManager => Capability::ApproveExtensionHsse,
    }
}

impl ApprovalOrchestrator {
    /// Ask for a later due date on a corrective action
    pub async fn request_extension(
        &self,
        ctx: &RequestContext,
        action_id: &ActionId,
        requested_due_date: DateTime<Utc>,
        reason: &str,
    ) -> LifecycleResult<ExtensionRequest> {
        require_justification(ReasonCode::ReasonTooShort, "extension reason", Some(reason))?;
        if requested_due_date <= ctx.now {
            return Err(LifecycleError::validation(
                ReasonCode::DueDateNotInFuture,
                "requested due date must be in the future",
            ));
        }

        let action = self.load_action(ctx, action_id).await?;
        let event = self.load_event(ctx, &action.event_id).await?;
        if action.status.is_terminal() {
            return Err(LifecycleError::invalid_transition(
                action.status.as_str(),
                "request_extension",
                true,
            ));
        }
        let context = EventContext::for_event(&event).with_action_owner(action.owner_id.clone());
        self.authorize(ctx, Capability::RequestExtension, &context)?;

        if let Some(open) = self
            .store
            .open_extension_for_action(&ctx.tenant_id, &action.id)
            .await?
        {
            return Err(LifecycleError::conflict(
                ReasonCode::ExtensionAlreadyOpen,
                format!("extension {} is still pending for action {}", open.id, action.id),
            ));
        }

        let request = ExtensionRequest {
            id: ExtensionId::generate(),
            tenant_id: ctx.tenant_id.clone(),
            event_id: action.event_id.clone(),
            action_id: action.id.clone(),
            requester_id: ctx.actor_id.clone(),
            current_due_date: action.due_date,
            requested_due_date,
            reason: reason.trim().to_string(),
            approval_chain: self
                .config
                .extension
                .approval_chain
                .levels()
                .into_iter()
                .map(ApprovalStep::pending)
                .collect(),
            current_step: 0,
            status: ExtensionStatus::Pending,
            created_at: ctx.now,
            updated_at: ctx.now,
            revision: 1,
        };

        let mut linked = action.clone();
        linked.open_extension_id = Some(request.id.clone());
        linked.updated_at = ctx.now;
        linked.revision = action.revision + 1;

        let audit = AuditRecord::new(
            ctx,
            &action.event_id,
            EntityKind::ExtensionRequest,
            &request.id,
            "request_extension",
        )
        .to_value(request.status.as_str())
        .notes(Some(&request.reason))
        .build();
        let tx = Transaction::new(audit)
            .guard(StatusGuard::action(&action))
            .write(Write::Action(linked))
            .write(Write::Extension(request.clone()));
        self.commit(tx, Notice::new(Topic::ExtensionRequested)).await?;
        Ok(request)
    }

    /// Decide the pending step of an extension request.
    ///
    /// A decision on a request that is already approved or rejected is a
    /// conflict and changes nothing.
    pub async fn decide_extension(
        &self,
        ctx: &RequestContext,
        extension_id: &ExtensionId,
        decision: ExtensionDecision,
        notes: Option<&str>,
    ) -> LifecycleResult<ExtensionRequest> {
        let request = self
            .store
            .get_extension(&ctx.tenant_id, extension_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("extension request", extension_id))?;

        let level = match request.pending_step() {
            Some(step) => step.level,
            None => {
                tracing::warn!(
                    tenant = %ctx.tenant_id,
                    extension_id = %request.id,
                    status = %request.status,
                    actor = %ctx.actor_id,
                    "Decision on a closed extension request"
                );
                return Err(LifecycleError::Conflict {
                    code: ReasonCode::RequestAlreadyDecided,
                    message: format!("extension {} is already {}", request.id, request.status),
                    current_state: Some(request.status.as_str().to_string()),
                    attempted: Some("decide_extension".to_string()),
                });
            }
        };

        let action = self.load_action(ctx, &request.action_id).await?;
        let event = self.load_event(ctx, &request.event_id).await?;
        let context = EventContext::for_event(&event).with_action_owner(action.owner_id.clone());
        self.authorize(ctx, capability_for(level), &context)?;

        // A closed action keeps its due date
        if decision == ExtensionDecision::Approve
            && request.is_final_step()
            && action.status.is_terminal()
        {
            return Err(LifecycleError::invalid_transition(
                action.status.as_str(),
                "decide_extension",
                true,
            ));
        }

        let mut next = request.clone();
        let current = next.current_step;
        let step = &mut next.approval_chain[current];
        step.decided_by = Some(ctx.actor_id.clone());
        step.decision = Some(decision);
        step.notes = notes.map(str::to_string);
        step.decided_at = Some(ctx.now);

        next.status = match decision {
            ExtensionDecision::Reject => ExtensionStatus::Rejected,
            ExtensionDecision::Approve if request.is_final_step() => ExtensionStatus::Approved,
            ExtensionDecision::Approve => {
                next.current_step += 1;
                ExtensionStatus::Pending
            }
        };
        next.updated_at = ctx.now;
        next.revision = request.revision + 1;

        let audit = AuditRecord::new(
            ctx,
            &request.event_id,
            EntityKind::ExtensionRequest,
            &request.id,
            format!("decide_extension:{}", level.as_str()),
        )
        .from_value(request.status.as_str())
        .to_value(next.status.as_str())
        .notes(notes)
        .build();
        let mut tx = Transaction::new(audit)
            .guard(StatusGuard::extension(&request))
            .write(Write::Extension(next.clone()));

        if next.is_terminal() {
            let mut updated = action.clone();
            updated.open_extension_id = None;
            if next.status == ExtensionStatus::Approved {
                updated.due_date = request.requested_due_date;
            }
            updated.updated_at = ctx.now;
            updated.revision = action.revision + 1;
            tx = tx
                .guard(StatusGuard::action(&action))
                .write(Write::Action(updated));
        }

        let notice = Notice::new(Topic::ExtensionDecided)
            .to(Some(&request.requester_id))
            .to(Some(&action.owner_id));
        self.commit(tx, notice).await?;
        Ok(next)
    }

    pub async fn extension(
        &self,
        ctx: &RequestContext,
        extension_id: &ExtensionId,
    ) -> LifecycleResult<ExtensionRequest> {
        self.store
            .get_extension(&ctx.tenant_id, extension_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("extension request", extension_id))
    }

    pub async fn extensions_for_action(
        &self,
        ctx: &RequestContext,
        action_id: &ActionId,
    ) -> LifecycleResult<Vec<ExtensionRequest>> {
        Ok(self
            .store
            .list_extensions_for_action(&ctx.tenant_id, action_id)
            .await?)
    }
}
