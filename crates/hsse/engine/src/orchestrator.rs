//! Approval Orchestrator: the entry point of the lifecycle engine
//!
//! Every operation follows the same pipeline:
//! 1. validate the caller's input
//! 2. load the target under the caller's tenant
//! 3. ask the state machine (table, guard, severity policy) for the move
//! 4. check closure preconditions where they apply
//! 5. commit the new records and one audit entry as a single transaction
//! 6. publish a lifecycle event and hand a notification intent to the
//!    Notifier
//!
//! A failure at steps 1-5 leaves no trace. Step 6 never fails the call.
//!
//! The sub-workflows (escalation, rejection review, extensions, corrective
//! actions, violations) extend this type from their own modules.

use crate::audit_logger::{AuditLogger, AuditRecord, ChainVerification};
use crate::closure_gate::{ClosureAssessment, ClosureGate};
use crate::config::EngineConfig;
use crate::guard::{AuthorizationGuard, Capability, EventContext};
use crate::notifier::{LifecycleEvent, NotificationIntent, Notifier, Topic, TracingNotifier};
use crate::policy::ClosurePolicy;
use crate::reference::ReferenceFormatter;
use crate::state_machine::StateMachine;
use chrono::Datelike;
use hsse_storage::{EventQuery, InMemoryLifecycleStore, LifecycleStore, StatusGuard, Transaction, Write};
use hsse_types::*;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Routing for the notification sent after a commit
#[derive(Clone, Debug)]
pub(crate) struct Notice {
    topic: Topic,
    recipients: Vec<ActorId>,
}

impl Notice {
    pub(crate) fn new(topic: Topic) -> Self {
        Self {
            topic,
            recipients: Vec::new(),
        }
    }

    pub(crate) fn to(mut self, actor: Option<&ActorId>) -> Self {
        if let Some(actor) = actor {
            if !self.recipients.contains(actor) {
                self.recipients.push(actor.clone());
            }
        }
        self
    }

    /// Reporter and investigator of `event`
    pub(crate) fn to_participants(self, event: &Event) -> Self {
        self.to(Some(&event.reporter_id))
            .to(event.investigator_id.as_ref())
    }
}

/// Fail with `code` unless `text` is a sufficient justification
pub(crate) fn require_justification(
    code: ReasonCode,
    field: &str,
    text: Option<&str>,
) -> LifecycleResult<()> {
    if text.map(is_sufficient_justification).unwrap_or(false) {
        Ok(())
    } else {
        Err(LifecycleError::validation(
            code,
            format!("{} must be at least {} characters", field, MIN_JUSTIFICATION_LEN),
        ))
    }
}

/// The lifecycle façade: one method per workflow event
pub struct ApprovalOrchestrator {
    pub(crate) store: Arc<dyn LifecycleStore>,
    pub(crate) audit: AuditLogger,
    pub(crate) guard: Arc<dyn AuthorizationGuard>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) machine: StateMachine,
    pub(crate) gate: ClosureGate,
    pub(crate) references: ReferenceFormatter,
    pub(crate) config: EngineConfig,
    events: broadcast::Sender<LifecycleEvent>,
}

impl ApprovalOrchestrator {
    pub fn new(
        store: Arc<dyn LifecycleStore>,
        guard: Arc<dyn AuthorizationGuard>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.notifications.channel_capacity.max(1));
        Self {
            audit: AuditLogger::new(store.clone()),
            store,
            guard,
            notifier,
            machine: StateMachine::new(),
            gate: ClosureGate::new(),
            references: ReferenceFormatter::new(&config.references),
            config,
            events,
        }
    }

    /// Orchestrator over a fresh in-memory store that logs notifications
    pub fn in_memory(guard: impl AuthorizationGuard + 'static, config: EngineConfig) -> Self {
        Self::new(
            Arc::new(InMemoryLifecycleStore::new()),
            Arc::new(guard),
            Arc::new(TracingNotifier),
            config,
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receive one [`LifecycleEvent`] per successful call from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    // ── Pipeline ─────────────────────────────────────────────────────

    pub(crate) async fn load_event(
        &self,
        ctx: &RequestContext,
        id: &EventId,
    ) -> LifecycleResult<Event> {
        match self.store.get_event(&ctx.tenant_id, id).await? {
            Some(event) if !event.is_deleted() => Ok(event),
            _ => Err(LifecycleError::not_found("event", id)),
        }
    }

    pub(crate) async fn load_action(
        &self,
        ctx: &RequestContext,
        id: &ActionId,
    ) -> LifecycleResult<CorrectiveAction> {
        self.store
            .get_action(&ctx.tenant_id, id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("corrective action", id))
    }

    pub(crate) fn authorize(
        &self,
        ctx: &RequestContext,
        capability: Capability,
        context: &EventContext,
    ) -> LifecycleResult<()> {
        if self.guard.can_perform(&ctx.actor_id, capability, context) {
            Ok(())
        } else {
            tracing::warn!(
                tenant = %ctx.tenant_id,
                actor = %ctx.actor_id,
                capability = %capability,
                "Permission denied"
            );
            Err(LifecycleError::permission(&ctx.actor_id, capability.as_str()))
        }
    }

    /// Validate `command` on `event` and build the transaction that applies
    /// it. The caller may add further guards and writes before committing.
    pub(crate) fn prepare_transition(
        &self,
        ctx: &RequestContext,
        event: &Event,
        command: EventCommand,
        notes: Option<&str>,
        mutate: impl FnOnce(&mut Event),
    ) -> LifecycleResult<(Event, Transaction)> {
        let to = self
            .machine
            .apply(event, command, &ctx.actor_id, self.guard.as_ref())
            .map_err(|err| {
                tracing::warn!(
                    tenant = %ctx.tenant_id,
                    event_id = %event.id,
                    actor = %ctx.actor_id,
                    command = %command,
                    from = %event.status,
                    reason = %err.reason_code(),
                    "Command rejected"
                );
                err
            })?;

        let mut next = event.clone();
        next.status = to;
        next.updated_at = ctx.now;
        if to.is_terminal() {
            next.closed_at = Some(ctx.now);
        }
        mutate(&mut next);
        next.revision = event.revision + 1;

        let audit = AuditRecord::new(ctx, &event.id, EntityKind::Event, &event.id, command.as_str())
            .from_value(event.status.as_str())
            .to_value(to.as_str())
            .notes(notes)
            .build();
        let tx = Transaction::new(audit)
            .guard(StatusGuard::event(event))
            .write(Write::Event(next.clone()));
        Ok((next, tx))
    }

    /// Validate, apply and commit a single Event transition
    pub(crate) async fn transition_event(
        &self,
        ctx: &RequestContext,
        event: &Event,
        command: EventCommand,
        notes: Option<&str>,
        notice: Notice,
        mutate: impl FnOnce(&mut Event),
    ) -> LifecycleResult<Event> {
        let (next, tx) = self.prepare_transition(ctx, event, command, notes, mutate)?;
        self.commit(tx, notice).await?;
        Ok(next)
    }

    /// Commit `tx`, then publish. Only the commit can fail the call.
    pub(crate) async fn commit(
        &self,
        tx: Transaction,
        notice: Notice,
    ) -> LifecycleResult<AuditLogEntry> {
        let entry = match self.audit.append(tx).await {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(reason = %err.reason_code(), error = %err, "Commit failed");
                return Err(err);
            }
        };

        tracing::info!(
            tenant = %entry.tenant_id,
            event_id = %entry.event_id,
            entity = %entry.entity_id,
            actor = %entry.actor_id,
            action = %entry.action,
            from = ?entry.old_value,
            to = ?entry.new_value,
            "Transition committed"
        );

        self.publish(&entry, notice);
        Ok(entry)
    }

    fn publish(&self, entry: &AuditLogEntry, notice: Notice) {
        let payload = LifecycleEvent::from(entry);

        // No subscribers is not an error
        let _ = self.events.send(payload.clone());

        if !self.config.notifications.enabled {
            return;
        }

        let intent = NotificationIntent {
            event_id: entry.event_id.clone(),
            topic: notice.topic,
            recipients: notice.recipients,
            channel_hints: self.config.notifications.default_channels.clone(),
            payload,
        };
        // Delivery runs detached so a slow Notifier never holds the caller
        let notifier = Arc::clone(&self.notifier);
        let event_id = entry.event_id.clone();
        let topic = notice.topic;
        tokio::spawn(async move {
            if let Err(err) = notifier.notify(intent).await {
                tracing::warn!(
                    event_id = %event_id,
                    topic = %topic,
                    error = %err,
                    "Notification failed; committed state unaffected"
                );
            }
        });
    }

    // ── Intake and routing ───────────────────────────────────────────

    /// Record a new Event in `submitted` with a fresh reference code
    pub async fn submit_event(&self, ctx: &RequestContext, new: NewEvent) -> LifecycleResult<Event> {
        let severity = Severity::new(new.severity)?;
        if new.title.trim().is_empty() {
            return Err(LifecycleError::validation(
                ReasonCode::InvalidInput,
                "title must not be empty",
            ));
        }
        if let Some(due) = new.due_date {
            if due <= ctx.now {
                return Err(LifecycleError::validation(
                    ReasonCode::DueDateNotInFuture,
                    "due date must be in the future",
                ));
            }
        }
        self.authorize(ctx, Capability::SubmitEvent, &EventContext::tenant(ctx.tenant_id.clone()))?;

        let event = self
            .new_event(ctx, new.event_type, severity, |event| {
                event.title = new.title;
                event.description = new.description;
                event.department = new.department;
                event.due_date = new.due_date;
            })
            .await?;

        let audit = AuditRecord::new(ctx, &event.id, EntityKind::Event, &event.id, "submit_event")
            .to_value(event.status.as_str())
            .build();
        self.commit(
            Transaction::new(audit).write(Write::Event(event.clone())),
            Notice::new(Topic::EventSubmitted).to(Some(&event.reporter_id)),
        )
        .await?;
        Ok(event)
    }

    /// Build (but do not store) a new Event with an allocated reference
    /// code. The acting principal becomes its reporter.
    pub(crate) async fn new_event(
        &self,
        ctx: &RequestContext,
        event_type: EventType,
        severity: Severity,
        fill: impl FnOnce(&mut Event),
    ) -> LifecycleResult<Event> {
        let sequence = self
            .store
            .next_reference_sequence(&ctx.tenant_id, event_type, ctx.now.year())
            .await?;
        let policy = ClosurePolicy::for_severity(severity);

        let mut event = Event {
            id: EventId::generate(),
            tenant_id: ctx.tenant_id.clone(),
            reference_code: self.references.format(event_type, ctx.now.year(), sequence),
            event_type,
            severity,
            status: EventStatus::Submitted,
            title: String::new(),
            description: String::new(),
            department: None,
            reporter_id: ctx.actor_id.clone(),
            investigator_id: None,
            due_date: None,
            closure_requires_manager_close: policy.requires_manager_close,
            hsse_validation_status: HsseValidationStatus::None,
            source_event_id: None,
            upgraded_to: None,
            violation: None,
            created_at: ctx.now,
            updated_at: ctx.now,
            closed_at: None,
            deleted_at: None,
            revision: 1,
        };
        fill(&mut event);
        Ok(event)
    }

    /// `submitted → pending_dept_rep_approval`
    pub async fn forward_to_department(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
    ) -> LifecycleResult<Event> {
        let event = self.load_event(ctx, event_id).await?;
        self.transition_event(
            ctx,
            &event,
            EventCommand::ForwardToDepartment,
            None,
            Notice::new(Topic::EventRouted).to(Some(&event.reporter_id)),
            |_| {},
        )
        .await
    }

    /// Assign an investigator and open the investigation
    pub async fn start_investigation(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        investigator: ActorId,
    ) -> LifecycleResult<Event> {
        let event = self.load_event(ctx, event_id).await?;
        let notice = Notice::new(Topic::InvestigationStarted)
            .to(Some(&event.reporter_id))
            .to(Some(&investigator));
        self.transition_event(
            ctx,
            &event,
            EventCommand::StartInvestigation,
            None,
            notice,
            |next| next.investigator_id = Some(investigator),
        )
        .await
    }

    /// Department asks HSSE to review the observation
    pub async fn request_escalation(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        notes: &str,
    ) -> LifecycleResult<Event> {
        require_justification(ReasonCode::NotesTooShort, "escalation notes", Some(notes))?;
        let event = self.load_event(ctx, event_id).await?;
        self.transition_event(
            ctx,
            &event,
            EventCommand::RequestEscalation,
            Some(notes),
            Notice::new(Topic::EscalationRequested),
            |_| {},
        )
        .await
    }

    /// Department rejects the observation, pending an HSSE second opinion
    pub async fn reject_observation(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        notes: &str,
    ) -> LifecycleResult<Event> {
        require_justification(ReasonCode::NotesTooShort, "rejection notes", Some(notes))?;
        let event = self.load_event(ctx, event_id).await?;
        self.transition_event(
            ctx,
            &event,
            EventCommand::RejectObservation,
            Some(notes),
            Notice::new(Topic::RejectionRequested).to(Some(&event.reporter_id)),
            |_| {},
        )
        .await
    }

    // ── Investigation and validation ─────────────────────────────────

    /// Record a root cause or contributing factor on an Event under
    /// investigation
    pub async fn record_causal_factor(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        kind: FactorKind,
        description: &str,
    ) -> LifecycleResult<CausalFactor> {
        if description.trim().is_empty() {
            return Err(LifecycleError::validation(
                ReasonCode::InvalidInput,
                "factor description must not be empty",
            ));
        }
        let event = self.load_event(ctx, event_id).await?;
        if event.status != EventStatus::InvestigationInProgress {
            return Err(LifecycleError::invalid_transition(
                event.status.as_str(),
                "record_causal_factor",
                event.is_terminal(),
            ));
        }
        self.authorize(ctx, Capability::RecordInvestigation, &EventContext::for_event(&event))?;

        let factor = CausalFactor {
            id: FactorId::generate(),
            tenant_id: ctx.tenant_id.clone(),
            event_id: event.id.clone(),
            kind,
            description: description.trim().to_string(),
            recorded_by: ctx.actor_id.clone(),
            recorded_at: ctx.now,
        };
        let audit = AuditRecord::new(
            ctx,
            &event.id,
            EntityKind::CausalFactor,
            &factor.id,
            "record_causal_factor",
        )
        .to_value(kind.label())
        .notes(Some(&factor.description))
        .build();
        self.commit(
            Transaction::new(audit)
                .guard(StatusGuard::event(&event))
                .write(Write::Factor(factor.clone())),
            Notice::new(Topic::FactorRecorded),
        )
        .await?;
        Ok(factor)
    }

    /// Hand the investigation to HSSE for expert validation
    pub async fn submit_for_validation(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
    ) -> LifecycleResult<Event> {
        let event = self.load_event(ctx, event_id).await?;
        self.transition_event(
            ctx,
            &event,
            EventCommand::SubmitForValidation,
            None,
            Notice::new(Topic::ValidationRequested),
            |_| {},
        )
        .await
    }

    /// HSSE accepts the investigation, or sends it back with feedback
    pub async fn decide_hsse_validation(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        verdict: ReviewVerdict,
        notes: Option<&str>,
    ) -> LifecycleResult<Event> {
        let (command, outcome) = match verdict {
            ReviewVerdict::Approved => (EventCommand::AcceptValidation, HsseValidationStatus::Accepted),
            ReviewVerdict::Rejected => {
                require_justification(ReasonCode::NotesTooShort, "validation feedback", notes)?;
                (EventCommand::RejectValidation, HsseValidationStatus::Rejected)
            }
        };
        let event = self.load_event(ctx, event_id).await?;
        let notice = Notice::new(Topic::ValidationDecided).to_participants(&event);
        self.transition_event(ctx, &event, command, notes, notice, |next| {
            next.hsse_validation_status = outcome;
        })
        .await
    }

    // ── Closure ──────────────────────────────────────────────────────

    /// Check closure readiness without changing anything
    pub async fn can_request_closure(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        checklist: &Checklist,
    ) -> LifecycleResult<ClosureAssessment> {
        let event = self.load_event(ctx, event_id).await?;
        let (factors, actions) = self.closure_inputs(ctx, &event.id).await?;
        let assessment = self.gate.assess(checklist, &factors, &actions);
        tracing::debug!(
            event_id = %event.id,
            allowed = assessment.allowed,
            missing = assessment.missing_items.len(),
            "Closure gate evaluated"
        );
        Ok(assessment)
    }

    async fn closure_inputs(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
    ) -> LifecycleResult<(Vec<CausalFactor>, Vec<CorrectiveAction>)> {
        let factors = self.store.list_factors(&ctx.tenant_id, event_id).await?;
        let actions = self
            .store
            .list_actions_for_event(&ctx.tenant_id, event_id)
            .await?;
        Ok((factors, actions))
    }

    /// Validate `command`, then the closure gate, then commit
    async fn close_through_gate(
        &self,
        ctx: &RequestContext,
        event: &Event,
        command: EventCommand,
        checklist: &Checklist,
        notes: Option<&str>,
        topic: Topic,
    ) -> LifecycleResult<Event> {
        let (next, tx) = self.prepare_transition(ctx, event, command, notes, |_| {})?;
        let (factors, actions) = self.closure_inputs(ctx, &event.id).await?;
        self.gate.enforce(checklist, &factors, &actions)?;
        self.commit(tx, Notice::new(topic).to_participants(event))
            .await?;
        Ok(next)
    }

    /// Investigator-driven closure.
    ///
    /// Severity 5 Events move to `pending_final_closure`; everything else
    /// closes immediately once the severity policy is satisfied.
    pub async fn request_closure(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        checklist: &Checklist,
    ) -> LifecycleResult<Event> {
        let event = self.load_event(ctx, event_id).await?;
        let command = ClosurePolicy::for_severity(event.severity).closure_command();
        let topic = match command {
            EventCommand::SubmitForFinalClosure => Topic::ClosureRequested,
            _ => Topic::EventClosed,
        };
        self.close_through_gate(ctx, &event, command, checklist, None, topic)
            .await
    }

    /// Reporter closes their own low-severity Event
    pub async fn self_close(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        checklist: &Checklist,
    ) -> LifecycleResult<Event> {
        let event = self.load_event(ctx, event_id).await?;
        self.close_through_gate(
            ctx,
            &event,
            EventCommand::SelfClose,
            checklist,
            None,
            Topic::EventClosed,
        )
        .await
    }

    /// Manager closes an Event waiting in `pending_final_closure`
    pub async fn final_close(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        notes: Option<&str>,
    ) -> LifecycleResult<Event> {
        let event = self.load_event(ctx, event_id).await?;
        let notice = Notice::new(Topic::EventClosed).to_participants(&event);
        self.transition_event(ctx, &event, EventCommand::FinalClose, notes, notice, |_| {})
            .await
    }

    /// Hide an Event from listings. Status is left as it was and the Event
    /// stays readable by id.
    pub async fn soft_delete_event(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
    ) -> LifecycleResult<Event> {
        let event = self.load_event(ctx, event_id).await?;
        self.authorize(ctx, Capability::DeleteEvent, &EventContext::for_event(&event))?;

        let mut next = event.clone();
        next.deleted_at = Some(ctx.now);
        next.updated_at = ctx.now;
        next.revision = event.revision + 1;

        let audit = AuditRecord::new(ctx, &event.id, EntityKind::Event, &event.id, "soft_delete_event")
            .from_value(event.status.as_str())
            .to_value("deleted")
            .build();
        self.commit(
            Transaction::new(audit)
                .guard(StatusGuard::event(&event))
                .write(Write::Event(next.clone())),
            Notice::new(Topic::EventDeleted).to(Some(&event.reporter_id)),
        )
        .await?;
        Ok(next)
    }

    // ── Read side ────────────────────────────────────────────────────

    /// Get an Event by id, including soft-deleted ones
    pub async fn event(&self, ctx: &RequestContext, event_id: &EventId) -> LifecycleResult<Event> {
        self.store
            .get_event(&ctx.tenant_id, event_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("event", event_id))
    }

    pub async fn events(&self, ctx: &RequestContext, query: EventQuery) -> LifecycleResult<Vec<Event>> {
        Ok(self.store.list_events(&ctx.tenant_id, query).await?)
    }

    pub async fn factors(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
    ) -> LifecycleResult<Vec<CausalFactor>> {
        Ok(self.store.list_factors(&ctx.tenant_id, event_id).await?)
    }

    pub async fn actions_for_event(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
    ) -> LifecycleResult<Vec<CorrectiveAction>> {
        Ok(self
            .store
            .list_actions_for_event(&ctx.tenant_id, event_id)
            .await?)
    }

    pub async fn action(
        &self,
        ctx: &RequestContext,
        action_id: &ActionId,
    ) -> LifecycleResult<CorrectiveAction> {
        self.load_action(ctx, action_id).await
    }

    pub async fn escalation_decisions(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
    ) -> LifecycleResult<Vec<EscalationDecision>> {
        Ok(self
            .store
            .escalation_decisions_for_event(&ctx.tenant_id, event_id)
            .await?)
    }

    pub async fn rejection_reviews(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
    ) -> LifecycleResult<Vec<RejectionReviewDecision>> {
        Ok(self
            .store
            .rejection_reviews_for_event(&ctx.tenant_id, event_id)
            .await?)
    }

    /// Audit entries for one Event in append order
    pub async fn history(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
    ) -> LifecycleResult<Vec<AuditLogEntry>> {
        self.audit.history(&ctx.tenant_id, event_id).await
    }

    pub async fn verify_audit_chain(&self) -> LifecycleResult<ChainVerification> {
        self.audit.verify_chain().await
    }
}
