//! Escalation review sub-workflow
//!
//! HSSE decides on an observation the department escalated. The upgrade
//! outcome is the only operation that creates an aggregate: the new
//! incident, the terminated source and the decision record are committed
//! together with a single audit entry.

use crate::notifier::Topic;
use crate::orchestrator::{require_justification, ApprovalOrchestrator, Notice};
use hsse_storage::Write;
use hsse_types::{
    ActorId, DecisionId, EscalationDecision, EscalationOutcome, Event, EventCommand, EventId,
    EventStatus, EventType, LifecycleError, LifecycleResult, ReasonCode, RequestContext,
};
use serde::{Deserialize, Serialize};

/// Result of an escalation review
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscalationReview {
    /// The reviewed Event after the decision
    pub source: Event,
    pub decision: EscalationDecision,
    /// The incident created by an upgrade
    pub upgraded: Option<Event>,
}

fn command_for(outcome: EscalationOutcome) -> EventCommand {
    match outcome {
        EscalationOutcome::Reject => EventCommand::EscalationReject,
        EscalationOutcome::AcceptObservation => EventCommand::EscalationAcceptObservation,
        EscalationOutcome::UpgradeIncident => EventCommand::EscalationUpgrade,
    }
}

impl ApprovalOrchestrator {
    /// Decide an escalated observation.
    ///
    /// `reject` needs notes of at least ten characters and returns the
    /// Event to the department. `upgrade_incident` needs the investigator
    /// of the new incident.
    pub async fn decide_escalation_review(
        &self,
        ctx: &RequestContext,
        event_id: &EventId,
        outcome: EscalationOutcome,
        notes: Option<&str>,
        investigator: Option<ActorId>,
    ) -> LifecycleResult<EscalationReview> {
        if outcome == EscalationOutcome::Reject {
            require_justification(ReasonCode::NotesTooShort, "rejection notes", notes)?;
        }
        if outcome == EscalationOutcome::UpgradeIncident && investigator.is_none() {
            return Err(LifecycleError::validation(
                ReasonCode::MissingInvestigator,
                "an upgrade needs the investigator of the new incident",
            ));
        }

        let event = self.load_event(ctx, event_id).await?;
        if outcome == EscalationOutcome::UpgradeIncident
            && event.event_type != EventType::Observation
        {
            return Err(LifecycleError::validation(
                ReasonCode::InvalidInput,
                format!("{} is already an incident", event.reference_code),
            ));
        }

        // The source transition is validated before a reference code is
        // allocated for the incident
        let incident_id = (outcome == EscalationOutcome::UpgradeIncident).then(EventId::generate);
        let upgraded_to = incident_id.clone();
        let (source, mut tx) =
            self.prepare_transition(ctx, &event, command_for(outcome), notes, |next| {
                next.upgraded_to = upgraded_to;
            })?;

        let incident = match (incident_id, &investigator) {
            (Some(id), Some(investigator)) => Some(
                self.new_event(ctx, EventType::Incident, event.severity, |incident| {
                    incident.id = id;
                    incident.status = EventStatus::InvestigationInProgress;
                    incident.title = event.title.clone();
                    incident.description = event.description.clone();
                    incident.department = event.department.clone();
                    incident.reporter_id = event.reporter_id.clone();
                    incident.investigator_id = Some(investigator.clone());
                    incident.due_date = event.due_date;
                    incident.source_event_id = Some(event.id.clone());
                })
                .await?,
            ),
            _ => None,
        };

        let decision = EscalationDecision {
            id: DecisionId::generate(),
            tenant_id: ctx.tenant_id.clone(),
            event_id: event.id.clone(),
            decision: outcome,
            decided_by: ctx.actor_id.clone(),
            notes: notes.map(str::to_string),
            resulting_event_id: incident.as_ref().map(|i| i.id.clone()),
            decided_at: ctx.now,
        };

        // One entry documents both records and appears in both histories
        if let Some(incident) = &incident {
            tx.audit.related_event_id = Some(incident.id.clone());
            tx = tx.write(Write::Event(incident.clone()));
        }
        tx = tx.write(Write::Escalation(decision.clone()));

        let topic = match outcome {
            EscalationOutcome::UpgradeIncident => Topic::EventUpgraded,
            _ => Topic::EscalationDecided,
        };
        let notice = Notice::new(topic)
            .to_participants(&event)
            .to(investigator.as_ref());
        self.commit(tx, notice).await?;

        if let Some(incident) = &incident {
            tracing::info!(
                tenant = %ctx.tenant_id,
                event_id = %event.id,
                incident_id = %incident.id,
                reference = %incident.reference_code,
                "Observation upgraded to incident"
            );
        }

        Ok(EscalationReview {
            source,
            decision,
            upgraded: incident,
        })
    }
}
