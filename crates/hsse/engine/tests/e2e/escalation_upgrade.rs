//! End-to-end test: escalation review and the observation upgrade.
//!
//! Verifies that:
//! - a short rejection note is refused, a sufficient one returns the
//!   observation to the department
//! - an upgrade creates a distinct incident and leaves the source terminal
//! - the upgrade's single audit entry appears in both histories

use crate::common::*;
use hsse_engine::Topic;
use hsse_types::*;

async fn escalated(w: &World) -> Event {
    let event = w
        .engine
        .submit_event(&w.ctx(REPORTER), NewEvent::observation(3, "Gas smell near boiler"))
        .await
        .unwrap();
    w.engine
        .forward_to_department(&w.ctx(COORDINATOR), &event.id)
        .await
        .unwrap();
    w.engine
        .request_escalation(&w.ctx(DEPT_REP), &event.id, "Smell reported twice this month")
        .await
        .unwrap()
}

#[tokio::test]
async fn rejection_note_length_is_enforced() {
    let w = world();
    let event = escalated(&w).await;
    let hsse = w.ctx(HSSE);

    let err = w
        .engine
        .decide_escalation_review(&hsse, &event.id, EscalationOutcome::Reject, Some("too short"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");

    let review = w
        .engine
        .decide_escalation_review(&hsse, &event.id, EscalationOutcome::Reject, Some("ten chars!"), None)
        .await
        .unwrap();
    assert_eq!(review.source.status, EventStatus::PendingDeptRepApproval);
}

#[tokio::test]
async fn upgrade_supersedes_the_observation() {
    let w = world();
    let event = escalated(&w).await;
    let hsse = w.ctx(HSSE);

    let review = w
        .engine
        .decide_escalation_review(
            &hsse,
            &event.id,
            EscalationOutcome::UpgradeIncident,
            Some("Confirmed leak at the flange"),
            Some(ActorId::new(INVESTIGATOR)),
        )
        .await
        .unwrap();
    let incident = review.upgraded.expect("upgrade creates an incident");

    assert_ne!(incident.id, event.id);
    assert_ne!(incident.reference_code, event.reference_code);
    assert_eq!(incident.event_type, EventType::Incident);
    assert_eq!(incident.status, EventStatus::InvestigationInProgress);
    assert_eq!(incident.source_event_id.as_ref(), Some(&event.id));

    let source = w.engine.event(&hsse, &event.id).await.unwrap();
    assert_eq!(source.status, EventStatus::Upgraded);
    assert!(source.is_terminal());

    // Terminal: nothing further is accepted on the source
    let err = w
        .engine
        .decide_escalation_review(&hsse, &event.id, EscalationOutcome::Reject, Some("Reconsidered it"), None)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::TerminalState);

    // The new incident runs its own lifecycle
    w.engine
        .record_causal_factor(&w.ctx(INVESTIGATOR), &incident.id, FactorKind::RootCause, "Corroded gasket")
        .await
        .unwrap();

    let topics: Vec<_> = w
        .notifier
        .recorded_topic(Topic::EventUpgraded)
        .await
        .iter()
        .map(|i| i.topic)
        .collect();
    assert!(topics.contains(&Topic::EventUpgraded));
}

#[tokio::test]
async fn upgrade_is_in_both_histories() {
    let w = world();
    let event = escalated(&w).await;
    let hsse = w.ctx(HSSE);

    let incident = w
        .engine
        .decide_escalation_review(
            &hsse,
            &event.id,
            EscalationOutcome::UpgradeIncident,
            Some("Confirmed leak at the flange"),
            Some(ActorId::new(INVESTIGATOR)),
        )
        .await
        .unwrap()
        .upgraded
        .unwrap();
    w.engine
        .record_causal_factor(&w.ctx(INVESTIGATOR), &incident.id, FactorKind::RootCause, "Corroded gasket")
        .await
        .unwrap();

    let source_history = w.engine.history(&hsse, &event.id).await.unwrap();
    let upgrade = source_history.last().unwrap();
    assert_eq!(upgrade.action, "escalation_upgrade");
    assert_eq!(upgrade.related_event_id.as_ref(), Some(&incident.id));

    let incident_history = w.engine.history(&hsse, &incident.id).await.unwrap();
    let actions: Vec<_> = incident_history.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["escalation_upgrade", "record_causal_factor"]);
    assert_eq!(incident_history[0].sequence, upgrade.sequence);

    // Still one entry per call, and the chain covers the link
    let report = w.engine.verify_audit_chain().await.unwrap();
    assert!(report.intact);
    assert_eq!(report.entries_checked, 5);
}

#[tokio::test]
async fn upgrade_without_investigator_changes_nothing() {
    let w = world();
    let event = escalated(&w).await;
    let hsse = w.ctx(HSSE);

    let err = w
        .engine
        .decide_escalation_review(&hsse, &event.id, EscalationOutcome::UpgradeIncident, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::MissingInvestigator);

    let source = w.engine.event(&hsse, &event.id).await.unwrap();
    assert_eq!(source.status, EventStatus::PendingHsseEscalationReview);
    assert!(w
        .engine
        .escalation_decisions(&hsse, &event.id)
        .await
        .unwrap()
        .is_empty());
}
