//! End-to-end test: audit trail and emitted events.
//!
//! Verifies that:
//! - every successful call appends exactly one entry, every failed call none
//! - history is per Event, in append order, and the chain verifies
//! - subscribers see one lifecycle event per successful call

use crate::common::*;
use hsse_types::*;

#[tokio::test]
async fn one_entry_per_successful_call() {
    let w = world();
    let mut rx = w.engine.subscribe();
    let reporter = w.ctx(REPORTER);

    let event = w.investigating(NewEvent::observation(2, "Ladder with cracked rung")).await;
    let failed = w
        .engine
        .self_close(&reporter, &event.id, &Checklist::default())
        .await;
    assert!(failed.is_err());
    w.engine
        .self_close(&reporter, &event.id, &Checklist::complete())
        .await
        .unwrap();

    let history = w.engine.history(&reporter, &event.id).await.unwrap();
    let actions: Vec<_> = history.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["submit_event", "start_investigation", "self_close"]);
    assert!(history.windows(2).all(|p| p[0].sequence < p[1].sequence));

    let last = history.last().unwrap();
    assert_eq!(last.old_value.as_deref(), Some("investigation_in_progress"));
    assert_eq!(last.new_value.as_deref(), Some("closed"));
    assert_eq!(last.actor_id, ActorId::new(REPORTER));

    let mut emitted = Vec::new();
    while let Ok(published) = rx.try_recv() {
        emitted.push(published.action);
    }
    assert_eq!(emitted, actions);
    assert_eq!(w.notifier.recorded(3).await.len(), 3);
}

#[tokio::test]
async fn chain_spans_events_and_verifies() {
    let w = world();
    let first = w.investigating(NewEvent::observation(1, "First")).await;
    let second = w.investigating(NewEvent::incident(3, "Second")).await;
    w.root_cause(&second, "Worn brake pads").await;

    let reporter = w.ctx(REPORTER);
    assert_eq!(w.engine.history(&reporter, &first.id).await.unwrap().len(), 2);
    assert_eq!(w.engine.history(&reporter, &second.id).await.unwrap().len(), 3);

    let report = w.engine.verify_audit_chain().await.unwrap();
    assert!(report.intact);
    assert_eq!(report.entries_checked, 5);
    assert!(report.latest_hash.is_some());
}

#[tokio::test]
async fn other_tenants_history_is_invisible() {
    let w = world();
    let event = w.investigating(NewEvent::observation(1, "Private")).await;
    let foreign = RequestContext::new(TenantId::new("globex"), ActorId::new(REPORTER));
    assert!(w.engine.history(&foreign, &event.id).await.unwrap().is_empty());
    assert_eq!(
        w.engine.event(&foreign, &event.id).await.unwrap_err().reason_code(),
        ReasonCode::NotFound
    );
}
