//! End-to-end test: the closure gate.
//!
//! Verifies that:
//! - an incomplete checklist blocks closure with a validation error
//! - every root cause needs a verified or closed corrective action
//! - readiness checks never change state

use crate::common::*;
use hsse_types::*;

#[tokio::test]
async fn uncovered_root_cause_is_reported() {
    let w = world();
    let event = w.investigating(NewEvent::incident(3, "Forklift struck racking")).await;
    let covered = w.root_cause(&event, "Blind corner without mirror").await;
    let uncovered = w.root_cause(&event, "Operator not refreshed on training").await;
    w.remediate(&event, &covered, false).await;
    w.assign(&event, Some(&uncovered)).await;

    let ctx = w.ctx(INVESTIGATOR);
    let entries_before = w.engine.history(&ctx, &event.id).await.unwrap().len();
    let assessment = w
        .engine
        .can_request_closure(&ctx, &event.id, &Checklist::complete())
        .await
        .unwrap();

    assert!(!assessment.allowed);
    assert_eq!(assessment.missing_items.len(), 1);
    assert!(assessment.missing_items[0].contains("Operator not refreshed on training"));
    assert!(!assessment.missing_items[0].contains("Blind corner"));
    assert_eq!(w.engine.history(&ctx, &event.id).await.unwrap().len(), entries_before);
}

#[tokio::test]
async fn closure_blocked_until_coverage_is_complete() {
    let w = world();
    let event = w.investigating(NewEvent::incident(3, "Forklift struck racking")).await;
    let cause = w.root_cause(&event, "Blind corner without mirror").await;
    let action = w.assign(&event, Some(&cause)).await;
    w.accept_validation(&event).await;

    let ctx = w.ctx(INVESTIGATOR);
    let err = w
        .engine
        .request_closure(&ctx, &event.id, &Checklist::complete())
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::CoverageIncomplete);
    match err {
        LifecycleError::InvariantViolation { missing, .. } => assert_eq!(missing.len(), 1),
        other => panic!("unexpected error: {other:?}"),
    }

    let owner = w.ctx(OWNER);
    w.engine.start_action(&owner, &action.id).await.unwrap();
    w.engine.complete_action(&owner, &action.id, None).await.unwrap();
    w.engine
        .verify_action(&w.ctx(HSSE), &action.id, ReviewVerdict::Approved, None)
        .await
        .unwrap();

    let closed = w
        .engine
        .request_closure(&ctx, &event.id, &Checklist::complete())
        .await
        .unwrap();
    assert_eq!(closed.status, EventStatus::Closed);
}

#[tokio::test]
async fn incomplete_checklist_is_a_validation_error() {
    let w = world();
    let event = w.investigating(NewEvent::observation(2, "Spill kit empty")).await;
    let checklist = Checklist {
        witnesses_interviewed: false,
        ..Checklist::complete()
    };

    let err = w
        .engine
        .self_close(&w.ctx(REPORTER), &event.id, &checklist)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");
    assert_eq!(err.reason_code(), ReasonCode::ChecklistIncomplete);

    let stored = w.engine.event(&w.ctx(REPORTER), &event.id).await.unwrap();
    assert_eq!(stored.status, EventStatus::InvestigationInProgress);
}

#[tokio::test]
async fn severity_three_end_to_end() {
    let w = world();
    let event = w.investigating(NewEvent::incident(3, "Hot work without permit")).await;
    let cause = w.root_cause(&event, "Permit system bypassed under time pressure").await;
    w.remediate(&event, &cause, true).await;

    let ctx = w.ctx(INVESTIGATOR);
    let err = w
        .engine
        .request_closure(&ctx, &event.id, &Checklist::complete())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invariant_violation");

    w.accept_validation(&event).await;
    let closed = w
        .engine
        .request_closure(&ctx, &event.id, &Checklist::complete())
        .await
        .unwrap();
    assert_eq!(closed.status, EventStatus::Closed);
    assert!(closed.closed_at.is_some());
}
