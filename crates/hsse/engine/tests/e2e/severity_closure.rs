//! End-to-end test: severity-driven closure paths.
//!
//! Verifies that:
//! - severity 1-2 Events are self-closed by the reporter without validation
//! - severity 3-4 Events close only after HSSE accepts the investigation
//! - severity 5 Events additionally need a manager to close them

use crate::common::*;
use hsse_engine::resolve_policy;
use hsse_types::*;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[test]
fn low_severity_allows_self_close_without_validation() {
    for level in [1, 2] {
        let policy = resolve_policy(level).unwrap();
        assert!(policy.self_close_allowed);
        assert!(!policy.requires_expert_validation);
    }
}

#[test]
fn out_of_range_severity_is_a_validation_error() {
    for level in [0, 6] {
        assert_eq!(resolve_policy(level).unwrap_err().kind(), "validation");
    }
}

// ---------------------------------------------------------------------------
// Closure paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn severity_two_reporter_self_closes() {
    let w = world();
    let event = w.investigating(NewEvent::observation(2, "Trailing cable")).await;
    let closed = w
        .engine
        .self_close(&w.ctx(REPORTER), &event.id, &Checklist::complete())
        .await
        .unwrap();
    assert_eq!(closed.status, EventStatus::Closed);
}

#[tokio::test]
async fn severity_three_closes_only_after_validation() {
    let w = world();
    let event = w.investigating(NewEvent::incident(3, "Pressure relief failed")).await;
    let cause = w.root_cause(&event, "Valve not on inspection schedule").await;
    w.remediate(&event, &cause, true).await;

    let investigator = w.ctx(INVESTIGATOR);
    let err = w
        .engine
        .request_closure(&investigator, &event.id, &Checklist::complete())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invariant_violation");
    assert_eq!(err.reason_code(), ReasonCode::ValidationNotAccepted);

    let validated = w.accept_validation(&event).await;
    assert_eq!(validated.hsse_validation_status, HsseValidationStatus::Accepted);

    let closed = w
        .engine
        .request_closure(&investigator, &event.id, &Checklist::complete())
        .await
        .unwrap();
    assert_eq!(closed.status, EventStatus::Closed);
}

#[tokio::test]
async fn severity_four_cannot_bypass_validation_by_self_close() {
    let w = world();
    let event = w.investigating(NewEvent::incident(4, "Arc flash")).await;
    let err = w
        .engine
        .self_close(&w.ctx(REPORTER), &event.id, &Checklist::complete())
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::SelfCloseNotPermitted);
}

#[tokio::test]
async fn severity_five_needs_manager_for_final_close() {
    let w = world();
    let event = w.investigating(NewEvent::incident(5, "Fall from height")).await;
    w.accept_validation(&event).await;

    let investigator = w.ctx(INVESTIGATOR);
    let pending = w
        .engine
        .request_closure(&investigator, &event.id, &Checklist::complete())
        .await
        .unwrap();
    assert_eq!(pending.status, EventStatus::PendingFinalClosure);

    // The investigator lacks the manager capability
    let err = w
        .engine
        .final_close(&investigator, &event.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "permission");
    assert_eq!(err.reason_code(), ReasonCode::PermissionDenied);

    let closed = w
        .engine
        .final_close(&w.ctx(MANAGER), &event.id, Some("Reviewed with the board"))
        .await
        .unwrap();
    assert_eq!(closed.status, EventStatus::Closed);
}

#[tokio::test]
async fn severity_five_without_validation_is_refused() {
    let w = world();
    let event = w.investigating(NewEvent::incident(5, "Fall from height")).await;
    let err = w
        .engine
        .request_closure(&w.ctx(INVESTIGATOR), &event.id, &Checklist::complete())
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::ValidationNotAccepted);
}

#[tokio::test]
async fn closed_event_accepts_no_further_transitions() {
    let w = world();
    let event = w.investigating(NewEvent::observation(1, "Loose handrail")).await;
    w.engine
        .self_close(&w.ctx(REPORTER), &event.id, &Checklist::complete())
        .await
        .unwrap();

    let err = w
        .engine
        .self_close(&w.ctx(REPORTER), &event.id, &Checklist::complete())
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.reason_code(), ReasonCode::TerminalState);
}
