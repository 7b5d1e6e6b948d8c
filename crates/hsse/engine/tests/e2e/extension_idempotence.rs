//! End-to-end test: extension requests.
//!
//! Verifies that:
//! - a second decision on a decided request is a conflict and the due date
//!   moves exactly once
//! - a second open request on the same action is a conflict

use crate::common::*;
use chrono::Duration;
use hsse_engine::{EngineConfig, Topic};
use hsse_types::*;

const REASON: &str = "Scaffold contractor rescheduled";

#[tokio::test]
async fn deciding_twice_moves_the_due_date_once() {
    let w = world();
    let event = w.investigating(NewEvent::incident(3, "Missing guardrail")).await;
    let action = w.assign(&event, None).await;
    let owner = w.ctx(OWNER);
    let requested = action.due_date + Duration::days(21);

    let request = w
        .engine
        .request_extension(&owner, &action.id, requested, REASON)
        .await
        .unwrap();

    let hsse = w.ctx(HSSE);
    w.engine
        .decide_extension(&hsse, &request.id, ExtensionDecision::Approve, Some("Fine"))
        .await
        .unwrap();
    let after_first = w.engine.action(&hsse, &action.id).await.unwrap();
    assert_eq!(after_first.due_date, requested);

    let err = w
        .engine
        .decide_extension(&hsse, &request.id, ExtensionDecision::Approve, None)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.reason_code(), ReasonCode::RequestAlreadyDecided);
    assert_eq!(w.engine.action(&hsse, &action.id).await.unwrap(), after_first);

    let decided = w
        .notifier
        .recorded_topic(Topic::ExtensionDecided)
        .await
        .iter()
        .filter(|i| i.topic == Topic::ExtensionDecided)
        .count();
    assert_eq!(decided, 1);
}

#[tokio::test]
async fn pending_request_blocks_another() {
    let w = world();
    let event = w.investigating(NewEvent::incident(3, "Missing guardrail")).await;
    let action = w.assign(&event, None).await;
    let owner = w.ctx(OWNER);

    w.engine
        .request_extension(&owner, &action.id, owner.now + Duration::days(30), REASON)
        .await
        .unwrap();
    let err = w
        .engine
        .request_extension(&owner, &action.id, owner.now + Duration::days(60), REASON)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        w.engine
            .extensions_for_action(&owner, &action.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn two_level_chain_pending_after_first_step_still_blocks() {
    let w = world_with(EngineConfig::two_level_extensions());
    let event = w.investigating(NewEvent::incident(3, "Missing guardrail")).await;
    let action = w.assign(&event, None).await;
    let owner = w.ctx(OWNER);

    let request = w
        .engine
        .request_extension(&owner, &action.id, owner.now + Duration::days(30), REASON)
        .await
        .unwrap();
    w.engine
        .decide_extension(&w.ctx(LINE_MANAGER), &request.id, ExtensionDecision::Approve, None)
        .await
        .unwrap();

    let err = w
        .engine
        .request_extension(&owner, &action.id, owner.now + Duration::days(60), REASON)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::ExtensionAlreadyOpen);

    let rejected = w
        .engine
        .decide_extension(&w.ctx(HSSE), &request.id, ExtensionDecision::Reject, Some("Not justified"))
        .await
        .unwrap();
    assert_eq!(rejected.status, ExtensionStatus::Rejected);
    assert_eq!(
        w.engine.action(&owner, &action.id).await.unwrap().due_date,
        action.due_date
    );
}
