//! End-to-end test: racing decisions.
//!
//! Concurrent callers acting on the same record get exactly one winner;
//! every loser sees a conflict and nothing is applied twice.

use crate::common::*;
use chrono::Duration;
use hsse_types::*;

const RACERS: usize = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_extension_approvals_have_one_winner() {
    let w = world();
    let event = w.investigating(NewEvent::incident(3, "Blocked escape route")).await;
    let action = w.assign(&event, None).await;
    let owner = w.ctx(OWNER);
    let requested = action.due_date + Duration::days(10);
    let request = w
        .engine
        .request_extension(&owner, &action.id, requested, "Door hardware back-ordered")
        .await
        .unwrap();

    let tasks: Vec<_> = (0..RACERS)
        .map(|_| {
            let engine = w.engine.clone();
            let ctx = w.ctx(HSSE);
            let id = request.id.clone();
            tokio::spawn(async move {
                engine
                    .decide_extension(&ctx, &id, ExtensionDecision::Approve, None)
                    .await
            })
        })
        .collect();

    let mut wins = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => wins += 1,
            Err(err) => assert!(err.is_conflict(), "unexpected error: {err}"),
        }
    }
    assert_eq!(wins, 1);

    let history = w.engine.history(&owner, &event.id).await.unwrap();
    let decisions = history
        .iter()
        .filter(|e| e.action.starts_with("decide_extension"))
        .count();
    assert_eq!(decisions, 1);
    assert_eq!(w.engine.action(&owner, &action.id).await.unwrap().due_date, requested);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_extension_requests_leave_one_open() {
    let w = world();
    let event = w.investigating(NewEvent::incident(3, "Blocked escape route")).await;
    let action = w.assign(&event, None).await;

    let tasks: Vec<_> = (0..RACERS)
        .map(|i| {
            let engine = w.engine.clone();
            let ctx = w.ctx(OWNER);
            let id = action.id.clone();
            tokio::spawn(async move {
                let due = ctx.now + Duration::days(20 + i as i64);
                engine
                    .request_extension(&ctx, &id, due, "Door hardware back-ordered")
                    .await
            })
        })
        .collect();

    let mut opened = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => opened += 1,
            Err(err) => assert!(err.is_conflict(), "unexpected error: {err}"),
        }
    }
    assert_eq!(opened, 1);

    let owner = w.ctx(OWNER);
    let requests = w.engine.extensions_for_action(&owner, &action.id).await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        w.engine.action(&owner, &action.id).await.unwrap().open_extension_id,
        Some(requests[0].id.clone())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_validation_decisions_apply_once() {
    let w = world();
    let event = w.investigating(NewEvent::incident(4, "Crane overload alarm ignored")).await;
    w.engine
        .submit_for_validation(&w.ctx(INVESTIGATOR), &event.id)
        .await
        .unwrap();

    let tasks: Vec<_> = (0..RACERS)
        .map(|_| {
            let engine = w.engine.clone();
            let ctx = w.ctx(HSSE);
            let id = event.id.clone();
            tokio::spawn(async move {
                engine
                    .decide_hsse_validation(&ctx, &id, ReviewVerdict::Approved, None)
                    .await
            })
        })
        .collect();

    let mut wins = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
    assert!(w.engine.verify_audit_chain().await.unwrap().intact);
}
