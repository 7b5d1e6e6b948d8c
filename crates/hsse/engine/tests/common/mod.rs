//! Shared fixtures for the end-to-end suite: one tenant, one actor per
//! role, an in-memory store and a recording notifier.

#![allow(dead_code)]

use chrono::Duration;
use hsse_engine::{
    ApprovalOrchestrator, Capability, EngineConfig, NewCorrectiveAction, RecordingNotifier,
    StaticAuthorizationGuard,
};
use hsse_storage::InMemoryLifecycleStore;
use hsse_types::*;
use std::sync::Arc;

pub const TENANT: &str = "acme";
pub const REPORTER: &str = "reporter";
pub const COORDINATOR: &str = "coordinator";
pub const DEPT_REP: &str = "dept-rep";
pub const HSSE: &str = "hsse-manager";
pub const INVESTIGATOR: &str = "investigator";
pub const MANAGER: &str = "site-manager";
pub const LINE_MANAGER: &str = "line-manager";
pub const OWNER: &str = "action-owner";

pub struct World {
    pub engine: Arc<ApprovalOrchestrator>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn guard() -> StaticAuthorizationGuard {
    let tenant = TenantId::new(TENANT);
    StaticAuthorizationGuard::new()
        .with_grant(&tenant, &ActorId::new(REPORTER), [Capability::SubmitEvent])
        .with_grant(
            &tenant,
            &ActorId::new(COORDINATOR),
            [Capability::RouteEvent, Capability::ManageActions],
        )
        .with_grant(&tenant, &ActorId::new(DEPT_REP), [Capability::ReviewAsDepartment])
        .with_grant(
            &tenant,
            &ActorId::new(HSSE),
            [
                Capability::ReviewEscalation,
                Capability::ReviewRejection,
                Capability::ValidateEvent,
                Capability::VerifyAction,
                Capability::CloseAction,
                Capability::ApproveExtensionHsse,
            ],
        )
        .with_grant(&tenant, &ActorId::new(MANAGER), [Capability::ManagerClose])
        .with_grant(
            &tenant,
            &ActorId::new(LINE_MANAGER),
            [Capability::ApproveExtensionLineManager],
        )
}

pub fn world() -> World {
    world_with(EngineConfig::default())
}

pub fn world_with(config: EngineConfig) -> World {
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = ApprovalOrchestrator::new(
        Arc::new(InMemoryLifecycleStore::new()),
        Arc::new(guard()),
        notifier.clone(),
        config,
    );
    World {
        engine: Arc::new(engine),
        notifier,
    }
}

impl World {
    pub fn ctx(&self, actor: &str) -> RequestContext {
        RequestContext::new(TenantId::new(TENANT), ActorId::new(actor))
    }

    pub async fn investigating(&self, new: NewEvent) -> Event {
        let event = self
            .engine
            .submit_event(&self.ctx(REPORTER), new)
            .await
            .unwrap();
        self.engine
            .start_investigation(&self.ctx(COORDINATOR), &event.id, ActorId::new(INVESTIGATOR))
            .await
            .unwrap()
    }

    pub async fn root_cause(&self, event: &Event, description: &str) -> CausalFactor {
        self.engine
            .record_causal_factor(&self.ctx(INVESTIGATOR), &event.id, FactorKind::RootCause, description)
            .await
            .unwrap()
    }

    pub async fn assign(&self, event: &Event, factor: Option<&CausalFactor>) -> CorrectiveAction {
        let ctx = self.ctx(COORDINATOR);
        let mut new = NewCorrectiveAction::new(
            "Remediate",
            ActorId::new(OWNER),
            ctx.now + Duration::days(14),
        );
        new.factor_id = factor.map(|f| f.id.clone());
        self.engine
            .assign_corrective_action(&ctx, &event.id, new)
            .await
            .unwrap()
    }

    /// Assign, work and verify; `close` also closes the action
    pub async fn remediate(&self, event: &Event, factor: &CausalFactor, close: bool) -> CorrectiveAction {
        let action = self.assign(event, Some(factor)).await;
        let owner = self.ctx(OWNER);
        let hsse = self.ctx(HSSE);
        self.engine.start_action(&owner, &action.id).await.unwrap();
        self.engine.complete_action(&owner, &action.id, None).await.unwrap();
        let verified = self
            .engine
            .verify_action(&hsse, &action.id, ReviewVerdict::Approved, None)
            .await
            .unwrap();
        if close {
            self.engine.close_action(&hsse, &action.id).await.unwrap()
        } else {
            verified
        }
    }

    pub async fn accept_validation(&self, event: &Event) -> Event {
        self.engine
            .submit_for_validation(&self.ctx(INVESTIGATOR), &event.id)
            .await
            .unwrap();
        self.engine
            .decide_hsse_validation(&self.ctx(HSSE), &event.id, ReviewVerdict::Approved, None)
            .await
            .unwrap()
    }
}
