//! Authorization Guard port
//!
//! One interface answers every "may this actor do this?" question the
//! orchestrator asks. Role storage and session management live behind it.

use hsse_types::{ActorId, Event, EventId, Severity, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A guarded lifecycle operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    SubmitEvent,
    /// Forward to a department or assign an investigator
    RouteEvent,
    /// Department representative review (escalate / reject)
    ReviewAsDepartment,
    ReviewEscalation,
    ReviewRejection,
    ValidateEvent,
    RecordInvestigation,
    CloseEvent,
    SelfClose,
    ManagerClose,
    ApproveViolation,
    ManageActions,
    WorkAction,
    VerifyAction,
    CloseAction,
    RequestExtension,
    ApproveExtensionLineManager,
    ApproveExtensionHsse,
    DeleteEvent,
}

impl Capability {
    pub const ALL: [Capability; 19] = [
        Capability::SubmitEvent,
        Capability::RouteEvent,
        Capability::ReviewAsDepartment,
        Capability::ReviewEscalation,
        Capability::ReviewRejection,
        Capability::ValidateEvent,
        Capability::RecordInvestigation,
        Capability::CloseEvent,
        Capability::SelfClose,
        Capability::ManagerClose,
        Capability::ApproveViolation,
        Capability::ManageActions,
        Capability::WorkAction,
        Capability::VerifyAction,
        Capability::CloseAction,
        Capability::RequestExtension,
        Capability::ApproveExtensionLineManager,
        Capability::ApproveExtensionHsse,
        Capability::DeleteEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::SubmitEvent => "submit_event",
            Capability::RouteEvent => "route_event",
            Capability::ReviewAsDepartment => "review_as_department",
            Capability::ReviewEscalation => "review_escalation",
            Capability::ReviewRejection => "review_rejection",
            Capability::ValidateEvent => "validate_event",
            Capability::RecordInvestigation => "record_investigation",
            Capability::CloseEvent => "close_event",
            Capability::SelfClose => "self_close",
            Capability::ManagerClose => "manager_close",
            Capability::ApproveViolation => "approve_violation",
            Capability::ManageActions => "manage_actions",
            Capability::WorkAction => "work_action",
            Capability::VerifyAction => "verify_action",
            Capability::CloseAction => "close_action",
            Capability::RequestExtension => "request_extension",
            Capability::ApproveExtensionLineManager => "approve_extension_line_manager",
            Capability::ApproveExtensionHsse => "approve_extension_hsse",
            Capability::DeleteEvent => "delete_event",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the guard knows about the target of a request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub tenant_id: TenantId,
    pub event_id: Option<EventId>,
    pub reporter_id: Option<ActorId>,
    pub investigator_id: Option<ActorId>,
    pub department: Option<String>,
    pub severity: Option<Severity>,
    /// Owner of the corrective action being acted on, if any
    pub action_owner: Option<ActorId>,
}

impl EventContext {
    /// Context for tenant-level operations with no target Event yet
    pub fn tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            event_id: None,
            reporter_id: None,
            investigator_id: None,
            department: None,
            severity: None,
            action_owner: None,
        }
    }

    pub fn for_event(event: &Event) -> Self {
        Self {
            tenant_id: event.tenant_id.clone(),
            event_id: Some(event.id.clone()),
            reporter_id: Some(event.reporter_id.clone()),
            investigator_id: event.investigator_id.clone(),
            department: event.department.clone(),
            severity: Some(event.severity),
            action_owner: None,
        }
    }

    pub fn with_action_owner(mut self, owner: ActorId) -> Self {
        self.action_owner = Some(owner);
        self
    }
}

/// Authoritative, synchronous permission check
pub trait AuthorizationGuard: Send + Sync {
    fn can_perform(&self, actor: &ActorId, capability: Capability, context: &EventContext) -> bool;
}

/// Grant table keyed by tenant and actor.
///
/// Besides explicit grants, relationships to the target imply a few
/// capabilities:
/// - the reporter may self-close their own Event
/// - the investigator may record findings and close the Event
/// - an action owner may work the action and ask for more time
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizationGuard {
    grants: HashMap<TenantId, HashMap<ActorId, HashSet<Capability>>>,
}

impl StaticAuthorizationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(
        &mut self,
        tenant: &TenantId,
        actor: &ActorId,
        capabilities: impl IntoIterator<Item = Capability>,
    ) {
        self.grants
            .entry(tenant.clone())
            .or_default()
            .entry(actor.clone())
            .or_default()
            .extend(capabilities);
    }

    /// Builder form of [`grant`](Self::grant)
    pub fn with_grant(
        mut self,
        tenant: &TenantId,
        actor: &ActorId,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        self.grant(tenant, actor, capabilities);
        self
    }

    pub fn revoke(&mut self, tenant: &TenantId, actor: &ActorId, capability: Capability) -> bool {
        self.grants
            .get_mut(tenant)
            .and_then(|actors| actors.get_mut(actor))
            .map(|caps| caps.remove(&capability))
            .unwrap_or(false)
    }

    fn explicitly_granted(&self, tenant: &TenantId, actor: &ActorId, capability: Capability) -> bool {
        self.grants
            .get(tenant)
            .and_then(|actors| actors.get(actor))
            .map(|caps| caps.contains(&capability))
            .unwrap_or(false)
    }

    fn implicitly_granted(actor: &ActorId, capability: Capability, context: &EventContext) -> bool {
        let is = |who: &Option<ActorId>| who.as_ref() == Some(actor);
        match capability {
            Capability::SelfClose => is(&context.reporter_id),
            Capability::CloseEvent | Capability::RecordInvestigation => {
                is(&context.investigator_id)
            }
            Capability::WorkAction | Capability::RequestExtension => is(&context.action_owner),
            _ => false,
        }
    }
}

impl AuthorizationGuard for StaticAuthorizationGuard {
    fn can_perform(&self, actor: &ActorId, capability: Capability, context: &EventContext) -> bool {
        let allowed = self.explicitly_granted(&context.tenant_id, actor, capability)
            || Self::implicitly_granted(actor, capability, context);
        tracing::trace!(
            tenant = %context.tenant_id,
            actor = %actor,
            capability = %capability,
            allowed,
            "Authorization evaluated"
        );
        allowed
    }
}
