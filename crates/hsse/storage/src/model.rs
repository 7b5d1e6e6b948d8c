use hsse_types::{
    ActionId, ActionStatus, AuditAppend, CausalFactor, CorrectiveAction, EscalationDecision, Event,
    EventId, EventStatus, EventType, ExtensionId, ExtensionRequest, ExtensionStatus,
    RejectionReviewDecision, TenantId,
};

/// Generic query window for paged reads. `limit == 0` means unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Filter for event listings
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub status: Option<EventStatus>,
    pub event_type: Option<EventType>,
    /// Soft-deleted events are filtered out unless set
    pub include_deleted: bool,
    pub window: QueryWindow,
}

impl EventQuery {
    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn including_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}

/// Optimistic-concurrency precondition on one stored record.
///
/// The record must currently hold exactly this status and revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusGuard {
    Event {
        id: EventId,
        status: EventStatus,
        revision: u64,
    },
    Action {
        id: ActionId,
        status: ActionStatus,
        revision: u64,
    },
    Extension {
        id: ExtensionId,
        status: ExtensionStatus,
        revision: u64,
    },
}

impl StatusGuard {
    /// Guard on the status and revision the caller observed
    pub fn event(event: &Event) -> Self {
        StatusGuard::Event {
            id: event.id.clone(),
            status: event.status,
            revision: event.revision,
        }
    }

    pub fn action(action: &CorrectiveAction) -> Self {
        StatusGuard::Action {
            id: action.id.clone(),
            status: action.status,
            revision: action.revision,
        }
    }

    pub fn extension(request: &ExtensionRequest) -> Self {
        StatusGuard::Extension {
            id: request.id.clone(),
            status: request.status,
            revision: request.revision,
        }
    }
}

/// A record to insert or overwrite
#[derive(Debug, Clone)]
pub enum Write {
    Event(Event),
    Action(CorrectiveAction),
    Extension(ExtensionRequest),
    Factor(CausalFactor),
    Escalation(EscalationDecision),
    RejectionReview(RejectionReviewDecision),
}

/// One atomic unit of work.
///
/// Overwriting an existing Event, Action or Extension requires a matching
/// [`StatusGuard`] in the same transaction. New records must not already
/// exist. Exactly one audit entry is appended when the commit succeeds.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub tenant_id: TenantId,
    pub guards: Vec<StatusGuard>,
    pub writes: Vec<Write>,
    pub audit: AuditAppend,
}

impl Transaction {
    pub fn new(audit: AuditAppend) -> Self {
        Self {
            tenant_id: audit.tenant_id.clone(),
            guards: Vec::new(),
            writes: Vec::new(),
            audit,
        }
    }

    pub fn guard(mut self, guard: StatusGuard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn write(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }
}
