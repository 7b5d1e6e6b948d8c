use crate::model::{EventQuery, QueryWindow, StatusGuard, Transaction, Write};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use hsse_types::{
    ActionId, AuditAppend, AuditLogEntry, CausalFactor, CorrectiveAction, EscalationDecision,
    Event, EventId, EventStatus, EventType, ExtensionId, ExtensionRequest,
    RejectionReviewDecision, TenantId,
};

/// Read interface for events and their causal factors.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Get one event by id. Soft-deleted events are still returned.
    async fn get_event(&self, tenant: &TenantId, id: &EventId) -> StorageResult<Option<Event>>;

    /// List events newest-first.
    async fn list_events(&self, tenant: &TenantId, query: EventQuery) -> StorageResult<Vec<Event>>;

    /// Root causes and contributing factors recorded for an event, in
    /// recording order.
    async fn list_factors(
        &self,
        tenant: &TenantId,
        event_id: &EventId,
    ) -> StorageResult<Vec<CausalFactor>>;

    /// Allocate the next reference number for a tenant, event type and year.
    async fn next_reference_sequence(
        &self,
        tenant: &TenantId,
        event_type: EventType,
        year: i32,
    ) -> StorageResult<u64>;
}

/// Read interface for corrective actions.
#[async_trait]
pub trait ActionStore: Send + Sync {
    async fn get_action(
        &self,
        tenant: &TenantId,
        id: &ActionId,
    ) -> StorageResult<Option<CorrectiveAction>>;

    /// Actions of an event in creation order.
    async fn list_actions_for_event(
        &self,
        tenant: &TenantId,
        event_id: &EventId,
    ) -> StorageResult<Vec<CorrectiveAction>>;
}

/// Read interface for extension requests.
#[async_trait]
pub trait ExtensionStore: Send + Sync {
    async fn get_extension(
        &self,
        tenant: &TenantId,
        id: &ExtensionId,
    ) -> StorageResult<Option<ExtensionRequest>>;

    /// The non-terminal request for an action, if one exists.
    async fn open_extension_for_action(
        &self,
        tenant: &TenantId,
        action_id: &ActionId,
    ) -> StorageResult<Option<ExtensionRequest>>;

    async fn list_extensions_for_action(
        &self,
        tenant: &TenantId,
        action_id: &ActionId,
    ) -> StorageResult<Vec<ExtensionRequest>>;
}

/// Read interface for review decision records.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn escalation_decisions_for_event(
        &self,
        tenant: &TenantId,
        event_id: &EventId,
    ) -> StorageResult<Vec<EscalationDecision>>;

    async fn rejection_reviews_for_event(
        &self,
        tenant: &TenantId,
        event_id: &EventId,
    ) -> StorageResult<Vec<RejectionReviewDecision>>;
}

/// Read interface for the append-only audit log.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Entries for one event in append order, including entries that
    /// name it as their related event.
    async fn history(&self, tenant: &TenantId, event_id: &EventId)
        -> StorageResult<Vec<AuditLogEntry>>;

    /// Entries across all tenants in append order. Used for chain
    /// verification.
    async fn list_audit(&self, window: QueryWindow) -> StorageResult<Vec<AuditLogEntry>>;

    /// Get the latest audit hash anchor.
    async fn latest_audit_hash(&self) -> StorageResult<Option<String>>;
}

/// The only write path.
#[async_trait]
pub trait TransactionalStore: EventStore + Send + Sync {
    /// Apply a transaction all-or-nothing and return the appended audit
    /// entry. A failed guard yields [`StorageError::Conflict`] and leaves
    /// the store untouched.
    async fn commit(&self, tx: Transaction) -> StorageResult<AuditLogEntry>;

    /// Single-entity form: move an event from `expected` to `new` and record
    /// `audit`, failing with a conflict if the status has moved on.
    async fn compare_and_swap_status(
        &self,
        event_id: &EventId,
        expected: EventStatus,
        new: EventStatus,
        audit: AuditAppend,
    ) -> StorageResult<AuditLogEntry> {
        let mut event = self
            .get_event(&audit.tenant_id, event_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("event {}", event_id)))?;

        if event.status != expected {
            return Err(StorageError::stale(
                format!(
                    "event {} expected status {}, found {}",
                    event_id, expected, event.status
                ),
                event.status,
            ));
        }

        let guard = StatusGuard::event(&event);
        event.status = new;
        event.updated_at = audit.timestamp;

        self.commit(Transaction::new(audit).guard(guard).write(Write::Event(event)))
            .await
    }
}

/// Unified storage bundle consumed by the lifecycle engine.
pub trait LifecycleStore:
    TransactionalStore + EventStore + ActionStore + ExtensionStore + DecisionStore + AuditStore + Send + Sync
{
}

impl<T> LifecycleStore for T where
    T: TransactionalStore
        + EventStore
        + ActionStore
        + ExtensionStore
        + DecisionStore
        + AuditStore
        + Send
        + Sync
{
}
