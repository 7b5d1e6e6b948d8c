//! In-memory reference implementation of the lifecycle storage traits.
//!
//! This adapter is deterministic and test-friendly. All tables live behind
//! one lock so a commit is atomic across every record it touches.
//! Production deployments should use a transactional backend.

use crate::model::{EventQuery, QueryWindow, StatusGuard, Transaction, Write};
use crate::traits::{
    ActionStore, AuditStore, DecisionStore, EventStore, ExtensionStore, TransactionalStore,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use hsse_types::{
    ActionId, AuditLogEntry, CausalFactor, CorrectiveAction, EscalationDecision, Event, EventId,
    EventType, ExtensionId, ExtensionRequest, ExtensionStatus, RejectionReviewDecision, TenantId,
};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    event_order: Vec<EventId>,
    actions: HashMap<ActionId, CorrectiveAction>,
    action_order: Vec<ActionId>,
    extensions: HashMap<ExtensionId, ExtensionRequest>,
    extension_order: Vec<ExtensionId>,
    factors: Vec<CausalFactor>,
    escalations: Vec<EscalationDecision>,
    rejection_reviews: Vec<RejectionReviewDecision>,
    audit: Vec<AuditLogEntry>,
    reference_counters: HashMap<(TenantId, EventType, i32), u64>,
}

/// In-memory lifecycle storage adapter.
#[derive(Default)]
pub struct InMemoryLifecycleStore {
    tables: RwLock<Tables>,
}

impl InMemoryLifecycleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StorageError::Backend("lifecycle tables lock poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StorageError::Backend("lifecycle tables lock poisoned".to_string()))
    }
}

impl Tables {
    fn check_guard(&self, tenant: &TenantId, guard: &StatusGuard) -> StorageResult<()> {
        match guard {
            StatusGuard::Event {
                id,
                status,
                revision,
            } => {
                let current = self
                    .events
                    .get(id)
                    .filter(|e| &e.tenant_id == tenant)
                    .ok_or_else(|| StorageError::NotFound(format!("event {}", id)))?;
                if current.status != *status || current.revision != *revision {
                    return Err(StorageError::stale(
                        format!(
                            "event {} expected {} at revision {}, found {} at revision {}",
                            id, status, revision, current.status, current.revision
                        ),
                        current.status,
                    ));
                }
            }
            StatusGuard::Action {
                id,
                status,
                revision,
            } => {
                let current = self
                    .actions
                    .get(id)
                    .filter(|a| &a.tenant_id == tenant)
                    .ok_or_else(|| StorageError::NotFound(format!("corrective action {}", id)))?;
                if current.status != *status || current.revision != *revision {
                    return Err(StorageError::stale(
                        format!(
                            "corrective action {} expected {} at revision {}, found {} at revision {}",
                            id, status, revision, current.status, current.revision
                        ),
                        current.status,
                    ));
                }
            }
            StatusGuard::Extension {
                id,
                status,
                revision,
            } => {
                let current = self
                    .extensions
                    .get(id)
                    .filter(|x| &x.tenant_id == tenant)
                    .ok_or_else(|| StorageError::NotFound(format!("extension request {}", id)))?;
                if current.status != *status || current.revision != *revision {
                    return Err(StorageError::stale(
                        format!(
                            "extension request {} expected {} at revision {}, found {} at revision {}",
                            id, status, revision, current.status, current.revision
                        ),
                        current.status,
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_write(&self, tx: &Transaction, write: &Write) -> StorageResult<()> {
        let guarded_event = |id: &EventId| {
            tx.guards
                .iter()
                .any(|g| matches!(g, StatusGuard::Event { id: gid, .. } if gid == id))
        };
        let guarded_action = |id: &ActionId| {
            tx.guards
                .iter()
                .any(|g| matches!(g, StatusGuard::Action { id: gid, .. } if gid == id))
        };
        let guarded_extension = |id: &ExtensionId| {
            tx.guards
                .iter()
                .any(|g| matches!(g, StatusGuard::Extension { id: gid, .. } if gid == id))
        };

        let (tenant, overwrite_unguarded, duplicate) = match write {
            Write::Event(e) => (
                &e.tenant_id,
                self.events.contains_key(&e.id) && !guarded_event(&e.id),
                false,
            ),
            Write::Action(a) => (
                &a.tenant_id,
                self.actions.contains_key(&a.id) && !guarded_action(&a.id),
                false,
            ),
            Write::Extension(x) => {
                if x.status == ExtensionStatus::Pending {
                    let other_open = self.extensions.values().any(|existing| {
                        existing.id != x.id
                            && existing.action_id == x.action_id
                            && !existing.is_terminal()
                    });
                    if other_open {
                        return Err(StorageError::conflict(format!(
                            "corrective action {} already has an open extension request",
                            x.action_id
                        )));
                    }
                }
                (
                    &x.tenant_id,
                    self.extensions.contains_key(&x.id) && !guarded_extension(&x.id),
                    false,
                )
            }
            Write::Factor(f) => (
                &f.tenant_id,
                false,
                self.factors.iter().any(|existing| existing.id == f.id),
            ),
            Write::Escalation(d) => (
                &d.tenant_id,
                false,
                self.escalations.iter().any(|existing| existing.id == d.id),
            ),
            Write::RejectionReview(d) => (
                &d.tenant_id,
                false,
                self.rejection_reviews
                    .iter()
                    .any(|existing| existing.id == d.id),
            ),
        };

        if tenant != &tx.tenant_id {
            return Err(StorageError::InvalidInput(format!(
                "record for tenant {} in transaction for tenant {}",
                tenant, tx.tenant_id
            )));
        }
        if overwrite_unguarded {
            return Err(StorageError::conflict(
                "overwriting an existing record requires a status guard".to_string(),
            ));
        }
        if duplicate {
            return Err(StorageError::conflict(
                "decision or factor record already exists".to_string(),
            ));
        }
        Ok(())
    }

    fn apply(&mut self, write: Write) {
        match write {
            Write::Event(mut e) => {
                e.revision = self.events.get(&e.id).map_or(1, |old| old.revision + 1);
                if !self.events.contains_key(&e.id) {
                    self.event_order.push(e.id.clone());
                }
                self.events.insert(e.id.clone(), e);
            }
            Write::Action(mut a) => {
                a.revision = self.actions.get(&a.id).map_or(1, |old| old.revision + 1);
                if !self.actions.contains_key(&a.id) {
                    self.action_order.push(a.id.clone());
                }
                self.actions.insert(a.id.clone(), a);
            }
            Write::Extension(mut x) => {
                x.revision = self.extensions.get(&x.id).map_or(1, |old| old.revision + 1);
                if !self.extensions.contains_key(&x.id) {
                    self.extension_order.push(x.id.clone());
                }
                self.extensions.insert(x.id.clone(), x);
            }
            Write::Factor(f) => self.factors.push(f),
            Write::Escalation(d) => self.escalations.push(d),
            Write::RejectionReview(d) => self.rejection_reviews.push(d),
        }
    }
}

#[async_trait]
impl TransactionalStore for InMemoryLifecycleStore {
    async fn commit(&self, tx: Transaction) -> StorageResult<AuditLogEntry> {
        let mut tables = self.write()?;

        if tx.audit.tenant_id != tx.tenant_id {
            return Err(StorageError::InvalidInput(
                "audit entry tenant does not match transaction tenant".to_string(),
            ));
        }
        for guard in &tx.guards {
            tables.check_guard(&tx.tenant_id, guard)?;
        }
        for write in &tx.writes {
            tables.check_write(&tx, write)?;
        }

        let previous_hash = tables.audit.last().map(|e| e.hash.clone());
        let sequence = tables.audit.len() as u64 + 1;
        let entry = AuditLogEntry::seal(tx.audit, sequence, previous_hash)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        for write in tx.writes {
            tables.apply(write);
        }
        tables.audit.push(entry.clone());

        tracing::trace!(
            tenant = %entry.tenant_id,
            sequence = entry.sequence,
            action = %entry.action,
            "Transaction committed"
        );
        Ok(entry)
    }
}

#[async_trait]
impl EventStore for InMemoryLifecycleStore {
    async fn get_event(&self, tenant: &TenantId, id: &EventId) -> StorageResult<Option<Event>> {
        let tables = self.read()?;
        Ok(tables
            .events
            .get(id)
            .filter(|e| &e.tenant_id == tenant)
            .cloned())
    }

    async fn list_events(&self, tenant: &TenantId, query: EventQuery) -> StorageResult<Vec<Event>> {
        let tables = self.read()?;
        let values = tables
            .event_order
            .iter()
            .rev()
            .filter_map(|id| tables.events.get(id))
            .filter(|e| &e.tenant_id == tenant)
            .filter(|e| query.include_deleted || !e.is_deleted())
            .filter(|e| query.status.map_or(true, |s| e.status == s))
            .filter(|e| query.event_type.map_or(true, |t| e.event_type == t))
            .cloned()
            .collect::<Vec<_>>();
        Ok(apply_window(values, query.window))
    }

    async fn list_factors(
        &self,
        tenant: &TenantId,
        event_id: &EventId,
    ) -> StorageResult<Vec<CausalFactor>> {
        let tables = self.read()?;
        Ok(tables
            .factors
            .iter()
            .filter(|f| &f.tenant_id == tenant && &f.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn next_reference_sequence(
        &self,
        tenant: &TenantId,
        event_type: EventType,
        year: i32,
    ) -> StorageResult<u64> {
        let mut tables = self.write()?;
        let counter = tables
            .reference_counters
            .entry((tenant.clone(), event_type, year))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[async_trait]
impl ActionStore for InMemoryLifecycleStore {
    async fn get_action(
        &self,
        tenant: &TenantId,
        id: &ActionId,
    ) -> StorageResult<Option<CorrectiveAction>> {
        let tables = self.read()?;
        Ok(tables
            .actions
            .get(id)
            .filter(|a| &a.tenant_id == tenant)
            .cloned())
    }

    async fn list_actions_for_event(
        &self,
        tenant: &TenantId,
        event_id: &EventId,
    ) -> StorageResult<Vec<CorrectiveAction>> {
        let tables = self.read()?;
        Ok(tables
            .action_order
            .iter()
            .filter_map(|id| tables.actions.get(id))
            .filter(|a| &a.tenant_id == tenant && &a.event_id == event_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ExtensionStore for InMemoryLifecycleStore {
    async fn get_extension(
        &self,
        tenant: &TenantId,
        id: &ExtensionId,
    ) -> StorageResult<Option<ExtensionRequest>> {
        let tables = self.read()?;
        Ok(tables
            .extensions
            .get(id)
            .filter(|x| &x.tenant_id == tenant)
            .cloned())
    }

    async fn open_extension_for_action(
        &self,
        tenant: &TenantId,
        action_id: &ActionId,
    ) -> StorageResult<Option<ExtensionRequest>> {
        let tables = self.read()?;
        Ok(tables
            .extensions
            .values()
            .find(|x| &x.tenant_id == tenant && &x.action_id == action_id && !x.is_terminal())
            .cloned())
    }

    async fn list_extensions_for_action(
        &self,
        tenant: &TenantId,
        action_id: &ActionId,
    ) -> StorageResult<Vec<ExtensionRequest>> {
        let tables = self.read()?;
        Ok(tables
            .extension_order
            .iter()
            .filter_map(|id| tables.extensions.get(id))
            .filter(|x| &x.tenant_id == tenant && &x.action_id == action_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DecisionStore for InMemoryLifecycleStore {
    async fn escalation_decisions_for_event(
        &self,
        tenant: &TenantId,
        event_id: &EventId,
    ) -> StorageResult<Vec<EscalationDecision>> {
        let tables = self.read()?;
        Ok(tables
            .escalations
            .iter()
            .filter(|d| &d.tenant_id == tenant && &d.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn rejection_reviews_for_event(
        &self,
        tenant: &TenantId,
        event_id: &EventId,
    ) -> StorageResult<Vec<RejectionReviewDecision>> {
        let tables = self.read()?;
        Ok(tables
            .rejection_reviews
            .iter()
            .filter(|d| &d.tenant_id == tenant && &d.event_id == event_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditStore for InMemoryLifecycleStore {
    async fn history(
        &self,
        tenant: &TenantId,
        event_id: &EventId,
    ) -> StorageResult<Vec<AuditLogEntry>> {
        let tables = self.read()?;
        Ok(tables
            .audit
            .iter()
            .filter(|e| &e.tenant_id == tenant && e.concerns(event_id))
            .cloned()
            .collect())
    }

    async fn list_audit(&self, window: QueryWindow) -> StorageResult<Vec<AuditLogEntry>> {
        let tables = self.read()?;
        Ok(apply_window(tables.audit.clone(), window))
    }

    async fn latest_audit_hash(&self) -> StorageResult<Option<String>> {
        let tables = self.read()?;
        Ok(tables.audit.last().map(|e| e.hash.clone()))
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}
