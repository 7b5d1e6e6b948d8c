//! Audit logger: the single writer of audit entries
//!
//! Every committed transaction carries exactly one audit append, so a
//! status change and the entry documenting it land together or not at
//! all. The log is read back per Event in append order and can be
//! re-verified against its hash chain.

use hsse_storage::{LifecycleStore, QueryWindow, Transaction};
use hsse_types::{
    AuditAppend, AuditLogEntry, EntityKind, EventId, LifecycleResult, RequestContext, TenantId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Builder for one audit append
#[derive(Clone, Debug)]
pub struct AuditRecord(AuditAppend);

impl AuditRecord {
    pub fn new(
        ctx: &RequestContext,
        event_id: &EventId,
        entity_kind: EntityKind,
        entity_id: impl std::fmt::Display,
        action: impl Into<String>,
    ) -> Self {
        Self(AuditAppend {
            tenant_id: ctx.tenant_id.clone(),
            event_id: event_id.clone(),
            related_event_id: None,
            entity_kind,
            entity_id: entity_id.to_string(),
            actor_id: ctx.actor_id.clone(),
            action: action.into(),
            old_value: None,
            new_value: None,
            notes: None,
            timestamp: ctx.now,
        })
    }

    pub fn from_value(mut self, old: impl Into<String>) -> Self {
        self.0.old_value = Some(old.into());
        self
    }

    pub fn to_value(mut self, new: impl Into<String>) -> Self {
        self.0.new_value = Some(new.into());
        self
    }

    pub fn notes(mut self, notes: Option<&str>) -> Self {
        self.0.notes = notes.map(str::to_string);
        self
    }

    pub fn build(self) -> AuditAppend {
        self.0
    }
}

/// Outcome of re-walking the hash chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub entries_checked: usize,
    pub intact: bool,
    /// Sequence of the first entry whose hash or link does not match
    pub first_broken_sequence: Option<u64>,
    pub latest_hash: Option<String>,
}

#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn LifecycleStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn LifecycleStore>) -> Self {
        Self { store }
    }

    /// Commit `tx` and return the entry it appended
    pub async fn append(&self, tx: Transaction) -> LifecycleResult<AuditLogEntry> {
        let entry = self.store.commit(tx).await?;
        tracing::trace!(
            tenant = %entry.tenant_id,
            event_id = %entry.event_id,
            sequence = entry.sequence,
            action = %entry.action,
            "Audit entry appended"
        );
        Ok(entry)
    }

    /// Entries for one Event in append order
    pub async fn history(
        &self,
        tenant: &TenantId,
        event_id: &EventId,
    ) -> LifecycleResult<Vec<AuditLogEntry>> {
        Ok(self.store.history(tenant, event_id).await?)
    }

    /// Re-walk the whole store's chain
    pub async fn verify_chain(&self) -> LifecycleResult<ChainVerification> {
        let entries = self.store.list_audit(QueryWindow::default()).await?;
        Ok(Self::verify_entries(&entries))
    }

    /// Check hashes, links and sequence continuity of `entries`, which
    /// must start at the head of the log
    pub fn verify_entries(entries: &[AuditLogEntry]) -> ChainVerification {
        let mut previous: Option<&AuditLogEntry> = None;
        let mut first_broken_sequence = None;

        for (index, entry) in entries.iter().enumerate() {
            let expected_sequence = index as u64 + 1;
            let linked = entry.previous_hash.as_deref() == previous.map(|p| p.hash.as_str());
            if entry.sequence != expected_sequence || !linked || !entry.hash_matches() {
                first_broken_sequence = Some(entry.sequence);
                break;
            }
            previous = Some(entry);
        }

        if let Some(sequence) = first_broken_sequence {
            tracing::warn!(sequence, "Audit chain broken");
        }

        ChainVerification {
            entries_checked: entries.len(),
            intact: first_broken_sequence.is_none(),
            first_broken_sequence,
            latest_hash: entries.last().map(|e| e.hash.clone()),
        }
    }
}
