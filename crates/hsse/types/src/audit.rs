//! Audit log entries
//!
//! One entry is written per successful transition, in the same atomic unit
//! as the status change it documents. Entries are never updated or deleted.
//! Each entry is hash-linked to its predecessor so that tampering with the
//! stored history is detectable.

use crate::{ActorId, AuditEntryId, EventId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of entity whose status an entry documents
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Event,
    CorrectiveAction,
    ExtensionRequest,
    CausalFactor,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Event => "event",
            EntityKind::CorrectiveAction => "corrective_action",
            EntityKind::ExtensionRequest => "extension_request",
            EntityKind::CausalFactor => "causal_factor",
        }
    }
}

/// Audit append payload. Identity, sequencing and hashes are assigned by
/// storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditAppend {
    pub tenant_id: TenantId,
    pub event_id: EventId,
    /// A second Event the entry also documents, e.g. the incident created
    /// by an upgrade
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_event_id: Option<EventId>,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub actor_id: ActorId,
    /// Name of the operation, e.g. `decide_extension`
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Persistent, hash-linked audit record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    /// Store-wide append order, starting at 1
    pub sequence: u64,
    pub tenant_id: TenantId,
    pub event_id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_event_id: Option<EventId>,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub actor_id: ActorId,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    pub hash: String,
}

impl AuditLogEntry {
    /// Seal an append payload into a stored entry.
    pub fn seal(
        append: AuditAppend,
        sequence: u64,
        previous_hash: Option<String>,
    ) -> Result<Self, serde_json::Error> {
        let hash = audit_hash(&append, previous_hash.as_deref(), sequence)?;
        Ok(Self {
            id: AuditEntryId::new(format!("audit-{}", uuid::Uuid::new_v4())),
            sequence,
            tenant_id: append.tenant_id,
            event_id: append.event_id,
            related_event_id: append.related_event_id,
            entity_kind: append.entity_kind,
            entity_id: append.entity_id,
            actor_id: append.actor_id,
            action: append.action,
            old_value: append.old_value,
            new_value: append.new_value,
            notes: append.notes,
            timestamp: append.timestamp,
            previous_hash,
            hash,
        })
    }

    /// The payload this entry was sealed from
    pub fn payload(&self) -> AuditAppend {
        AuditAppend {
            tenant_id: self.tenant_id.clone(),
            event_id: self.event_id.clone(),
            related_event_id: self.related_event_id.clone(),
            entity_kind: self.entity_kind,
            entity_id: self.entity_id.clone(),
            actor_id: self.actor_id.clone(),
            action: self.action.clone(),
            old_value: self.old_value.clone(),
            new_value: self.new_value.clone(),
            notes: self.notes.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Whether this entry belongs to the history of `event_id`
    pub fn concerns(&self, event_id: &EventId) -> bool {
        &self.event_id == event_id || self.related_event_id.as_ref() == Some(event_id)
    }

    /// Recompute this entry's hash and compare with the stored one
    pub fn hash_matches(&self) -> bool {
        audit_hash(&self.payload(), self.previous_hash.as_deref(), self.sequence)
            .map(|h| h == self.hash)
            .unwrap_or(false)
    }
}

/// BLAKE3 over the canonical JSON of an entry and its predecessor's hash
pub fn audit_hash(
    append: &AuditAppend,
    previous_hash: Option<&str>,
    sequence: u64,
) -> Result<String, serde_json::Error> {
    let canonical = serde_json::json!({
        "previous_hash": previous_hash,
        "sequence": sequence,
        "tenant_id": append.tenant_id,
        "event_id": append.event_id,
        "related_event_id": append.related_event_id,
        "entity_kind": append.entity_kind,
        "entity_id": append.entity_id,
        "actor_id": append.actor_id,
        "action": append.action,
        "old_value": append.old_value,
        "new_value": append.new_value,
        "notes": append.notes,
        "timestamp": append.timestamp,
    });
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
