//! Notifier port and emitted lifecycle events
//!
//! Notification runs after the commit and never feeds back into it. A
//! failed delivery is logged and dropped; retries belong to the Notifier
//! implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hsse_types::{ActorId, AuditLogEntry, EntityKind, EventId, TenantId};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::watch;

/// Structured record of one committed orchestrator call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub tenant_id: TenantId,
    pub event_id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_event_id: Option<EventId>,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub action: String,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    pub actor_id: ActorId,
    pub notes: Option<String>,
    pub audit_sequence: u64,
    pub occurred_at: DateTime<Utc>,
}

impl From<&AuditLogEntry> for LifecycleEvent {
    fn from(entry: &AuditLogEntry) -> Self {
        Self {
            tenant_id: entry.tenant_id.clone(),
            event_id: entry.event_id.clone(),
            related_event_id: entry.related_event_id.clone(),
            entity_kind: entry.entity_kind,
            entity_id: entry.entity_id.clone(),
            action: entry.action.clone(),
            old_status: entry.old_value.clone(),
            new_status: entry.new_value.clone(),
            actor_id: entry.actor_id.clone(),
            notes: entry.notes.clone(),
            audit_sequence: entry.sequence,
            occurred_at: entry.timestamp,
        }
    }
}

/// Subject of a notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    EventSubmitted,
    EventRouted,
    InvestigationStarted,
    EscalationRequested,
    EscalationDecided,
    EventUpgraded,
    RejectionRequested,
    RejectionReviewed,
    ValidationRequested,
    ValidationDecided,
    FactorRecorded,
    ClosureRequested,
    EventClosed,
    ViolationSubmitted,
    ViolationDecided,
    EventDeleted,
    ActionAssigned,
    ActionUpdated,
    ExtensionRequested,
    ExtensionDecided,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::EventSubmitted => "event_submitted",
            Topic::EventRouted => "event_routed",
            Topic::InvestigationStarted => "investigation_started",
            Topic::EscalationRequested => "escalation_requested",
            Topic::EscalationDecided => "escalation_decided",
            Topic::EventUpgraded => "event_upgraded",
            Topic::RejectionRequested => "rejection_requested",
            Topic::RejectionReviewed => "rejection_reviewed",
            Topic::ValidationRequested => "validation_requested",
            Topic::ValidationDecided => "validation_decided",
            Topic::FactorRecorded => "factor_recorded",
            Topic::ClosureRequested => "closure_requested",
            Topic::EventClosed => "event_closed",
            Topic::ViolationSubmitted => "violation_submitted",
            Topic::ViolationDecided => "violation_decided",
            Topic::EventDeleted => "event_deleted",
            Topic::ActionAssigned => "action_assigned",
            Topic::ActionUpdated => "action_updated",
            Topic::ExtensionRequested => "extension_requested",
            Topic::ExtensionDecided => "extension_decided",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery hint; the Notifier decides what it can honour
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
    Push,
    Whatsapp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub event_id: EventId,
    pub topic: Topic,
    pub recipients: Vec<ActorId>,
    pub channel_hints: Vec<Channel>,
    pub payload: LifecycleEvent,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}

/// Fire-and-forget notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, intent: NotificationIntent) -> Result<(), NotifyError>;
}

/// Logs every intent at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, intent: NotificationIntent) -> Result<(), NotifyError> {
        tracing::info!(
            event_id = %intent.event_id,
            topic = %intent.topic,
            recipients = intent.recipients.len(),
            action = %intent.payload.action,
            "Notification intent"
        );
        Ok(())
    }
}

/// Discards every intent
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _intent: NotificationIntent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Collects intents in memory.
///
/// A failing recorder still records the intent and then reports a delivery
/// error, which lets tests check that failures never leak into committed
/// state. Delivery is detached from the calling operation, so readers that
/// need a given number of intents wait with [`RecordingNotifier::recorded`].
#[derive(Debug)]
pub struct RecordingNotifier {
    intents: Mutex<Vec<NotificationIntent>>,
    count: watch::Sender<usize>,
    fail: bool,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::with_outcome(false)
    }
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self::with_outcome(true)
    }

    fn with_outcome(fail: bool) -> Self {
        let (count, _) = watch::channel(0);
        Self {
            intents: Mutex::new(Vec::new()),
            count,
            fail,
        }
    }

    pub fn intents(&self) -> Vec<NotificationIntent> {
        self.intents
            .lock()
            .map(|intents| intents.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.intents().iter().map(|i| i.topic).collect()
    }

    /// Wait until at least `count` intents have arrived, then return them
    pub async fn recorded(&self, count: usize) -> Vec<NotificationIntent> {
        let mut rx = self.count.subscribe();
        // The sender lives as long as `self`, so this only ends on the count
        let _ = rx.wait_for(|n| *n >= count).await;
        self.intents()
    }

    /// Wait until an intent for `topic` has arrived, then return them all
    pub async fn recorded_topic(&self, topic: Topic) -> Vec<NotificationIntent> {
        let mut rx = self.count.subscribe();
        loop {
            let intents = self.intents();
            if intents.iter().any(|i| i.topic == topic) || rx.changed().await.is_err() {
                return intents;
            }
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, intent: NotificationIntent) -> Result<(), NotifyError> {
        let mut intents = self
            .intents
            .lock()
            .map_err(|_| NotifyError::Unavailable("recorder lock poisoned".to_string()))?;
        intents.push(intent);
        self.count.send_replace(intents.len());
        drop(intents);
        if self.fail {
            return Err(NotifyError::Delivery("simulated outage".to_string()));
        }
        Ok(())
    }
}
