//! HSSE Lifecycle & Approval Orchestration Engine
//!
//! Drives safety events (observations and incidents) from submission to
//! closure. Every status change is validated against a single transition
//! table, the actor's capabilities and the severity policy, and commits
//! atomically with exactly one hash-linked audit entry.
//!
//! # Architecture
//!
//! The [`ApprovalOrchestrator`] composes specialized components:
//!
//! - [`ClosurePolicy`] - Severity 1..=5 mapped to closure rules
//! - [`StateMachine`] - The Event and CorrectiveAction transition tables
//! - [`ClosureGate`] - Checklist and corrective-action coverage
//! - [`AuditLogger`] - Single writer and verifier of the audit chain
//! - [`AuthorizationGuard`] - Capability checks, consumed from outside
//! - [`Notifier`] - Post-commit notification intents, consumed from outside
//!
//! The sub-workflows (escalation review, rejection review, corrective
//! actions, due-date extensions, contractor violations) live in their own
//! modules and extend the orchestrator.
//!
//! # Example
//!
//! ```rust
//! use hsse_engine::{ApprovalOrchestrator, Capability, EngineConfig, StaticAuthorizationGuard};
//! use hsse_types::*;
//!
//! let tenant = TenantId::new("acme");
//! let reporter = ActorId::new("reporter");
//! let guard = StaticAuthorizationGuard::new()
//!     .with_grant(&tenant, &reporter, [Capability::SubmitEvent]);
//! let engine = ApprovalOrchestrator::in_memory(guard, EngineConfig::default());
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let ctx = RequestContext::new(tenant.clone(), reporter.clone());
//!     let event = engine
//!         .submit_event(&ctx, NewEvent::observation(2, "Blocked fire exit"))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(event.status, EventStatus::Submitted);
//!     assert_eq!(engine.history(&ctx, &event.id).await.unwrap().len(), 1);
//! });
//! ```

#![deny(unsafe_code)]

pub mod audit_logger;
pub mod closure_gate;
pub mod config;
pub mod corrective_action;
pub mod escalation;
pub mod extension;
pub mod guard;
pub mod notifier;
pub mod orchestrator;
pub mod policy;
pub mod reference;
pub mod rejection_review;
pub mod state_machine;
pub mod telemetry;
pub mod violation;

// Re-export main types
pub use audit_logger::{AuditLogger, AuditRecord, ChainVerification};
pub use closure_gate::{ClosureAssessment, ClosureGate};
pub use config::{ApprovalChainPolicy, EngineConfig};
pub use corrective_action::NewCorrectiveAction;
pub use escalation::EscalationReview;
pub use guard::{AuthorizationGuard, Capability, EventContext, StaticAuthorizationGuard};
pub use notifier::{
    Channel, LifecycleEvent, NoopNotifier, NotificationIntent, Notifier, NotifyError,
    RecordingNotifier, Topic, TracingNotifier,
};
pub use orchestrator::ApprovalOrchestrator;
pub use policy::{resolve_policy, ClosurePolicy};
pub use reference::ReferenceFormatter;
pub use rejection_review::RejectionReview;
pub use state_machine::StateMachine;
pub use telemetry::init_tracing;
