//! Lifecycle script replay
//!
//! A script names a tenant, grants capabilities to actors and then lists
//! steps. Each step runs one orchestrator operation against a fresh
//! in-memory engine. Records created by a step can be bound to an alias
//! with `"as"` and referenced by later steps.
//!
//! ```json
//! {
//!   "tenant": "acme",
//!   "grants": { "reporter": ["submit_event"] },
//!   "steps": [
//!     { "actor": "reporter", "op": "submit_event", "as": "spill",
//!       "event": { "event_type": "observation", "severity": 2, "title": "Spill" } },
//!     { "actor": "reporter", "op": "self_close", "event": "spill",
//!       "expect": "invalid_transition" }
//!   ]
//! }
//! ```

use anyhow::{anyhow, bail, Context, Result};
use chrono::Duration;
use hsse_engine::{
    ApprovalOrchestrator, Capability, ChainVerification, EngineConfig, NewCorrectiveAction,
    StaticAuthorizationGuard,
};
use hsse_types::{
    ActionId, ActorId, Checklist, EscalationOutcome, EventId, ExtensionDecision, ExtensionId,
    FactorId, FactorKind, LifecycleError, NewEvent, ReasonCode, RejectionReviewOutcome,
    RequestContext, ReviewVerdict, TenantId, ViolationDetermination,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct Script {
    pub tenant: String,
    #[serde(default)]
    pub grants: HashMap<String, Vec<Capability>>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    pub actor: String,
    /// Alias for the record this step creates
    #[serde(default, rename = "as")]
    pub bind: Option<String>,
    /// The step must fail with this reason code
    #[serde(default)]
    pub expect: Option<ReasonCode>,
    #[serde(flatten)]
    pub op: Op,
}

fn complete() -> Checklist {
    Checklist::complete()
}

/// One orchestrator operation; `event`, `action`, `factor` and
/// `extension` fields take an alias or a raw id
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    SubmitEvent {
        event: NewEvent,
    },
    ForwardToDepartment {
        event: String,
    },
    StartInvestigation {
        event: String,
        investigator: String,
    },
    RequestEscalation {
        event: String,
        notes: String,
    },
    RejectObservation {
        event: String,
        notes: String,
    },
    DecideEscalationReview {
        event: String,
        outcome: EscalationOutcome,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        investigator: Option<String>,
    },
    DecideRejectionReview {
        event: String,
        outcome: RejectionReviewOutcome,
        notes: String,
    },
    RecordCausalFactor {
        event: String,
        kind: FactorKind,
        description: String,
    },
    SubmitForValidation {
        event: String,
    },
    DecideHsseValidation {
        event: String,
        verdict: ReviewVerdict,
        #[serde(default)]
        notes: Option<String>,
    },
    SubmitViolation {
        event: String,
        contractor: String,
        penalty_amount_minor: i64,
        currency: String,
    },
    DecideContractControllerApproval {
        event: String,
        verdict: ReviewVerdict,
        #[serde(default)]
        notes: Option<String>,
    },
    AssignCorrectiveAction {
        event: String,
        title: String,
        owner: String,
        due_in_days: i64,
        #[serde(default)]
        factor: Option<String>,
    },
    StartAction {
        action: String,
    },
    CompleteAction {
        action: String,
        #[serde(default)]
        notes: Option<String>,
    },
    VerifyAction {
        action: String,
        verdict: ReviewVerdict,
        #[serde(default)]
        notes: Option<String>,
    },
    CloseAction {
        action: String,
    },
    RequestExtension {
        action: String,
        extend_by_days: i64,
        reason: String,
    },
    DecideExtension {
        extension: String,
        decision: ExtensionDecision,
        #[serde(default)]
        notes: Option<String>,
    },
    CanRequestClosure {
        event: String,
        #[serde(default = "complete")]
        checklist: Checklist,
    },
    RequestClosure {
        event: String,
        #[serde(default = "complete")]
        checklist: Checklist,
    },
    SelfClose {
        event: String,
        #[serde(default = "complete")]
        checklist: Checklist,
    },
    FinalClose {
        event: String,
        #[serde(default)]
        notes: Option<String>,
    },
    SoftDeleteEvent {
        event: String,
    },
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::SubmitEvent { .. } => "submit_event",
            Op::ForwardToDepartment { .. } => "forward_to_department",
            Op::StartInvestigation { .. } => "start_investigation",
            Op::RequestEscalation { .. } => "request_escalation",
            Op::RejectObservation { .. } => "reject_observation",
            Op::DecideEscalationReview { .. } => "decide_escalation_review",
            Op::DecideRejectionReview { .. } => "decide_rejection_review",
            Op::RecordCausalFactor { .. } => "record_causal_factor",
            Op::SubmitForValidation { .. } => "submit_for_validation",
            Op::DecideHsseValidation { .. } => "decide_hsse_validation",
            Op::SubmitViolation { .. } => "submit_violation",
            Op::DecideContractControllerApproval { .. } => "decide_contract_controller_approval",
            Op::AssignCorrectiveAction { .. } => "assign_corrective_action",
            Op::StartAction { .. } => "start_action",
            Op::CompleteAction { .. } => "complete_action",
            Op::VerifyAction { .. } => "verify_action",
            Op::CloseAction { .. } => "close_action",
            Op::RequestExtension { .. } => "request_extension",
            Op::DecideExtension { .. } => "decide_extension",
            Op::CanRequestClosure { .. } => "can_request_closure",
            Op::RequestClosure { .. } => "request_closure",
            Op::SelfClose { .. } => "self_close",
            Op::FinalClose { .. } => "final_close",
            Op::SoftDeleteEvent { .. } => "soft_delete_event",
        }
    }
}

/// What one step produced
#[derive(Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub actor: String,
    /// Resulting status, or the reason code of an expected failure
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
    pub chain: ChainVerification,
}

/// Created record: its id for binding, its status and its JSON form
struct Produced {
    id: String,
    status: String,
    record: Value,
}

impl Produced {
    fn new<T: Serialize>(id: impl Into<String>, status: impl Into<String>, record: &T) -> Result<Self> {
        Ok(Self {
            id: id.into(),
            status: status.into(),
            record: serde_json::to_value(record)?,
        })
    }
}

pub struct Replayer {
    engine: ApprovalOrchestrator,
    tenant: TenantId,
    aliases: HashMap<String, String>,
}

impl Replayer {
    pub fn new(script: &Script, config: EngineConfig) -> Self {
        let tenant = TenantId::new(script.tenant.as_str());
        let guard = script
            .grants
            .iter()
            .fold(StaticAuthorizationGuard::new(), |guard, (actor, caps)| {
                guard.with_grant(&tenant, &ActorId::new(actor.as_str()), caps.iter().copied())
            });
        Self {
            engine: ApprovalOrchestrator::in_memory(guard, config),
            tenant,
            aliases: HashMap::new(),
        }
    }

    pub async fn run(mut self, steps: &[Step]) -> Result<ReplayReport> {
        let mut reports = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let ctx = RequestContext::new(self.tenant.clone(), ActorId::new(step.actor.as_str()));
            let result = self.apply(&ctx, &step.op).await?;
            let report = match (result, step.expect) {
                (Ok(produced), None) => {
                    if let Some(alias) = &step.bind {
                        self.aliases.insert(alias.clone(), produced.id.clone());
                    }
                    tracing::info!(index, op = step.op.name(), status = %produced.status, "Step applied");
                    StepReport {
                        index,
                        op: step.op.name(),
                        actor: step.actor.clone(),
                        outcome: produced.status,
                        record: Some(produced.record),
                    }
                }
                (Err(err), Some(expected)) if err.reason_code() == expected => StepReport {
                    index,
                    op: step.op.name(),
                    actor: step.actor.clone(),
                    outcome: expected.as_str().to_string(),
                    record: None,
                },
                (Ok(_), Some(expected)) => {
                    bail!("step {index} ({}) succeeded, expected {expected}", step.op.name())
                }
                (Err(err), _) => {
                    return Err(anyhow!(err).context(format!("step {index} ({}) failed", step.op.name())))
                }
            };
            reports.push(report);
        }

        let chain = self.engine.verify_audit_chain().await?;
        Ok(ReplayReport {
            steps: reports,
            chain,
        })
    }

    fn resolve(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    fn event(&self, name: &str) -> EventId {
        EventId::new(self.resolve(name))
    }

    fn action(&self, name: &str) -> ActionId {
        ActionId::new(self.resolve(name))
    }

    /// Outer error: the step could not be reported. Inner: the engine
    /// refused the operation.
    async fn apply(
        &self,
        ctx: &RequestContext,
        op: &Op,
    ) -> Result<Result<Produced, LifecycleError>> {
        let engine = &self.engine;

        macro_rules! event_step {
            ($call:expr) => {
                match $call.await {
                    Ok(e) => Ok(Produced::new(e.id.as_str(), e.status.as_str(), &e)?),
                    Err(err) => Err(err),
                }
            };
        }
        macro_rules! action_step {
            ($call:expr) => {
                match $call.await {
                    Ok(a) => Ok(Produced::new(a.id.as_str(), a.status.as_str(), &a)?),
                    Err(err) => Err(err),
                }
            };
        }

        let produced = match op {
            Op::SubmitEvent { event } => event_step!(engine.submit_event(ctx, event.clone())),
            Op::ForwardToDepartment { event } => {
                event_step!(engine.forward_to_department(ctx, &self.event(event)))
            }
            Op::StartInvestigation {
                event,
                investigator,
            } => event_step!(engine.start_investigation(
                ctx,
                &self.event(event),
                ActorId::new(investigator.as_str())
            )),
            Op::RequestEscalation { event, notes } => {
                event_step!(engine.request_escalation(ctx, &self.event(event), notes))
            }
            Op::RejectObservation { event, notes } => {
                event_step!(engine.reject_observation(ctx, &self.event(event), notes))
            }
            Op::DecideEscalationReview {
                event,
                outcome,
                notes,
                investigator,
            } => {
                let result = engine
                    .decide_escalation_review(
                        ctx,
                        &self.event(event),
                        *outcome,
                        notes.as_deref(),
                        investigator.as_deref().map(ActorId::new),
                    )
                    .await;
                match result {
                    // Binding an upgrade points the alias at the new incident
                    Ok(review) => {
                        let target = review.upgraded.as_ref().unwrap_or(&review.source);
                        Ok(Produced::new(
                            target.id.as_str(),
                            review.source.status.as_str(),
                            &review.decision,
                        )?)
                    }
                    Err(err) => Err(err),
                }
            }
            Op::DecideRejectionReview {
                event,
                outcome,
                notes,
            } => match engine
                .decide_rejection_review(ctx, &self.event(event), *outcome, notes)
                .await
            {
                Ok(review) => Ok(Produced::new(
                    review.event.id.as_str(),
                    review.event.status.as_str(),
                    &review.decision,
                )?),
                Err(err) => Err(err),
            },
            Op::RecordCausalFactor {
                event,
                kind,
                description,
            } => match engine
                .record_causal_factor(ctx, &self.event(event), *kind, description)
                .await
            {
                Ok(f) => Ok(Produced::new(f.id.as_str(), f.kind.label(), &f)?),
                Err(err) => Err(err),
            },
            Op::SubmitForValidation { event } => {
                event_step!(engine.submit_for_validation(ctx, &self.event(event)))
            }
            Op::DecideHsseValidation {
                event,
                verdict,
                notes,
            } => event_step!(engine.decide_hsse_validation(
                ctx,
                &self.event(event),
                *verdict,
                notes.as_deref()
            )),
            Op::SubmitViolation {
                event,
                contractor,
                penalty_amount_minor,
                currency,
            } => event_step!(engine.submit_violation(
                ctx,
                &self.event(event),
                ViolationDetermination::new(contractor.as_str(), *penalty_amount_minor, currency.as_str())
            )),
            Op::DecideContractControllerApproval {
                event,
                verdict,
                notes,
            } => event_step!(engine.decide_contract_controller_approval(
                ctx,
                &self.event(event),
                *verdict,
                notes.as_deref()
            )),
            Op::AssignCorrectiveAction {
                event,
                title,
                owner,
                due_in_days,
                factor,
            } => {
                let mut new = NewCorrectiveAction::new(
                    title.as_str(),
                    ActorId::new(owner.as_str()),
                    ctx.now + Duration::days(*due_in_days),
                );
                new.factor_id = factor.as_deref().map(|f| FactorId::new(self.resolve(f)));
                action_step!(engine.assign_corrective_action(ctx, &self.event(event), new))
            }
            Op::StartAction { action } => {
                action_step!(engine.start_action(ctx, &self.action(action)))
            }
            Op::CompleteAction { action, notes } => {
                action_step!(engine.complete_action(ctx, &self.action(action), notes.as_deref()))
            }
            Op::VerifyAction {
                action,
                verdict,
                notes,
            } => action_step!(engine.verify_action(
                ctx,
                &self.action(action),
                *verdict,
                notes.as_deref()
            )),
            Op::CloseAction { action } => {
                action_step!(engine.close_action(ctx, &self.action(action)))
            }
            Op::RequestExtension {
                action,
                extend_by_days,
                reason,
            } => {
                let action_id = self.action(action);
                let current = match engine.action(ctx, &action_id).await {
                    Ok(a) => a,
                    Err(err) => return Ok(Err(err)),
                };
                let requested = current.due_date + Duration::days(*extend_by_days);
                action_step!(engine.request_extension(ctx, &action_id, requested, reason))
            }
            Op::DecideExtension {
                extension,
                decision,
                notes,
            } => action_step!(engine.decide_extension(
                ctx,
                &ExtensionId::new(self.resolve(extension)),
                *decision,
                notes.as_deref()
            )),
            Op::CanRequestClosure { event, checklist } => {
                match engine
                    .can_request_closure(ctx, &self.event(event), checklist)
                    .await
                {
                    Ok(assessment) => {
                        let outcome = if assessment.allowed { "allowed" } else { "blocked" };
                        Ok(Produced::new(self.resolve(event), outcome, &assessment)?)
                    }
                    Err(err) => Err(err),
                }
            }
            Op::RequestClosure { event, checklist } => {
                event_step!(engine.request_closure(ctx, &self.event(event), checklist))
            }
            Op::SelfClose { event, checklist } => {
                event_step!(engine.self_close(ctx, &self.event(event), checklist))
            }
            Op::FinalClose { event, notes } => {
                event_step!(engine.final_close(ctx, &self.event(event), notes.as_deref()))
            }
            Op::SoftDeleteEvent { event } => match engine
                .soft_delete_event(ctx, &self.event(event))
                .await
            {
                Ok(e) => Ok(Produced::new(e.id.as_str(), "deleted", &e)?),
                Err(err) => Err(err),
            },
        };
        Ok(produced)
    }
}

/// Parse and run a script
pub async fn replay(source: &str, config: EngineConfig) -> Result<ReplayReport> {
    let script: Script = serde_json::from_str(source).context("invalid replay script")?;
    Replayer::new(&script, config).run(&script.steps).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn script(steps: Value) -> String {
        json!({
            "tenant": "acme",
            "grants": {
                "reporter": ["submit_event"],
                "coordinator": ["route_event", "manage_actions"],
                "hsse": ["validate_event", "verify_action", "close_action", "approve_extension_hsse"]
            },
            "steps": steps
        })
        .to_string()
    }

    #[tokio::test]
    async fn severity_three_incident_runs_to_closure() {
        let source = script(json!([
            { "actor": "reporter", "op": "submit_event", "as": "fall",
              "event": { "event_type": "incident", "severity": 3, "title": "Fall from ladder" } },
            { "actor": "coordinator", "op": "start_investigation", "event": "fall", "investigator": "inv" },
            { "actor": "inv", "op": "record_causal_factor", "as": "rc", "event": "fall",
              "kind": "root_cause", "description": "Ladder not inspected" },
            { "actor": "coordinator", "op": "assign_corrective_action", "as": "fix", "event": "fall",
              "title": "Inspect ladders weekly", "owner": "owner", "due_in_days": 7, "factor": "rc" },
            { "actor": "owner", "op": "request_extension", "as": "ext", "action": "fix",
              "extend_by_days": 7, "reason": "Inspector on leave" },
            { "actor": "hsse", "op": "decide_extension", "extension": "ext", "decision": "approve" },
            { "actor": "owner", "op": "start_action", "action": "fix" },
            { "actor": "owner", "op": "complete_action", "action": "fix" },
            { "actor": "hsse", "op": "verify_action", "action": "fix", "verdict": "approved" },
            { "actor": "inv", "op": "request_closure", "event": "fall", "expect": "validation_not_accepted" },
            { "actor": "inv", "op": "submit_for_validation", "event": "fall" },
            { "actor": "hsse", "op": "decide_hsse_validation", "event": "fall", "verdict": "approved" },
            { "actor": "inv", "op": "request_closure", "event": "fall" }
        ]));

        let report = replay(&source, EngineConfig::default()).await.unwrap();
        assert_eq!(report.steps.len(), 13);
        assert_eq!(report.steps[9].outcome, "validation_not_accepted");
        assert!(report.steps[9].record.is_none());
        assert_eq!(report.steps.last().unwrap().outcome, "closed");
        assert!(report.chain.intact);
        // The expected failure left no audit entry
        assert_eq!(report.chain.entries_checked, 12);
    }

    #[tokio::test]
    async fn unexpected_failure_aborts_with_step_index() {
        let source = script(json!([
            { "actor": "reporter", "op": "submit_event", "as": "spill",
              "event": { "event_type": "observation", "severity": 1, "title": "Spill" } },
            { "actor": "reporter", "op": "forward_to_department", "event": "spill" }
        ]));

        let err = replay(&source, EngineConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("step 1 (forward_to_department)"));
    }

    #[tokio::test]
    async fn expected_failure_that_succeeds_is_an_error() {
        let source = script(json!([
            { "actor": "reporter", "op": "submit_event", "expect": "permission_denied",
              "event": { "event_type": "observation", "severity": 1, "title": "Spill" } }
        ]));

        let err = replay(&source, EngineConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("expected permission_denied"));
    }

    #[test]
    fn unknown_op_is_rejected_at_parse_time() {
        let source = script(json!([{ "actor": "reporter", "op": "teleport" }]));
        assert!(serde_json::from_str::<Script>(&source).is_err());
    }
}
