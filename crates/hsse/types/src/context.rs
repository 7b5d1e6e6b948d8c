//! Explicit per-request context
//!
//! The engine never reads ambient session state. The caller names the
//! tenant, the acting principal and the clock reading for every call.

use crate::{ActorId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub tenant_id: TenantId,
    pub actor_id: ActorId,
    /// Clock reading used for validation and timestamps
    pub now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(tenant_id: TenantId, actor_id: ActorId) -> Self {
        Self {
            tenant_id,
            actor_id,
            now: Utc::now(),
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Same tenant and clock, different actor
    pub fn as_actor(&self, actor_id: ActorId) -> Self {
        Self {
            tenant_id: self.tenant_id.clone(),
            actor_id,
            now: self.now,
        }
    }
}
