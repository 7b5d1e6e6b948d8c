//! Identifier newtypes

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn short(&self) -> &str {
                &self.0[..8.min(self.0.len())]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Tenant partition key. Every read and write is scoped by it.
    TenantId
);
string_id!(
    /// A human (or service) principal acting on the lifecycle.
    ActorId
);
string_id!(
    /// Safety event (observation or incident) identifier.
    EventId
);
string_id!(
    /// Corrective action identifier.
    ActionId
);
string_id!(
    /// Due-date extension request identifier.
    ExtensionId
);
string_id!(
    /// Escalation or rejection review decision identifier.
    DecisionId
);
string_id!(
    /// Root cause / contributing factor identifier.
    FactorId
);
string_id!(
    /// Audit log entry identifier.
    AuditEntryId
);
