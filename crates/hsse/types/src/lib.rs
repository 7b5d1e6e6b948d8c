//! HSSE Lifecycle Domain Types
//!
//! A safety event (an *observation* or an *incident*) moves from submission
//! through investigation, corrective-action tracking, multi-party approval
//! and closure. This crate holds the vocabulary shared by the storage
//! contract and the lifecycle engine.
//!
//! # Key Concepts
//!
//! - **Event**: the aggregate root. Every other record is owned by one Event.
//! - **CorrectiveAction**: remedial work tied to an Event, usually to a
//!   specific root cause or contributing factor.
//! - **ExtensionRequest**: a request to move an action's due date.
//! - **EscalationDecision** / **RejectionReviewDecision**: outcomes of the
//!   HSSE review sub-workflows.
//! - **AuditLogEntry**: append-only, hash-linked record of one transition.
//!
//! Statuses are closed enums. Legal moves between them are declared once,
//! in the engine's transition table, never by string comparison.

#![deny(unsafe_code)]

mod action;
mod audit;
mod commands;
mod context;
mod decision;
mod errors;
mod event;
mod extension;
mod ids;

pub use action::*;
pub use audit::*;
pub use commands::*;
pub use context::*;
pub use decision::*;
pub use errors::*;
pub use event::*;
pub use extension::*;
pub use ids::*;

/// Minimum length for free-text justifications (extension reasons,
/// rejection notes, validation feedback).
pub const MIN_JUSTIFICATION_LEN: usize = 10;

/// Returns true when `text` carries at least [`MIN_JUSTIFICATION_LEN`]
/// non-whitespace-padded characters.
pub fn is_sufficient_justification(text: &str) -> bool {
    text.trim().chars().count() >= MIN_JUSTIFICATION_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn justification_length_counts_characters_not_bytes() {
        assert!(is_sufficient_justification("ten chars!"));
        assert!(!is_sufficient_justification("too short"));
        assert!(!is_sufficient_justification("   padded   "));
        assert!(is_sufficient_justification("ÅÅÅÅÅÅÅÅÅÅ"));
    }
}
