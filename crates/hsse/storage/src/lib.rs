//! HSSE lifecycle storage abstractions.
//!
//! The engine needs two things from its store:
//! - atomic read-modify-write of aggregate status, guarded by the status
//!   (and revision) the caller last observed
//! - an append-only audit log written in the same atomic unit
//!
//! Every write goes through [`TransactionalStore::commit`]. Reads are
//! tenant-scoped; records of another tenant are invisible.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryLifecycleStore;
pub use model::{EventQuery, QueryWindow, StatusGuard, Transaction, Write};
pub use traits::{
    ActionStore, AuditStore, DecisionStore, EventStore, ExtensionStore, LifecycleStore,
    TransactionalStore,
};
