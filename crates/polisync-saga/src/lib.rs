//! polisync-saga: keeps the document store and graph store in step.
//!
//! The [`Coordinator`] exposes the multi-store write operations (client,
//! policy and claim creation, client update and cascading delete). Creates
//! run through the [`saga`] executor, which compensates committed steps when
//! a later store reports a business-key conflict. Updates and deletes are
//! guarded by the [`gate::ConsistencyGate`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod memory;
pub mod saga;

pub use coordinator::{
    CascadeCounts, ClaimConflictOutcome, Coordinator, CoordinatorConfig, DeleteReceipt,
    OperationId, SyncReceipt,
};
pub use error::{ErrorCode, Result, SyncError};
pub use memory::{FailOn, MemoryStore, StoreOp};
