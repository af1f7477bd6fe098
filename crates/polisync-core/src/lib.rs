//! polisync-core: Shared types, validation, and the store contract for polisync.
//!
//! This crate provides the foundational pieces used by every polisync component:
//! - Entity types (Client, Policy, Claim, Agent, Vehicle) keyed by business key
//! - Input payloads and their validation into entities
//! - The [`EntityStore`] contract implemented by each backing store
//! - Common error types

pub mod error;
pub mod input;
pub mod store;
pub mod types;

pub use error::{MissingArguments, StoreError};
pub use input::{ClaimInput, ClientInput, ClientPatch, PolicyInput};
pub use store::{EntityStore, InsertOutcome, UpdateOutcome};
pub use types::{
    Agent, Claim, Client, Entity, EntityKind, Patch, Policy, Record, StoreKind, Vehicle, WriteAck,
};
