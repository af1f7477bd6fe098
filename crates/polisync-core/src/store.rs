//! The store contract shared by the document and graph adapters.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{Entity, EntityKind, Patch, Record, StoreKind, WriteAck};

/// Result of an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(WriteAck),
    /// An entity with the same business key already exists.
    Conflict,
}

/// Result of an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(WriteAck),
    NotFound,
}

/// CRUD primitives against one backing store.
///
/// Implementations touch only the store they wrap and never call another
/// adapter. Each call acquires its own connection and releases it before
/// returning, on every exit path.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Which store this adapter wraps.
    fn kind(&self) -> StoreKind;

    /// Exact-match lookup by business key.
    async fn find(&self, kind: EntityKind, key: &str) -> Result<Option<Record>, StoreError>;

    /// Insert, reporting a conflict iff the business key already exists.
    async fn insert(&self, entity: &Entity) -> Result<InsertOutcome, StoreError>;

    /// Partial-field update by business key.
    async fn update(
        &self,
        kind: EntityKind,
        key: &str,
        patch: &Patch,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Delete by business key. Returns the number of records removed.
    async fn delete(&self, kind: EntityKind, key: &str) -> Result<u64, StoreError>;

    /// Policy numbers owned by a client.
    async fn policies_for_client(&self, client_id: &str) -> Result<Vec<String>, StoreError>;

    /// Claim ids filed against a policy.
    async fn claims_for_policy(&self, policy_number: &str) -> Result<Vec<String>, StoreError>;
}
