//! The saga coordinator: the five write operations spanning both stores.
//!
//! Creates run as sagas (insert into the document store, then the graph
//! store, compensating the first insert on a conflict in the second).
//! Updates and deletes are gated on presence in both stores and then applied
//! to the document store first. They have no compensation: if the second
//! store fails after the first succeeded, the stores diverge and the failure
//! is surfaced to the caller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use polisync_core::{
    ClaimInput, ClientInput, ClientPatch, Entity, EntityKind, EntityStore, MissingArguments,
    PolicyInput, StoreError, UpdateOutcome, WriteAck,
};

use crate::error::{Result, SyncError};
use crate::gate::ConsistencyGate;
use crate::saga::{run_saga, InsertStep, SagaOutcome, SagaStep};

// ── Identifiers & Receipts ────────────────────────────────────────

/// Correlates the log lines and receipt of one coordinator call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OperationId(pub Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Confirmation of a create or update applied to both stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncReceipt {
    pub operation_id: OperationId,
    pub kind: EntityKind,
    pub key: String,
    pub document: WriteAck,
    pub graph: WriteAck,
    pub completed_at: DateTime<Utc>,
}

/// Records removed from one store by a client delete.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CascadeCounts {
    #[serde(rename = "deletedClientes")]
    pub clients: u64,
    #[serde(rename = "deletedPolizas")]
    pub policies: u64,
    #[serde(rename = "deletedSiniestros")]
    pub claims: u64,
}

/// Confirmation of a client delete with per-store cascade counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteReceipt {
    pub operation_id: OperationId,
    pub key: String,
    pub document: CascadeCounts,
    pub graph: CascadeCounts,
    pub completed_at: DateTime<Utc>,
}

// ── Configuration ─────────────────────────────────────────────────

/// What `create_claim` reports after compensating a graph-store conflict.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClaimConflictOutcome {
    #[default]
    NotFound,
    AlreadyExists,
}

/// Coordinator behaviour switches.
///
/// Loaded from the `[coordinator]` section of `polisync.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub claim_conflict_outcome: ClaimConflictOutcome,
}

// ── Coordinator ───────────────────────────────────────────────────

/// Keeps the document store (A) and graph store (B) in step.
pub struct Coordinator<A, B> {
    document: A,
    graph: B,
    config: CoordinatorConfig,
}

impl<A: EntityStore, B: EntityStore> Coordinator<A, B> {
    pub fn new(document: A, graph: B) -> Self {
        Self {
            document,
            graph,
            config: CoordinatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    fn gate(&self) -> ConsistencyGate<'_> {
        ConsistencyGate::new(&self.document, &self.graph)
    }

    /// Validate and create a client in both stores.
    pub async fn create_client(&self, input: ClientInput) -> Result<SyncReceipt> {
        let op = OperationId::new();
        let span = tracing::info_span!("operation", operation = "create_client", op = %op);
        let result = async move {
            let entity = Entity::Client(input.validate()?);
            match self.create_in_both(op, "create_client", &entity).await? {
                Some(receipt) => Ok(receipt),
                None => Err(SyncError::already_exists(EntityKind::Client, entity.key())),
            }
        }
        .instrument(span.clone())
        .await;
        finish(&span, result)
    }

    /// Merge `patch` into the client in both stores.
    pub async fn update_client(&self, id: &str, patch: ClientPatch) -> Result<SyncReceipt> {
        let op = OperationId::new();
        let span =
            tracing::info_span!("operation", operation = "update_client", op = %op, key = id);
        let result = async move {
            if id.trim().is_empty() {
                return Err(SyncError::from(MissingArguments::new(vec!["id_cliente"])));
            }
            let patch = patch.into_patch();
            if patch.is_empty() {
                return Err(SyncError::from(MissingArguments::new(ClientPatch::FIELDS.to_vec())));
            }

            let kind = EntityKind::Client;
            if !self.gate().exists(kind, id).await? {
                tracing::info!("Update rejected by consistency gate");
                return Err(SyncError::not_found(kind, id));
            }

            let document = match self.document.update(kind, id, &patch).await? {
                UpdateOutcome::Updated(ack) => ack,
                UpdateOutcome::NotFound => {
                    tracing::warn!(store = "document", "Client vanished after gate check");
                    return Err(SyncError::not_found(kind, id));
                }
            };
            let graph = match self.graph.update(kind, id, &patch).await? {
                UpdateOutcome::Updated(ack) => ack,
                UpdateOutcome::NotFound => {
                    tracing::warn!(
                        store = "graph",
                        "Client vanished after document update; stores diverged"
                    );
                    return Err(SyncError::not_found(kind, id));
                }
            };

            tracing::info!(fields = patch.len(), "Client updated in both stores");
            Ok(SyncReceipt {
                operation_id: op,
                kind,
                key: id.to_string(),
                document,
                graph,
                completed_at: Utc::now(),
            })
        }
        .instrument(span.clone())
        .await;
        finish(&span, result)
    }

    /// Delete a client, its policies and their claims from both stores.
    pub async fn delete_client(&self, id: &str) -> Result<DeleteReceipt> {
        let op = OperationId::new();
        let span =
            tracing::info_span!("operation", operation = "delete_client", op = %op, key = id);
        let result = async move {
            if id.trim().is_empty() {
                return Err(SyncError::from(MissingArguments::new(vec!["id_cliente"])));
            }
            if !self.gate().exists(EntityKind::Client, id).await? {
                tracing::info!("Delete rejected by consistency gate");
                return Err(SyncError::not_found(EntityKind::Client, id));
            }

            let document = cascade_delete(&self.document, id).await?;
            let graph = cascade_delete(&self.graph, id).await?;

            tracing::info!(
                policies = document.policies,
                claims = document.claims,
                "Client deleted from both stores"
            );
            Ok(DeleteReceipt {
                operation_id: op,
                key: id.to_string(),
                document,
                graph,
                completed_at: Utc::now(),
            })
        }
        .instrument(span.clone())
        .await;
        finish(&span, result)
    }

    /// Validate and create a claim against an existing policy.
    ///
    /// Duplicate and parent checks consult the document store only.
    pub async fn create_claim(&self, input: ClaimInput) -> Result<SyncReceipt> {
        let op = OperationId::new();
        let span = tracing::info_span!("operation", operation = "create_claim", op = %op);
        let result = async move {
            let claim = input.validate()?;

            if self
                .document
                .find(EntityKind::Claim, &claim.id)
                .await?
                .is_some()
            {
                return Err(SyncError::already_exists(EntityKind::Claim, &claim.id));
            }
            if self
                .document
                .find(EntityKind::Policy, &claim.policy_number)
                .await?
                .is_none()
            {
                return Err(SyncError::not_found(
                    EntityKind::Policy,
                    &claim.policy_number,
                ));
            }

            let key = claim.id.clone();
            let entity = Entity::Claim(claim);
            match self.create_in_both(op, "create_claim", &entity).await? {
                Some(receipt) => Ok(receipt),
                None => Err(match self.config.claim_conflict_outcome {
                    ClaimConflictOutcome::NotFound => SyncError::not_found(EntityKind::Claim, key),
                    ClaimConflictOutcome::AlreadyExists => {
                        SyncError::already_exists(EntityKind::Claim, key)
                    }
                }),
            }
        }
        .instrument(span.clone())
        .await;
        finish(&span, result)
    }

    /// Validate and create a policy whose client and agent exist in both stores.
    pub async fn create_policy(&self, input: PolicyInput) -> Result<SyncReceipt> {
        let op = OperationId::new();
        let span = tracing::info_span!("operation", operation = "create_policy", op = %op);
        let result = async move {
            let policy = input.validate()?;

            let gate = self.gate();
            if !gate.exists(EntityKind::Client, &policy.client_id).await? {
                return Err(SyncError::not_found(EntityKind::Client, &policy.client_id));
            }
            if !gate.exists(EntityKind::Agent, &policy.agent_id).await? {
                return Err(SyncError::not_found(EntityKind::Agent, &policy.agent_id));
            }
            if self
                .document
                .find(EntityKind::Policy, &policy.number)
                .await?
                .is_some()
            {
                return Err(SyncError::already_exists(EntityKind::Policy, &policy.number));
            }

            let entity = Entity::Policy(policy);
            match self.create_in_both(op, "create_policy", &entity).await? {
                Some(receipt) => Ok(receipt),
                None => Err(SyncError::already_exists(EntityKind::Policy, entity.key())),
            }
        }
        .instrument(span.clone())
        .await;
        finish(&span, result)
    }

    /// Insert into A then B. `None` means a conflict was hit and unwound.
    async fn create_in_both(
        &self,
        op: OperationId,
        name: &str,
        entity: &Entity,
    ) -> Result<Option<SyncReceipt>> {
        let into_document = InsertStep::new(&self.document, entity);
        let into_graph = InsertStep::new(&self.graph, entity);
        let steps: [&dyn SagaStep; 2] = [&into_document, &into_graph];

        let report = run_saga(name, &steps).await?;

        match report.outcome {
            SagaOutcome::Completed(acks) => {
                let [document, graph] = <[WriteAck; 2]>::try_from(acks).map_err(|acks| {
                    SyncError::Unexpected(StoreError::Serialization(format!(
                        "expected 2 write acks, got {}",
                        acks.len()
                    )))
                })?;
                tracing::info!(kind = %entity.kind(), key = entity.key(), "Created in both stores");
                Ok(Some(SyncReceipt {
                    operation_id: op,
                    kind: entity.kind(),
                    key: entity.key().to_string(),
                    document,
                    graph,
                    completed_at: Utc::now(),
                }))
            }
            SagaOutcome::Compensated { failed_step } => {
                tracing::info!(
                    kind = %entity.kind(),
                    key = entity.key(),
                    failed_step,
                    "Create conflicted"
                );
                Ok(None)
            }
        }
    }
}

/// Log a failed operation inside its span.
fn finish<T>(span: &tracing::Span, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        span.in_scope(|| match e {
            SyncError::Unexpected(source) => {
                tracing::error!(error = %source, "Operation failed");
            }
            other => {
                tracing::info!(code = other.code().as_str(), reason = %other, "Operation rejected");
            }
        });
    }
    result
}

/// Remove a client's claims, policies and the client from one store.
async fn cascade_delete(store: &dyn EntityStore, client_id: &str) -> Result<CascadeCounts> {
    let mut counts = CascadeCounts::default();
    for policy in store.policies_for_client(client_id).await? {
        for claim in store.claims_for_policy(&policy).await? {
            counts.claims += store.delete(EntityKind::Claim, &claim).await?;
        }
        counts.policies += store.delete(EntityKind::Policy, &policy).await?;
    }
    counts.clients = store.delete(EntityKind::Client, client_id).await?;
    tracing::debug!(store = %store.kind(), ?counts, "Cascade delete finished");
    Ok(counts)
}
