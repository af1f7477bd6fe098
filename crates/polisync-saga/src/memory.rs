//! In-memory [`EntityStore`] for tests and local runs.
//!
//! Records every call in an operation log so tests can assert which store
//! was touched, and supports one-shot failure injection per operation type.
//! A record can also be made to disappear just before its next update, which
//! stands in for a concurrent delete landing after the consistency gate.
//! A store created with [`MemoryStore::graph`] rejects policies, claims and
//! vehicles whose parents are absent, like the Neo4j adapter.
//!
//! Not durable and not shared across processes.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use polisync_core::{
    Entity, EntityKind, EntityStore, InsertOutcome, Patch, Record, StoreError, StoreKind,
    UpdateOutcome, WriteAck,
};

/// A store call, as recorded in the operation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Find { kind: EntityKind, key: String },
    Insert { kind: EntityKind, key: String },
    Update { kind: EntityKind, key: String },
    Delete { kind: EntityKind, key: String },
    PoliciesForClient { client_id: String },
    ClaimsForPolicy { policy_number: String },
}

impl StoreOp {
    /// Whether this call can change stored state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Insert { .. } | Self::Update { .. } | Self::Delete { .. }
        )
    }
}

/// Operation types that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Find,
    Insert,
    Update,
    Delete,
    Lookup,
}

#[derive(Debug, Default)]
struct State {
    records: BTreeMap<(EntityKind, String), Map<String, Value>>,
    log: Vec<StoreOp>,
    fail_next: Vec<FailOn>,
    vanish_on_update: Vec<(EntityKind, String)>,
}

impl State {
    /// Consume a pending injected failure for `op`, if any.
    fn take_failure(&mut self, op: FailOn) -> bool {
        match self.fail_next.iter().position(|f| *f == op) {
            Some(index) => {
                self.fail_next.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop the record if it was scheduled to vanish on this update.
    fn take_vanish(&mut self, kind: EntityKind, key: &str) {
        if let Some(index) = self
            .vanish_on_update
            .iter()
            .position(|(k, v)| *k == kind && v == key)
        {
            self.vanish_on_update.remove(index);
            self.records.remove(&(kind, key.to_string()));
        }
    }

    fn child_keys(&self, kind: EntityKind, parent_field: &str, parent_key: &str) -> Vec<String> {
        self.records
            .iter()
            .filter(|((k, _), fields)| {
                *k == kind && fields.get(parent_field).and_then(Value::as_str) == Some(parent_key)
            })
            .map(|((_, key), _)| key.clone())
            .collect()
    }
}

/// Thread-safe in-memory store. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    kind: StoreKind,
    enforce_parents: bool,
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// A store standing in for the document store.
    pub fn document() -> Self {
        Self {
            kind: StoreKind::Document,
            enforce_parents: false,
            state: Arc::default(),
        }
    }

    /// A store standing in for the graph store.
    pub fn graph() -> Self {
        Self {
            kind: StoreKind::Graph,
            enforce_parents: true,
            state: Arc::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put an entity in place without logging the write.
    pub fn seed(&self, entity: &Entity) {
        self.state().records.insert(
            (entity.kind(), entity.key().to_string()),
            entity.to_fields(),
        );
    }

    pub fn contains(&self, kind: EntityKind, key: &str) -> bool {
        self.state().records.contains_key(&(kind, key.to_string()))
    }

    pub fn fields(&self, kind: EntityKind, key: &str) -> Option<Map<String, Value>> {
        self.state().records.get(&(kind, key.to_string())).cloned()
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.state()
            .records
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Every call made so far, in order.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.state().log.clone()
    }

    /// Only the calls that could change state.
    pub fn mutations(&self) -> Vec<StoreOp> {
        self.state()
            .log
            .iter()
            .filter(|op| op.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_log(&self) {
        self.state().log.clear();
    }

    /// Make the next call of this type fail with a backend error.
    pub fn fail_next(&self, op: FailOn) {
        self.state().fail_next.push(op);
    }

    /// Remove this record right before the next update that targets it.
    pub fn vanish_before_update(&self, kind: EntityKind, key: &str) {
        self.state()
            .vanish_on_update
            .push((kind, key.to_string()));
    }

    fn injected(&self, op: FailOn) -> StoreError {
        StoreError::backend(self.kind, anyhow::anyhow!("injected {op:?} failure"))
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        self.kind
    }

    async fn find(&self, kind: EntityKind, key: &str) -> Result<Option<Record>, StoreError> {
        let mut state = self.state();
        state.log.push(StoreOp::Find {
            kind,
            key: key.to_string(),
        });
        if state.take_failure(FailOn::Find) {
            return Err(self.injected(FailOn::Find));
        }
        Ok(state
            .records
            .get(&(kind, key.to_string()))
            .map(|fields| Record {
                kind,
                key: key.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn insert(&self, entity: &Entity) -> Result<InsertOutcome, StoreError> {
        let kind = entity.kind();
        let key = entity.key().to_string();
        let mut state = self.state();
        state.log.push(StoreOp::Insert {
            kind,
            key: key.clone(),
        });
        if state.take_failure(FailOn::Insert) {
            return Err(self.injected(FailOn::Insert));
        }
        if state.records.contains_key(&(kind, key.clone())) {
            return Ok(InsertOutcome::Conflict);
        }
        if self.enforce_parents {
            for (parent_kind, parent_key) in entity.parents() {
                if !state
                    .records
                    .contains_key(&(parent_kind, parent_key.to_string()))
                {
                    return Err(StoreError::MissingParent {
                        kind: parent_kind,
                        key: parent_key.to_string(),
                    });
                }
            }
        }
        state.records.insert((kind, key.clone()), entity.to_fields());
        Ok(InsertOutcome::Inserted(WriteAck::new(self.kind, key, 1)))
    }

    async fn update(
        &self,
        kind: EntityKind,
        key: &str,
        patch: &Patch,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut state = self.state();
        state.log.push(StoreOp::Update {
            kind,
            key: key.to_string(),
        });
        if state.take_failure(FailOn::Update) {
            return Err(self.injected(FailOn::Update));
        }
        state.take_vanish(kind, key);
        let Some(fields) = state.records.get_mut(&(kind, key.to_string())) else {
            return Ok(UpdateOutcome::NotFound);
        };
        for (name, value) in patch.iter() {
            if name != kind.key_field() {
                fields.insert(name.clone(), value.clone());
            }
        }
        Ok(UpdateOutcome::Updated(WriteAck::new(self.kind, key, 1)))
    }

    async fn delete(&self, kind: EntityKind, key: &str) -> Result<u64, StoreError> {
        let mut state = self.state();
        state.log.push(StoreOp::Delete {
            kind,
            key: key.to_string(),
        });
        if state.take_failure(FailOn::Delete) {
            return Err(self.injected(FailOn::Delete));
        }
        Ok(u64::from(
            state.records.remove(&(kind, key.to_string())).is_some(),
        ))
    }

    async fn policies_for_client(&self, client_id: &str) -> Result<Vec<String>, StoreError> {
        let mut state = self.state();
        state.log.push(StoreOp::PoliciesForClient {
            client_id: client_id.to_string(),
        });
        if state.take_failure(FailOn::Lookup) {
            return Err(self.injected(FailOn::Lookup));
        }
        Ok(state.child_keys(EntityKind::Policy, "id_cliente", client_id))
    }

    async fn claims_for_policy(&self, policy_number: &str) -> Result<Vec<String>, StoreError> {
        let mut state = self.state();
        state.log.push(StoreOp::ClaimsForPolicy {
            policy_number: policy_number.to_string(),
        });
        if state.take_failure(FailOn::Lookup) {
            return Err(self.injected(FailOn::Lookup));
        }
        Ok(state.child_keys(EntityKind::Claim, "nro_poliza", policy_number))
    }
}

#[cfg(test)]
mod tests {
    use polisync_core::{Agent, Client, Policy};

    use super::*;

    fn client(id: &str) -> Entity {
        Entity::Client(Client {
            id: id.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Pérez".to_string(),
            national_id: "30111222".to_string(),
            email: "ana@example.com".to_string(),
            phone: "1155550000".to_string(),
            address: "Av. Siempreviva 742".to_string(),
            city: "Rosario".to_string(),
            province: "Santa Fe".to_string(),
            active: "True".to_string(),
        })
    }

    fn policy(number: &str) -> Entity {
        Entity::Policy(Policy {
            number: number.to_string(),
            client_id: "CLI-1".to_string(),
            policy_type: "Auto".to_string(),
            start_date: "01/01/2025".to_string(),
            end_date: "01/01/2026".to_string(),
            monthly_premium: "15000".to_string(),
            total_coverage: "2000000".to_string(),
            agent_id: "AGE-1".to_string(),
            status: "Activa".to_string(),
        })
    }

    fn agent() -> Entity {
        Entity::Agent(Agent {
            id: "AGE-1".to_string(),
            first_name: "Luis".to_string(),
            last_name: "Gómez".to_string(),
            license: "MAT-100".to_string(),
            phone: String::new(),
            email: String::new(),
            region: String::new(),
            active: "True".to_string(),
        })
    }

    #[tokio::test]
    async fn insert_conflicts_on_existing_key() {
        let store = MemoryStore::document();
        let entity = client("CLI-1");
        assert!(matches!(
            store.insert(&entity).await.unwrap(),
            InsertOutcome::Inserted(_)
        ));
        assert_eq!(store.insert(&entity).await.unwrap(), InsertOutcome::Conflict);
        assert_eq!(store.count(EntityKind::Client), 1);
        assert_eq!(store.mutations().len(), 2);
    }

    #[tokio::test]
    async fn seeding_is_not_logged() {
        let store = MemoryStore::document();
        store.seed(&client("CLI-1"));
        assert!(store.contains(EntityKind::Client, "CLI-1"));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn update_keeps_key_and_reports_missing() {
        let store = MemoryStore::document();
        store.seed(&client("CLI-1"));
        let mut patch = Patch::new();
        patch.set("ciudad", "Córdoba");
        patch.set("id_cliente", "CLI-2");

        let outcome = store.update(EntityKind::Client, "CLI-1", &patch).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(_)));
        let fields = store.fields(EntityKind::Client, "CLI-1").unwrap();
        assert_eq!(fields["ciudad"], "Córdoba");
        assert_eq!(fields["id_cliente"], "CLI-1");

        let missing = store.update(EntityKind::Client, "CLI-9", &patch).await.unwrap();
        assert_eq!(missing, UpdateOutcome::NotFound);
    }

    #[tokio::test]
    async fn vanished_record_updates_as_not_found_once() {
        let store = MemoryStore::document();
        store.seed(&client("CLI-1"));
        store.vanish_before_update(EntityKind::Client, "CLI-1");
        let mut patch = Patch::new();
        patch.set("ciudad", "Córdoba");

        assert!(store.find(EntityKind::Client, "CLI-1").await.unwrap().is_some());
        let outcome = store.update(EntityKind::Client, "CLI-1", &patch).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::NotFound);
        assert!(!store.contains(EntityKind::Client, "CLI-1"));

        store.seed(&client("CLI-1"));
        let outcome = store.update(EntityKind::Client, "CLI-1", &patch).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(_)));
    }

    #[tokio::test]
    async fn graph_store_requires_parents() {
        let store = MemoryStore::graph();
        store.seed(&client("CLI-1"));
        let err = store.insert(&policy("POL-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingParent { kind: EntityKind::Agent, .. }));

        store.seed(&agent());
        assert!(matches!(
            store.insert(&policy("POL-1")).await.unwrap(),
            InsertOutcome::Inserted(_)
        ));
        assert_eq!(store.policies_for_client("CLI-1").await.unwrap(), vec!["POL-1"]);
    }

    #[tokio::test]
    async fn injected_failure_is_one_shot() {
        let store = MemoryStore::document();
        store.fail_next(FailOn::Find);
        assert!(store.find(EntityKind::Client, "CLI-1").await.is_err());
        assert!(store.find(EntityKind::Client, "CLI-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_counts_removed_records() {
        let store = MemoryStore::document();
        store.seed(&client("CLI-1"));
        assert_eq!(store.delete(EntityKind::Client, "CLI-1").await.unwrap(), 1);
        assert_eq!(store.delete(EntityKind::Client, "CLI-1").await.unwrap(), 0);
    }
}
