//! Core domain types for polisync.
//!
//! Entities are identified by a caller-supplied business key and persisted
//! independently in the document store and the graph store. Field names on
//! the wire follow the established insurance data set.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Entity Kinds ──────────────────────────────────────────────────

/// The kinds of entity held in both stores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Client,
    Policy,
    Claim,
    Agent,
    Vehicle,
}

impl EntityKind {
    /// Name of the business-key field in the data set.
    pub fn key_field(&self) -> &'static str {
        match self {
            Self::Client => "id_cliente",
            Self::Policy => "nro_poliza",
            Self::Claim => "id_siniestro",
            Self::Agent => "id_agente",
            Self::Vehicle => "patente",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Policy => "policy",
            Self::Claim => "claim",
            Self::Agent => "agent",
            Self::Vehicle => "vehicle",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two backing stores a value came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Store A: document store, tabular reporting.
    Document,
    /// Store B: graph store, relationship traversal.
    Graph,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => f.write_str("document"),
            Self::Graph => f.write_str("graph"),
        }
    }
}

// ── Entities ──────────────────────────────────────────────────────

/// A policyholder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    #[serde(rename = "id_cliente")]
    pub id: String,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "dni")]
    pub national_id: String,
    pub email: String,
    #[serde(rename = "telefono")]
    pub phone: String,
    #[serde(rename = "direccion")]
    pub address: String,
    #[serde(rename = "ciudad")]
    pub city: String,
    #[serde(rename = "provincia")]
    pub province: String,
    #[serde(rename = "activo")]
    pub active: String,
}

/// An insurance policy owned by a client and issued by an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Policy {
    #[serde(rename = "nro_poliza")]
    pub number: String,
    #[serde(rename = "id_cliente")]
    pub client_id: String,
    #[serde(rename = "tipo")]
    pub policy_type: String,
    #[serde(rename = "fecha_inicio")]
    pub start_date: String,
    #[serde(rename = "fecha_fin")]
    pub end_date: String,
    #[serde(rename = "prima_mensual")]
    pub monthly_premium: String,
    #[serde(rename = "cobertura_total")]
    pub total_coverage: String,
    #[serde(rename = "id_agente")]
    pub agent_id: String,
    #[serde(rename = "estado")]
    pub status: String,
}

/// A claim filed against a policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claim {
    #[serde(rename = "id_siniestro")]
    pub id: String,
    #[serde(rename = "nro_poliza")]
    pub policy_number: String,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "tipo")]
    pub claim_type: String,
    #[serde(rename = "monto_estimado")]
    pub estimated_amount: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "estado")]
    pub status: String,
}

/// An agent who issues policies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    #[serde(rename = "id_agente")]
    pub id: String,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "matricula")]
    pub license: String,
    #[serde(rename = "telefono", default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "zona", default)]
    pub region: String,
    #[serde(rename = "activo")]
    pub active: String,
}

/// A vehicle owned by a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vehicle {
    #[serde(rename = "patente")]
    pub plate: String,
    #[serde(rename = "id_cliente")]
    pub client_id: String,
    #[serde(rename = "marca")]
    pub make: String,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "anio")]
    pub year: String,
    #[serde(rename = "tipo", default)]
    pub vehicle_type: String,
}

/// Enum wrapper for every entity kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "entity", rename_all = "lowercase")]
pub enum Entity {
    Client(Client),
    Policy(Policy),
    Claim(Claim),
    Agent(Agent),
    Vehicle(Vehicle),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Client(_) => EntityKind::Client,
            Entity::Policy(_) => EntityKind::Policy,
            Entity::Claim(_) => EntityKind::Claim,
            Entity::Agent(_) => EntityKind::Agent,
            Entity::Vehicle(_) => EntityKind::Vehicle,
        }
    }

    /// The business key correlating this entity across stores.
    pub fn key(&self) -> &str {
        match self {
            Entity::Client(c) => &c.id,
            Entity::Policy(p) => &p.number,
            Entity::Claim(c) => &c.id,
            Entity::Agent(a) => &a.id,
            Entity::Vehicle(v) => &v.plate,
        }
    }

    /// The entity's fields as a flat JSON map, keyed by wire names.
    pub fn to_fields(&self) -> Map<String, Value> {
        let value = match self {
            Entity::Client(c) => serde_json::to_value(c),
            Entity::Policy(p) => serde_json::to_value(p),
            Entity::Claim(c) => serde_json::to_value(c),
            Entity::Agent(a) => serde_json::to_value(a),
            Entity::Vehicle(v) => serde_json::to_value(v),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Foreign keys this entity holds, as (parent kind, parent key).
    pub fn parents(&self) -> Vec<(EntityKind, &str)> {
        match self {
            Entity::Policy(p) => vec![
                (EntityKind::Client, p.client_id.as_str()),
                (EntityKind::Agent, p.agent_id.as_str()),
            ],
            Entity::Claim(c) => vec![(EntityKind::Policy, c.policy_number.as_str())],
            Entity::Vehicle(v) => vec![(EntityKind::Client, v.client_id.as_str())],
            Entity::Client(_) | Entity::Agent(_) => Vec::new(),
        }
    }
}

// ── Store Values ──────────────────────────────────────────────────

/// A lightweight record returned from store lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub kind: EntityKind,
    pub key: String,
    pub fields: Map<String, Value>,
}

/// A store's confirmation of a single write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteAck {
    pub store: StoreKind,
    pub key: String,
    /// Records matched or written by the store.
    pub affected: u64,
}

impl WriteAck {
    pub fn new(store: StoreKind, key: impl Into<String>, affected: u64) -> Self {
        Self {
            store,
            key: key.into(),
            affected,
        }
    }
}

/// A partial-field update, keyed by wire field names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client {
            id: "CLI-1".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Pérez".to_string(),
            national_id: "30111222".to_string(),
            email: "ana@example.com".to_string(),
            phone: "1155550000".to_string(),
            address: "Av. Siempreviva 742".to_string(),
            city: "Rosario".to_string(),
            province: "Santa Fe".to_string(),
            active: "True".to_string(),
        }
    }

    #[test]
    fn client_serializes_with_data_set_names() {
        let json = serde_json::to_value(client()).unwrap();
        assert_eq!(json["id_cliente"], "CLI-1");
        assert_eq!(json["nombre"], "Ana");
        assert_eq!(json["activo"], "True");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn entity_key_and_kind() {
        let entity = Entity::Client(client());
        assert_eq!(entity.key(), "CLI-1");
        assert_eq!(entity.kind(), EntityKind::Client);
        assert_eq!(entity.kind().key_field(), "id_cliente");
    }

    #[test]
    fn policy_parents() {
        let policy = Entity::Policy(Policy {
            number: "POL-1".to_string(),
            client_id: "CLI-1".to_string(),
            policy_type: "Auto".to_string(),
            start_date: "01/01/2025".to_string(),
            end_date: "01/01/2026".to_string(),
            monthly_premium: "15000".to_string(),
            total_coverage: "2000000".to_string(),
            agent_id: "AGE-1".to_string(),
            status: "Activa".to_string(),
        });
        assert_eq!(
            policy.parents(),
            vec![(EntityKind::Client, "CLI-1"), (EntityKind::Agent, "AGE-1")]
        );
    }

    #[test]
    fn store_kind_display() {
        assert_eq!(StoreKind::Document.to_string(), "document");
        assert_eq!(StoreKind::Graph.to_string(), "graph");
    }
}
