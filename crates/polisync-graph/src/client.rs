//! Neo4j connection management and shared graph client.

use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;

use polisync_core::{EntityKind, StoreError, StoreKind};

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Parent node not found: {label} with id {id}")]
    MissingParent { label: String, id: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Neo4j status code raised when a uniqueness constraint rejects a write.
const CONSTRAINT_VIOLATION: &str = "Neo.ClientError.Schema.ConstraintValidationFailed";

impl GraphError {
    /// True when the server rejected a write on a uniqueness constraint.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            GraphError::Query(e) => is_constraint_message(&e.to_string()),
            _ => false,
        }
    }
}

fn is_constraint_message(message: &str) -> bool {
    message.contains(CONSTRAINT_VIOLATION) || message.contains("already exists with label")
}

impl From<GraphError> for StoreError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::Connection(message) => StoreError::Connection {
                store: StoreKind::Graph,
                message,
            },
            GraphError::MissingParent { label, id } => StoreError::MissingParent {
                kind: kind_for_label(&label),
                key: id,
            },
            GraphError::Serialization(message) => StoreError::Serialization(message),
            other => StoreError::backend(StoreKind::Graph, other),
        }
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "neo4jpass".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Every query checks a connection out of the pool for its own duration
/// and returns it when the call completes or fails.
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Execute a write-only query (CREATE, MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }

    /// Execute a query returning a single `cnt` column.
    pub async fn query_count(&self, query: Query) -> Result<i64, GraphError> {
        match self.query_one(query).await? {
            Some(row) => row
                .get::<i64>("cnt")
                .map_err(|e| GraphError::Serialization(format!("Failed to read cnt: {e}"))),
            None => Ok(0),
        }
    }
}

// ── Schema Mapping ───────────────────────────────────────────────

/// Neo4j label for an entity kind.
pub(crate) fn label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Client => "Cliente",
        EntityKind::Policy => "Poliza",
        EntityKind::Claim => "Siniestro",
        EntityKind::Agent => "Agente",
        EntityKind::Vehicle => "Vehiculo",
    }
}

/// Property holding the business key on a node.
pub(crate) fn key_property(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Vehicle => "patente",
        _ => "id",
    }
}

fn kind_for_label(label: &str) -> EntityKind {
    match label {
        "Poliza" => EntityKind::Policy,
        "Siniestro" => EntityKind::Claim,
        "Agente" => EntityKind::Agent,
        "Vehiculo" => EntityKind::Vehicle,
        _ => EntityKind::Client,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_bolt() {
        let config = GraphConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.max_connections, 16);
    }

    #[test]
    fn labels_round_trip() {
        for kind in [
            EntityKind::Client,
            EntityKind::Policy,
            EntityKind::Claim,
            EntityKind::Agent,
            EntityKind::Vehicle,
        ] {
            assert_eq!(kind_for_label(label(kind)), kind);
        }
        assert_eq!(key_property(EntityKind::Vehicle), "patente");
        assert_eq!(key_property(EntityKind::Policy), "id");
    }

    #[test]
    fn constraint_code_is_recognised() {
        assert!(is_constraint_message(
            "Neo4j error `Neo.ClientError.Schema.ConstraintValidationFailed`: \
             Node(12) already exists with label `Cliente` and property `id` = 'CLI-1'"
        ));
        assert!(!is_constraint_message(
            "Neo4j error `Neo.ClientError.Statement.SyntaxError`: Invalid input"
        ));
        assert!(!GraphError::Connection("refused".to_string()).is_constraint_violation());
        assert!(!GraphError::Serialization(CONSTRAINT_VIOLATION.to_string())
            .is_constraint_violation());
    }

    #[test]
    fn missing_parent_maps_to_store_error() {
        let err: StoreError = GraphError::MissingParent {
            label: "Poliza".to_string(),
            id: "POL-9".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            StoreError::MissingParent { kind: EntityKind::Policy, ref key } if key == "POL-9"
        ));
    }
}
