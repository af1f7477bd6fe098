//! MongoDB connection management and shared document client.

use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use serde::Deserialize;

use polisync_core::{EntityKind, StoreError, StoreKind};

/// Server error code for a unique-index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Errors from document-store operations.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("MongoDB connection error: {0}")]
    Connection(String),

    #[error("MongoDB query error: {0}")]
    Query(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DocError {
    /// Whether this is a unique-index violation on insert.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            DocError::Query(e) => matches!(
                e.kind.as_ref(),
                ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY
            ),
            _ => false,
        }
    }
}

impl From<DocError> for StoreError {
    fn from(e: DocError) -> Self {
        match e {
            DocError::Connection(message) => StoreError::Connection {
                store: StoreKind::Document,
                message,
            },
            DocError::Serialization(message) => StoreError::Serialization(message),
            other => StoreError::backend(StoreKind::Document, other),
        }
    }
}

/// Configuration for connecting to MongoDB.
#[derive(Debug, Clone, Deserialize)]
pub struct DocConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "aseguradora".to_string()
}

fn default_max_pool_size() -> u32 {
    16
}

impl Default for DocConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            max_pool_size: default_max_pool_size(),
        }
    }
}

/// Thread-safe MongoDB client bound to one database.
///
/// The driver checks a pooled connection out for each operation and
/// returns it when the operation completes or fails.
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct DocClient {
    db: Database,
}

impl DocClient {
    /// Connect to MongoDB and verify the server responds.
    pub async fn connect(config: &DocConfig) -> Result<Self, DocError> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| DocError::Connection(e.to_string()))?;
        options.app_name = Some("polisync".to_string());
        options.max_pool_size = Some(config.max_pool_size);

        let client =
            Client::with_options(options).map_err(|e| DocError::Connection(e.to_string()))?;
        let db = client.database(&config.database);

        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DocError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, database = %config.database, "Connected to MongoDB");
        Ok(Self { db })
    }

    /// The collection holding an entity kind.
    pub fn collection(&self, kind: EntityKind) -> Collection<Document> {
        self.db.collection(collection_name(kind))
    }
}

// ── Schema Mapping ───────────────────────────────────────────────

/// Collection name for an entity kind.
pub(crate) fn collection_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Client => "clientes",
        EntityKind::Policy => "polizas",
        EntityKind::Claim => "siniestros",
        EntityKind::Agent => "agentes",
        EntityKind::Vehicle => "vehiculos",
    }
}

/// Exact-match filter on an entity's business key.
pub(crate) fn key_filter(kind: EntityKind, key: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(kind.key_field(), key);
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_server() {
        let config = DocConfig::default();
        assert_eq!(config.uri, "mongodb://localhost:27017");
        assert_eq!(config.database, "aseguradora");
    }

    #[test]
    fn key_filter_uses_data_set_field() {
        let filter = key_filter(EntityKind::Policy, "POL-1");
        assert_eq!(filter.get_str("nro_poliza").unwrap(), "POL-1");
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn collections_per_kind() {
        assert_eq!(collection_name(EntityKind::Client), "clientes");
        assert_eq!(collection_name(EntityKind::Claim), "siniestros");
        assert_eq!(collection_name(EntityKind::Vehicle), "vehiculos");
    }

    #[test]
    fn serialization_error_maps_through() {
        let err: StoreError = DocError::Serialization("bad".to_string()).into();
        assert!(matches!(err, StoreError::Serialization(ref m) if m == "bad"));
        assert!(!DocError::Connection("down".to_string()).is_duplicate_key());
    }
}
