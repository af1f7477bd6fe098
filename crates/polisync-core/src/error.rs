use thiserror::Error;

use crate::types::{EntityKind, StoreKind};

/// Failure of a single store call that is not a business-key conflict.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{store} store connection error: {message}")]
    Connection { store: StoreKind, message: String },

    #[error("{store} store error: {source}")]
    Backend {
        store: StoreKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Parent {kind} {key} is missing")]
    MissingParent { kind: EntityKind, key: String },
}

impl StoreError {
    pub fn backend(store: StoreKind, source: impl Into<anyhow::Error>) -> Self {
        Self::Backend {
            store,
            source: source.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Input validation failure: required fields absent or blank.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Missing arguments: {}", fields.join(", "))]
pub struct MissingArguments {
    pub fields: Vec<&'static str>,
}

impl MissingArguments {
    pub fn new(fields: Vec<&'static str>) -> Self {
        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_arguments_lists_fields() {
        let err = MissingArguments::new(vec!["nombre", "dni"]);
        assert_eq!(err.to_string(), "Missing arguments: nombre, dni");
    }

    #[test]
    fn backend_error_names_store() {
        let err = StoreError::backend(StoreKind::Graph, anyhow::anyhow!("bolt closed"));
        assert_eq!(err.to_string(), "graph store error: bolt closed");
    }
}
