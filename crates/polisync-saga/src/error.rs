//! Error types for the polisync coordinator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use polisync_core::{EntityKind, MissingArguments, StoreError};

/// Outcome of a coordinator operation that did not succeed.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    MissingArguments(#[from] MissingArguments),

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: EntityKind, key: String },

    #[error("{kind} {key} not found")]
    NotFound { kind: EntityKind, key: String },

    #[error("Unexpected store failure: {0}")]
    Unexpected(#[from] StoreError),
}

/// Stable error codes exposed to callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingArguments,
    AlreadyExists,
    NotFound,
    Unexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingArguments => "MISSING_ARGUMENTS",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::NotFound => "NOT_FOUND",
            Self::Unexpected => "UNEXPECTED",
        }
    }

    /// Conventional HTTP status for a transport layer.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingArguments => 400,
            Self::NotFound => 404,
            Self::AlreadyExists => 409,
            Self::Unexpected => 500,
        }
    }
}

impl SyncError {
    pub(crate) fn already_exists(kind: EntityKind, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn not_found(kind: EntityKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingArguments(_) => ErrorCode::MissingArguments,
            Self::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Unexpected(_) => ErrorCode::Unexpected,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.code().http_status()
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::MissingArguments).unwrap();
        assert_eq!(json, "\"MISSING_ARGUMENTS\"");
        assert_eq!(ErrorCode::AlreadyExists.as_str(), "ALREADY_EXISTS");
    }

    #[test]
    fn status_mapping() {
        let missing = SyncError::from(MissingArguments::new(vec!["dni"]));
        assert_eq!(missing.http_status(), 400);
        assert_eq!(missing.to_string(), "Missing arguments: dni");

        let exists = SyncError::already_exists(EntityKind::Client, "CLI-1");
        assert_eq!(exists.http_status(), 409);
        assert_eq!(exists.to_string(), "client CLI-1 already exists");

        let missing_parent = SyncError::not_found(EntityKind::Agent, "AGE-1");
        assert_eq!(missing_parent.code(), ErrorCode::NotFound);
        assert_eq!(missing_parent.http_status(), 404);

        let unexpected = SyncError::from(StoreError::Serialization("bad".into()));
        assert_eq!(unexpected.http_status(), 500);
    }
}
