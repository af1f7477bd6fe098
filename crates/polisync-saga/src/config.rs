//! Configuration for the polisync binary.

use serde::Deserialize;

use polisync_docstore::DocConfig;
use polisync_graph::GraphConfig;

use crate::coordinator::CoordinatorConfig;

/// Top-level configuration.
///
/// Loaded from `polisync.toml` or `POLISYNC__` environment variables,
/// e.g. `POLISYNC__NEO4J__PASSWORD`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mongo: DocConfig,
    #[serde(default)]
    pub neo4j: GraphConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

/// Load configuration from `<file_prefix>.toml` (optional) and the environment.
///
/// A section that fails to deserialize falls back to its defaults.
pub fn load(file_prefix: &str) -> Result<AppConfig, config::ConfigError> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("POLISYNC")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(AppConfig {
        mongo: section(&cfg, "mongo"),
        neo4j: section(&cfg, "neo4j"),
        coordinator: section(&cfg, "coordinator"),
    })
}

fn section<T>(cfg: &config::Config, key: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match cfg.get::<T>(key) {
        Ok(value) => value,
        Err(config::ConfigError::NotFound(_)) => T::default(),
        Err(e) => {
            tracing::warn!(section = key, error = %e, "Invalid config section, using defaults");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::coordinator::ClaimConflictOutcome;

    fn write_config(contents: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polisync.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let prefix = dir.path().join("polisync").to_string_lossy().into_owned();
        (dir, prefix)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent").to_string_lossy().into_owned();
        let config = load(&prefix).unwrap();
        assert_eq!(config.mongo.database, "aseguradora");
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(
            config.coordinator.claim_conflict_outcome,
            ClaimConflictOutcome::NotFound
        );
    }

    #[test]
    fn test_file_overrides_sections() {
        let (_dir, prefix) = write_config(
            r#"
[mongo]
uri = "mongodb://db.internal:27017"
database = "seguros"

[neo4j]
user = "admin"
max_connections = 4

[coordinator]
claim_conflict_outcome = "already_exists"
"#,
        );
        let config = load(&prefix).unwrap();
        assert_eq!(config.mongo.uri, "mongodb://db.internal:27017");
        assert_eq!(config.mongo.database, "seguros");
        assert_eq!(config.neo4j.user, "admin");
        assert_eq!(config.neo4j.max_connections, 4);
        assert_eq!(config.neo4j.password, "neo4jpass");
        assert_eq!(
            config.coordinator.claim_conflict_outcome,
            ClaimConflictOutcome::AlreadyExists
        );
    }

    #[test]
    fn test_malformed_section_falls_back() {
        let (_dir, prefix) = write_config(
            r#"
[coordinator]
claim_conflict_outcome = "sometimes"

[mongo]
database = "seguros"
"#,
        );
        let config = load(&prefix).unwrap();
        assert_eq!(
            config.coordinator.claim_conflict_outcome,
            ClaimConflictOutcome::NotFound
        );
        assert_eq!(config.mongo.database, "seguros");
    }
}
