//! Existence precondition across both stores.

use polisync_core::{EntityKind, EntityStore, StoreError};

/// Whether a key is present in Store A and Store B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presence {
    pub document: bool,
    pub graph: bool,
}

impl Presence {
    pub fn in_both(&self) -> bool {
        self.document && self.graph
    }

    /// Present in exactly one store.
    pub fn is_diverged(&self) -> bool {
        self.document != self.graph
    }
}

/// Read-only check that a key exists in both stores before it is mutated.
///
/// The gate is conservative: a key held by only one store fails the check.
pub struct ConsistencyGate<'a> {
    document: &'a dyn EntityStore,
    graph: &'a dyn EntityStore,
}

impl<'a> ConsistencyGate<'a> {
    pub fn new(document: &'a dyn EntityStore, graph: &'a dyn EntityStore) -> Self {
        Self { document, graph }
    }

    pub async fn presence(&self, kind: EntityKind, key: &str) -> Result<Presence, StoreError> {
        let document = self.document.find(kind, key).await?.is_some();
        let graph = self.graph.find(kind, key).await?.is_some();
        Ok(Presence { document, graph })
    }

    pub async fn exists(&self, kind: EntityKind, key: &str) -> Result<bool, StoreError> {
        let presence = self.presence(kind, key).await?;
        if presence.is_diverged() {
            tracing::warn!(
                kind = %kind,
                key,
                document = presence.document,
                graph = presence.graph,
                "Key present in only one store"
            );
        }
        Ok(presence.in_both())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_flags() {
        let both = Presence {
            document: true,
            graph: true,
        };
        assert!(both.in_both());
        assert!(!both.is_diverged());

        let one_sided = Presence {
            document: true,
            graph: false,
        };
        assert!(!one_sided.in_both());
        assert!(one_sided.is_diverged());

        let neither = Presence {
            document: false,
            graph: false,
        };
        assert!(!neither.in_both());
        assert!(!neither.is_diverged());
    }
}
