//! Read operations for the graph store.

use neo4rs::query;
use serde_json::{Map, Value};

use polisync_core::{EntityKind, Record};

use crate::client::{key_property, label, GraphClient, GraphError};

impl GraphClient {
    // ── Single Node Lookups ──────────────────────────────────────

    /// Find a node by kind and business key.
    pub async fn find_node(
        &self,
        kind: EntityKind,
        key: &str,
    ) -> Result<Option<Record>, GraphError> {
        let cypher = format!(
            "MATCH (n:{label} {{{prop}: $key}})
             RETURN n LIMIT 1",
            label = label(kind),
            prop = key_property(kind),
        );

        let q = query(&cypher).param("key", key.to_string());

        match self.query_one(q).await? {
            Some(row) => {
                let node: neo4rs::Node = row.get("n").map_err(|e| {
                    GraphError::Serialization(format!("Failed to deserialize node: {e}"))
                })?;
                Ok(Some(neo4j_node_to_record(&node, kind)))
            }
            None => Ok(None),
        }
    }

    // ── Relationship Lookups ─────────────────────────────────────

    /// Ids of the policies a client holds (`TIENE`).
    pub async fn policy_ids_for_client(&self, client_id: &str) -> Result<Vec<String>, GraphError> {
        let q = query(
            "MATCH (:Cliente {id: $id})-[:TIENE]->(p:Poliza)
             RETURN p.id AS id",
        )
        .param("id", client_id.to_string());

        self.collect_ids(q).await
    }

    /// Ids of the claims covered by a policy (`CUBIERTO_POR`).
    pub async fn claim_ids_for_policy(
        &self,
        policy_number: &str,
    ) -> Result<Vec<String>, GraphError> {
        let q = query(
            "MATCH (s:Siniestro)-[:CUBIERTO_POR]->(:Poliza {id: $id})
             RETURN s.id AS id",
        )
        .param("id", policy_number.to_string());

        self.collect_ids(q).await
    }

    async fn collect_ids(&self, q: neo4rs::Query) -> Result<Vec<String>, GraphError> {
        let rows = self.query_rows(q).await?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .get("id")
                .map_err(|e| GraphError::Serialization(format!("Failed to read id: {e}")))?;
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Properties stored on each node kind.
fn node_properties(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Client => &[
            "id",
            "nombre",
            "apellido",
            "dni",
            "email",
            "telefono",
            "direccion",
            "ciudad",
            "provincia",
            "activo",
        ],
        EntityKind::Policy => &[
            "id",
            "tipo",
            "fecha_inicio",
            "fecha_fin",
            "prima_mensual",
            "cobertura_total",
            "estado",
        ],
        EntityKind::Claim => &["id", "fecha", "tipo", "monto", "descripcion", "estado"],
        EntityKind::Agent => &[
            "id",
            "nombre",
            "apellido",
            "matricula",
            "telefono",
            "email",
            "zona",
            "activo",
        ],
        EntityKind::Vehicle => &["patente", "marca", "modelo", "anio", "tipo"],
    }
}

/// Convert a neo4rs::Node to our lightweight Record.
fn neo4j_node_to_record(node: &neo4rs::Node, kind: EntityKind) -> Record {
    let key: String = node.get(key_property(kind)).unwrap_or_default();

    let mut fields = Map::new();
    for prop in node_properties(kind) {
        if let Ok(v) = node.get::<String>(prop) {
            fields.insert((*prop).to_string(), Value::String(v));
        }
    }

    Record { kind, key, fields }
}
