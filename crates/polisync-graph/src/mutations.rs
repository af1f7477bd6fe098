//! Write operations for the graph store.
//!
//! Creates are guarded: a single statement checks for an existing node with
//! the same key and for the required parents, and only creates when the key
//! is free and every parent is present. Nodes are identified by their
//! business key alone.

use neo4rs::{query, Query};

use polisync_core::{Agent, Claim, Client, Entity, EntityKind, Patch, Policy, Vehicle};

use crate::client::{key_property, label, GraphClient, GraphError};

/// Outcome of a guarded create.
///
/// `Conflict` covers both the guard finding an existing node and the
/// uniqueness constraint rejecting a create that raced past the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateResult {
    Created,
    Conflict,
}

impl GraphClient {
    // ── Schema ───────────────────────────────────────────────────

    /// Create a uniqueness constraint on the key property of every label.
    pub async fn ensure_constraints(&self) -> Result<(), GraphError> {
        for kind in [
            EntityKind::Client,
            EntityKind::Policy,
            EntityKind::Claim,
            EntityKind::Agent,
            EntityKind::Vehicle,
        ] {
            let label = label(kind);
            let prop = key_property(kind);
            let cypher = format!(
                "CREATE CONSTRAINT {}_{prop}_unique IF NOT EXISTS
                 FOR (n:{label}) REQUIRE n.{prop} IS UNIQUE",
                label.to_lowercase()
            );
            self.run(query(&cypher)).await?;
        }
        tracing::info!("Graph uniqueness constraints ensured");
        Ok(())
    }

    // ── Guarded Creates ──────────────────────────────────────────

    /// Create any entity as a node, linked to its parents.
    pub async fn create_entity(&self, entity: &Entity) -> Result<CreateResult, GraphError> {
        match entity {
            Entity::Client(c) => self.create_client(c).await,
            Entity::Policy(p) => self.create_policy(p).await,
            Entity::Claim(c) => self.create_claim(c).await,
            Entity::Agent(a) => self.create_agent(a).await,
            Entity::Vehicle(v) => self.create_vehicle(v).await,
        }
    }

    /// Create a Cliente node.
    pub async fn create_client(&self, client: &Client) -> Result<CreateResult, GraphError> {
        let q = query(
            "OPTIONAL MATCH (existing:Cliente {id: $id})
             FOREACH (_ IN CASE WHEN existing IS NULL THEN [1] ELSE [] END |
               CREATE (:Cliente {
                 id: $id, nombre: $nombre, apellido: $apellido, dni: $dni,
                 email: $email, telefono: $telefono, direccion: $direccion,
                 ciudad: $ciudad, provincia: $provincia, activo: $activo
               }))
             RETURN existing IS NOT NULL AS conflict",
        )
        .param("id", client.id.clone())
        .param("nombre", client.first_name.clone())
        .param("apellido", client.last_name.clone())
        .param("dni", client.national_id.clone())
        .param("email", client.email.clone())
        .param("telefono", client.phone.clone())
        .param("direccion", client.address.clone())
        .param("ciudad", client.city.clone())
        .param("provincia", client.province.clone())
        .param("activo", client.active.clone());

        self.guarded_create(q, &[]).await
    }

    /// Create a Poliza node owned by its Cliente and issued by its Agente.
    pub async fn create_policy(&self, policy: &Policy) -> Result<CreateResult, GraphError> {
        let q = query(
            "OPTIONAL MATCH (existing:Poliza {id: $id})
             OPTIONAL MATCH (c:Cliente {id: $client_id})
             OPTIONAL MATCH (a:Agente {id: $agent_id})
             FOREACH (_ IN CASE WHEN existing IS NULL AND c IS NOT NULL AND a IS NOT NULL
                               THEN [1] ELSE [] END |
               CREATE (p:Poliza {
                 id: $id, tipo: $tipo, fecha_inicio: $fecha_inicio,
                 fecha_fin: $fecha_fin, prima_mensual: $prima_mensual,
                 cobertura_total: $cobertura_total, estado: $estado
               })
               CREATE (c)-[:TIENE]->(p)
               CREATE (a)-[:EMITE]->(p))
             RETURN existing IS NOT NULL AS conflict,
                    c IS NOT NULL AS has_parent_0,
                    a IS NOT NULL AS has_parent_1",
        )
        .param("id", policy.number.clone())
        .param("client_id", policy.client_id.clone())
        .param("agent_id", policy.agent_id.clone())
        .param("tipo", policy.policy_type.clone())
        .param("fecha_inicio", policy.start_date.clone())
        .param("fecha_fin", policy.end_date.clone())
        .param("prima_mensual", policy.monthly_premium.clone())
        .param("cobertura_total", policy.total_coverage.clone())
        .param("estado", policy.status.clone());

        self.guarded_create(
            q,
            &[("Cliente", &policy.client_id), ("Agente", &policy.agent_id)],
        )
        .await
    }

    /// Create a Siniestro node covered by its Poliza.
    pub async fn create_claim(&self, claim: &Claim) -> Result<CreateResult, GraphError> {
        let q = query(
            "OPTIONAL MATCH (existing:Siniestro {id: $id})
             OPTIONAL MATCH (p:Poliza {id: $policy_number})
             FOREACH (_ IN CASE WHEN existing IS NULL AND p IS NOT NULL THEN [1] ELSE [] END |
               CREATE (s:Siniestro {
                 id: $id, fecha: $fecha, tipo: $tipo, monto: $monto,
                 descripcion: $descripcion, estado: $estado
               })
               CREATE (s)-[:CUBIERTO_POR]->(p))
             RETURN existing IS NOT NULL AS conflict,
                    p IS NOT NULL AS has_parent_0",
        )
        .param("id", claim.id.clone())
        .param("policy_number", claim.policy_number.clone())
        .param("fecha", claim.date.clone())
        .param("tipo", claim.claim_type.clone())
        .param("monto", claim.estimated_amount.clone())
        .param("descripcion", claim.description.clone())
        .param("estado", claim.status.clone());

        self.guarded_create(q, &[("Poliza", &claim.policy_number)])
            .await
    }

    /// Create an Agente node.
    pub async fn create_agent(&self, agent: &Agent) -> Result<CreateResult, GraphError> {
        let q = query(
            "OPTIONAL MATCH (existing:Agente {id: $id})
             FOREACH (_ IN CASE WHEN existing IS NULL THEN [1] ELSE [] END |
               CREATE (:Agente {
                 id: $id, nombre: $nombre, apellido: $apellido,
                 matricula: $matricula, telefono: $telefono, email: $email,
                 zona: $zona, activo: $activo
               }))
             RETURN existing IS NOT NULL AS conflict",
        )
        .param("id", agent.id.clone())
        .param("nombre", agent.first_name.clone())
        .param("apellido", agent.last_name.clone())
        .param("matricula", agent.license.clone())
        .param("telefono", agent.phone.clone())
        .param("email", agent.email.clone())
        .param("zona", agent.region.clone())
        .param("activo", agent.active.clone());

        self.guarded_create(q, &[]).await
    }

    /// Create a Vehiculo node owned by its Cliente.
    pub async fn create_vehicle(&self, vehicle: &Vehicle) -> Result<CreateResult, GraphError> {
        let q = query(
            "OPTIONAL MATCH (existing:Vehiculo {patente: $patente})
             OPTIONAL MATCH (c:Cliente {id: $client_id})
             FOREACH (_ IN CASE WHEN existing IS NULL AND c IS NOT NULL THEN [1] ELSE [] END |
               CREATE (v:Vehiculo {
                 patente: $patente, marca: $marca, modelo: $modelo,
                 anio: $anio, tipo: $tipo
               })
               CREATE (c)-[:POSEE]->(v))
             RETURN existing IS NOT NULL AS conflict,
                    c IS NOT NULL AS has_parent_0",
        )
        .param("patente", vehicle.plate.clone())
        .param("client_id", vehicle.client_id.clone())
        .param("marca", vehicle.make.clone())
        .param("modelo", vehicle.model.clone())
        .param("anio", vehicle.year.clone())
        .param("tipo", vehicle.vehicle_type.clone());

        self.guarded_create(q, &[("Cliente", &vehicle.client_id)])
            .await
    }

    /// Run a guarded create and interpret its `conflict` / `has_parent_N` columns.
    ///
    /// `parents` lists (label, id) in the order of the `has_parent_N` columns.
    async fn guarded_create(
        &self,
        q: Query,
        parents: &[(&str, &str)],
    ) -> Result<CreateResult, GraphError> {
        let row = match self.query_one(q).await {
            Ok(row) => row,
            // A concurrent create slipped in between the match and the create.
            Err(e) if e.is_constraint_violation() => return Ok(CreateResult::Conflict),
            Err(e) => return Err(e),
        }
        .ok_or_else(|| GraphError::Serialization("Guarded create returned no row".to_string()))?;

        let conflict: bool = row
            .get("conflict")
            .map_err(|e| GraphError::Serialization(format!("Missing conflict column: {e}")))?;
        if conflict {
            return Ok(CreateResult::Conflict);
        }

        for (i, (label, id)) in parents.iter().enumerate() {
            let column = format!("has_parent_{i}");
            let present: bool = row.get(&column).map_err(|e| {
                GraphError::Serialization(format!("Missing {column} column: {e}"))
            })?;
            if !present {
                return Err(GraphError::MissingParent {
                    label: (*label).to_string(),
                    id: (*id).to_string(),
                });
            }
        }

        Ok(CreateResult::Created)
    }

    // ── Updates & Deletes ────────────────────────────────────────

    /// Merge patch properties into a node. Returns the count of matched nodes.
    pub async fn merge_properties(
        &self,
        kind: EntityKind,
        key: &str,
        patch: &Patch,
    ) -> Result<i64, GraphError> {
        let props_json = serde_json::to_string(patch.as_map())
            .map_err(|e| GraphError::Serialization(e.to_string()))?;

        let cypher = format!(
            "MATCH (n:{label} {{{prop}: $key}})
             SET n += apoc.convert.fromJsonMap($props)
             RETURN count(n) AS cnt",
            label = label(kind),
            prop = key_property(kind),
        );

        let q = query(&cypher)
            .param("key", key.to_string())
            .param("props", props_json);

        self.query_count(q).await
    }

    /// Delete a node and its relationships. Returns the count of deleted nodes.
    pub async fn delete_node(&self, kind: EntityKind, key: &str) -> Result<i64, GraphError> {
        let cypher = format!(
            "MATCH (n:{label} {{{prop}: $key}})
             DETACH DELETE n
             RETURN count(n) AS cnt",
            label = label(kind),
            prop = key_property(kind),
        );

        let q = query(&cypher).param("key", key.to_string());

        self.query_count(q).await
    }
}
