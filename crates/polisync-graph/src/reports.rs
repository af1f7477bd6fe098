//! Read-only traversal reports over the graph store.

use neo4rs::query;
use serde::Serialize;

use crate::client::{GraphClient, GraphError};

/// A claim with the client it affects.
#[derive(Debug, Clone, Serialize)]
pub struct OpenClaim {
    pub tipo: String,
    pub monto: String,
    pub nombre_cliente: String,
    pub apellido_cliente: String,
}

/// An active agent and how many policies they issued.
#[derive(Debug, Clone, Serialize)]
pub struct AgentPolicies {
    pub nombre: String,
    pub apellido: String,
    pub polizas: i64,
}

/// A client owning more than one vehicle.
#[derive(Debug, Clone, Serialize)]
pub struct MultiVehicleClient {
    pub nombre: String,
    pub apellido: String,
    pub vehiculos: i64,
}

/// A vehicle with its owner and one of the owner's policies.
#[derive(Debug, Clone, Serialize)]
pub struct InsuredVehicle {
    pub nombre: String,
    pub apellido: String,
    pub patente: String,
    pub nro_poliza: String,
}

/// An agent and how many claims hit the policies they issued.
#[derive(Debug, Clone, Serialize)]
pub struct AgentClaims {
    pub nombre: String,
    pub apellido: String,
    pub siniestros: i64,
}

impl GraphClient {
    /// Claims with type, amount, and affected client.
    pub async fn open_claims(&self) -> Result<Vec<OpenClaim>, GraphError> {
        let q = query(
            "MATCH (c:Cliente)-[:TIENE]->(:Poliza)<-[:CUBIERTO_POR]-(s:Siniestro)
             RETURN s.tipo AS tipo, s.monto AS monto,
                    c.nombre AS nombre, c.apellido AS apellido",
        );

        let rows = self.query_rows(q).await?;
        Ok(rows
            .into_iter()
            .map(|row| OpenClaim {
                tipo: row.get("tipo").unwrap_or_default(),
                monto: row.get("monto").unwrap_or_default(),
                nombre_cliente: row.get("nombre").unwrap_or_default(),
                apellido_cliente: row.get("apellido").unwrap_or_default(),
            })
            .collect())
    }

    /// Active agents with their issued policy counts, most first.
    pub async fn agent_policy_counts(&self) -> Result<Vec<AgentPolicies>, GraphError> {
        let q = query(
            "MATCH (a:Agente {activo: 'True'})-[:EMITE]->(p:Poliza)
             RETURN a.nombre AS nombre, a.apellido AS apellido, count(p) AS polizas
             ORDER BY polizas DESC",
        );

        let rows = self.query_rows(q).await?;
        Ok(rows
            .into_iter()
            .map(|row| AgentPolicies {
                nombre: row.get("nombre").unwrap_or_default(),
                apellido: row.get("apellido").unwrap_or_default(),
                polizas: row.get("polizas").unwrap_or(0),
            })
            .collect())
    }

    /// Clients owning more than one vehicle.
    pub async fn multi_vehicle_clients(&self) -> Result<Vec<MultiVehicleClient>, GraphError> {
        let q = query(
            "MATCH (c:Cliente)-[:POSEE]->(v:Vehiculo)
             WITH c, count(v) AS vehiculos
             WHERE vehiculos > 1
             RETURN c.nombre AS nombre, c.apellido AS apellido, vehiculos",
        );

        let rows = self.query_rows(q).await?;
        Ok(rows
            .into_iter()
            .map(|row| MultiVehicleClient {
                nombre: row.get("nombre").unwrap_or_default(),
                apellido: row.get("apellido").unwrap_or_default(),
                vehiculos: row.get("vehiculos").unwrap_or(0),
            })
            .collect())
    }

    /// Vehicles with their owner and each policy the owner holds.
    pub async fn insured_vehicles(&self) -> Result<Vec<InsuredVehicle>, GraphError> {
        let q = query(
            "MATCH (v:Vehiculo)<-[:POSEE]-(c:Cliente)-[:TIENE]->(p:Poliza)
             RETURN c.nombre AS nombre, c.apellido AS apellido,
                    v.patente AS patente, p.id AS nro_poliza",
        );

        let rows = self.query_rows(q).await?;
        Ok(rows
            .into_iter()
            .map(|row| InsuredVehicle {
                nombre: row.get("nombre").unwrap_or_default(),
                apellido: row.get("apellido").unwrap_or_default(),
                patente: row.get("patente").unwrap_or_default(),
                nro_poliza: row.get("nro_poliza").unwrap_or_default(),
            })
            .collect())
    }

    /// Agents with the number of claims against policies they issued.
    pub async fn agent_claim_counts(&self) -> Result<Vec<AgentClaims>, GraphError> {
        let q = query(
            "MATCH (a:Agente)-[:EMITE]->(:Poliza)<-[:CUBIERTO_POR]-(s:Siniestro)
             RETURN a.nombre AS nombre, a.apellido AS apellido, count(s) AS siniestros",
        );

        let rows = self.query_rows(q).await?;
        Ok(rows
            .into_iter()
            .map(|row| AgentClaims {
                nombre: row.get("nombre").unwrap_or_default(),
                apellido: row.get("apellido").unwrap_or_default(),
                siniestros: row.get("siniestros").unwrap_or(0),
            })
            .collect())
    }
}
