//! Read-only aggregation reports over the document store.

use chrono::{DateTime, Months, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use polisync_core::EntityKind;

use crate::client::{DocClient, DocError};

/// An active client and their in-force policy numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveClient {
    pub nombre: String,
    pub polizas_vigentes: Vec<String>,
}

/// An expired policy with its owner's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiredPolicy {
    pub nro_poliza: String,
    pub nombre: String,
    pub apellido: String,
}

/// A client ranked by summed coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageRank {
    pub cliente: String,
    pub total_cobertura: i64,
}

/// A client with no `Activa` policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InactiveClient {
    pub nombre: String,
}

/// A recent accident claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccidentClaim {
    pub id_siniestro: String,
}

/// A suspended policy with its owner's standing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspendedPolicy {
    pub nro_poliza: String,
    /// `Activo`, `Inactivo`, or absent when the client flag is unreadable.
    pub estado_cliente: Option<String>,
}

impl DocClient {
    /// Active clients holding at least one `Activa` policy.
    pub async fn active_clients(&self) -> Result<Vec<ActiveClient>, DocError> {
        let pipeline = vec![
            doc! { "$match": { "activo": "True" } },
            doc! { "$lookup": {
                "from": "polizas",
                "localField": "id_cliente",
                "foreignField": "id_cliente",
                "as": "polizas",
            } },
            doc! { "$addFields": { "polizas_vigentes": { "$filter": {
                "input": "$polizas",
                "as": "p",
                "cond": { "$eq": ["$$p.estado", "Activa"] },
            } } } },
            doc! { "$match": { "polizas_vigentes.0": { "$exists": true } } },
            doc! { "$project": {
                "_id": 0,
                "nombre": 1,
                "polizas_vigentes": "$polizas_vigentes.nro_poliza",
            } },
        ];
        self.aggregate_rows(EntityKind::Client, pipeline).await
    }

    /// Policies in `Vencida` state with their owner's name.
    pub async fn expired_policies(&self) -> Result<Vec<ExpiredPolicy>, DocError> {
        let pipeline = vec![
            doc! { "$match": { "estado": "Vencida" } },
            doc! { "$lookup": {
                "from": "clientes",
                "localField": "id_cliente",
                "foreignField": "id_cliente",
                "as": "cliente",
            } },
            doc! { "$unwind": "$cliente" },
            doc! { "$project": {
                "_id": 0,
                "nro_poliza": 1,
                "nombre": "$cliente.nombre",
                "apellido": "$cliente.apellido",
            } },
        ];
        self.aggregate_rows(EntityKind::Policy, pipeline).await
    }

    /// Top 10 clients by summed `cobertura_total`.
    pub async fn top_clients_by_coverage(&self) -> Result<Vec<CoverageRank>, DocError> {
        let pipeline = vec![
            doc! { "$group": {
                "_id": "$id_cliente",
                "total_cobertura": { "$sum": { "$toLong": "$cobertura_total" } },
            } },
            doc! { "$sort": { "total_cobertura": -1 } },
            doc! { "$limit": 10 },
            doc! { "$lookup": {
                "from": "clientes",
                "localField": "_id",
                "foreignField": "id_cliente",
                "as": "cliente",
            } },
            doc! { "$unwind": "$cliente" },
            doc! { "$project": {
                "_id": 0,
                "cliente": "$cliente.nombre",
                "total_cobertura": 1,
            } },
        ];
        self.aggregate_rows(EntityKind::Policy, pipeline).await
    }

    /// Clients holding no `Activa` policy, including clients with none at all.
    pub async fn clients_without_active_policies(&self) -> Result<Vec<InactiveClient>, DocError> {
        let pipeline = vec![
            doc! { "$lookup": {
                "from": "polizas",
                "localField": "id_cliente",
                "foreignField": "id_cliente",
                "as": "polizas",
            } },
            doc! { "$addFields": { "tiene_vigente": { "$gt": [
                { "$size": { "$filter": {
                    "input": "$polizas",
                    "as": "p",
                    "cond": { "$eq": ["$$p.estado", "Activa"] },
                } } },
                0,
            ] } } },
            doc! { "$match": { "tiene_vigente": false } },
            doc! { "$project": { "_id": 0, "nombre": 1 } },
        ];
        self.aggregate_rows(EntityKind::Client, pipeline).await
    }

    /// `Accidente` claims dated within the last year.
    ///
    /// Claim dates are stored as `dd/mm/yyyy` strings.
    pub async fn recent_accident_claims(&self) -> Result<Vec<AccidentClaim>, DocError> {
        let cutoff = one_year_before(Utc::now());
        let pipeline = vec![
            doc! { "$match": {
                "tipo": "Accidente",
                "$expr": { "$gt": [
                    { "$dateFromString": {
                        "dateString": "$fecha",
                        "format": "%d/%m/%Y",
                        "timezone": "UTC",
                    } },
                    cutoff,
                ] },
            } },
            doc! { "$project": { "_id": 0, "id_siniestro": 1 } },
        ];
        self.aggregate_rows(EntityKind::Claim, pipeline).await
    }

    /// `Suspendida` policies with whether their client is active.
    pub async fn suspended_policies(&self) -> Result<Vec<SuspendedPolicy>, DocError> {
        let pipeline = vec![
            doc! { "$match": { "estado": "Suspendida" } },
            doc! { "$lookup": {
                "from": "clientes",
                "let": { "cliente": "$id_cliente" },
                "pipeline": [
                    { "$match": { "$expr": { "$eq": ["$id_cliente", "$$cliente"] } } },
                    { "$project": {
                        "_id": 0,
                        "estado": { "$switch": {
                            "branches": [
                                { "case": { "$eq": [{ "$toLower": "$activo" }, "true"] },
                                  "then": "Activo" },
                                { "case": { "$eq": [{ "$toLower": "$activo" }, "false"] },
                                  "then": "Inactivo" },
                            ],
                            "default": null,
                        } },
                    } },
                ],
                "as": "cliente",
            } },
            doc! { "$unwind": "$cliente" },
            doc! { "$project": {
                "_id": 0,
                "nro_poliza": 1,
                "estado_cliente": "$cliente.estado",
            } },
        ];
        self.aggregate_rows(EntityKind::Policy, pipeline).await
    }

    async fn aggregate_rows<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        pipeline: Vec<Document>,
    ) -> Result<Vec<T>, DocError> {
        let cursor = self.collection(kind).aggregate(pipeline).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        docs.into_iter()
            .map(|d| {
                bson::from_document(d).map_err(|e| DocError::Serialization(e.to_string()))
            })
            .collect()
    }
}

/// Cutoff for "within the last year", as a BSON date.
fn one_year_before(now: DateTime<Utc>) -> bson::DateTime {
    let cutoff = now.checked_sub_months(Months::new(12)).unwrap_or(now);
    bson::DateTime::from_millis(cutoff.timestamp_millis())
}
