//! Read operations for the document store.

use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use serde_json::Value;

use polisync_core::{EntityKind, Record};

use crate::client::{key_filter, DocClient, DocError};

impl DocClient {
    /// Find a document by kind and business key.
    pub async fn find_document(
        &self,
        kind: EntityKind,
        key: &str,
    ) -> Result<Option<Record>, DocError> {
        let found = self.collection(kind).find_one(key_filter(kind, key)).await?;
        Ok(found.map(|d| document_to_record(d, kind)))
    }

    /// Count documents of a given kind.
    pub async fn count_documents(&self, kind: EntityKind) -> Result<u64, DocError> {
        Ok(self.collection(kind).count_documents(doc! {}).await?)
    }

    /// Policy numbers whose `id_cliente` matches.
    pub async fn policy_numbers_for_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<String>, DocError> {
        self.collect_keys(EntityKind::Policy, doc! { "id_cliente": client_id })
            .await
    }

    /// Claim ids whose `nro_poliza` matches.
    pub async fn claim_ids_for_policy(&self, policy_number: &str) -> Result<Vec<String>, DocError> {
        self.collect_keys(EntityKind::Claim, doc! { "nro_poliza": policy_number })
            .await
    }

    async fn collect_keys(
        &self,
        kind: EntityKind,
        filter: Document,
    ) -> Result<Vec<String>, DocError> {
        let cursor = self.collection(kind).find(filter).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs
            .iter()
            .filter_map(|d| d.get_str(kind.key_field()).ok().map(str::to_string))
            .collect())
    }
}

/// Convert a stored document to our lightweight Record, dropping `_id`.
fn document_to_record(mut document: Document, kind: EntityKind) -> Record {
    document.remove("_id");
    let key = document
        .get_str(kind.key_field())
        .map(str::to_string)
        .unwrap_or_default();

    let fields = match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };

    Record { kind, key, fields }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_drops_object_id() {
        let document = doc! {
            "_id": mongodb::bson::oid::ObjectId::new(),
            "id_cliente": "CLI-1",
            "nombre": "Ana",
        };
        let record = document_to_record(document, EntityKind::Client);
        assert_eq!(record.key, "CLI-1");
        assert!(record.fields.get("_id").is_none());
        assert_eq!(record.fields.get("nombre").and_then(|v| v.as_str()), Some("Ana"));
    }
}
