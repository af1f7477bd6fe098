//! Write operations for the document store.
//!
//! Inserts check the business key first and also rely on a unique index,
//! so a concurrent duplicate still surfaces as a conflict.

use mongodb::bson::{self, doc, Document};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;

use polisync_core::{Entity, EntityKind, Patch};

use crate::client::{key_filter, DocClient, DocError};

/// Outcome of an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    Inserted,
    Duplicate,
}

impl DocClient {
    // ── Schema ───────────────────────────────────────────────────

    /// Create a unique index on the business key of every collection.
    pub async fn ensure_indexes(&self) -> Result<(), DocError> {
        for kind in [
            EntityKind::Client,
            EntityKind::Policy,
            EntityKind::Claim,
            EntityKind::Agent,
            EntityKind::Vehicle,
        ] {
            let mut keys = Document::new();
            keys.insert(kind.key_field(), 1);
            let model = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.collection(kind).create_index(model).await?;
        }
        tracing::info!("Document unique indexes ensured");
        Ok(())
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Insert an entity as a document in its collection.
    pub async fn insert_entity(&self, entity: &Entity) -> Result<InsertResult, DocError> {
        let kind = entity.kind();
        let coll = self.collection(kind);

        if coll.find_one(key_filter(kind, entity.key())).await?.is_some() {
            return Ok(InsertResult::Duplicate);
        }

        let document = bson::to_document(&entity.to_fields())
            .map_err(|e| DocError::Serialization(e.to_string()))?;

        match coll.insert_one(document).await {
            Ok(_) => Ok(InsertResult::Inserted),
            Err(e) => {
                let err = DocError::from(e);
                if err.is_duplicate_key() {
                    Ok(InsertResult::Duplicate)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// `$set` the patch fields on the document with this key.
    /// Returns the matched count.
    pub async fn set_fields(
        &self,
        kind: EntityKind,
        key: &str,
        patch: &Patch,
    ) -> Result<u64, DocError> {
        let mut fields = bson::to_document(patch.as_map())
            .map_err(|e| DocError::Serialization(e.to_string()))?;
        fields.remove(kind.key_field());
        if fields.is_empty() {
            let found = self.collection(kind).find_one(key_filter(kind, key)).await?;
            return Ok(u64::from(found.is_some()));
        }

        let result = self
            .collection(kind)
            .update_one(key_filter(kind, key), doc! { "$set": fields })
            .await?;

        Ok(result.matched_count)
    }

    /// Delete every document with this key. Returns the deleted count.
    pub async fn delete_by_key(&self, kind: EntityKind, key: &str) -> Result<u64, DocError> {
        let result = self
            .collection(kind)
            .delete_many(key_filter(kind, key))
            .await?;
        Ok(result.deleted_count)
    }
}
