//! [`EntityStore`] implementation over the document client.

use async_trait::async_trait;

use polisync_core::{
    Entity, EntityKind, EntityStore, InsertOutcome, Patch, Record, StoreError, StoreKind,
    UpdateOutcome, WriteAck,
};

use crate::client::DocClient;
use crate::mutations::InsertResult;

#[async_trait]
impl EntityStore for DocClient {
    fn kind(&self) -> StoreKind {
        StoreKind::Document
    }

    async fn find(&self, kind: EntityKind, key: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.find_document(kind, key).await?)
    }

    async fn insert(&self, entity: &Entity) -> Result<InsertOutcome, StoreError> {
        match self.insert_entity(entity).await? {
            InsertResult::Inserted => {
                tracing::debug!(kind = %entity.kind(), key = entity.key(), "Document inserted");
                Ok(InsertOutcome::Inserted(WriteAck::new(
                    StoreKind::Document,
                    entity.key(),
                    1,
                )))
            }
            InsertResult::Duplicate => Ok(InsertOutcome::Conflict),
        }
    }

    async fn update(
        &self,
        kind: EntityKind,
        key: &str,
        patch: &Patch,
    ) -> Result<UpdateOutcome, StoreError> {
        let matched = self.set_fields(kind, key, patch).await?;
        if matched == 0 {
            return Ok(UpdateOutcome::NotFound);
        }
        Ok(UpdateOutcome::Updated(WriteAck::new(
            StoreKind::Document,
            key,
            matched,
        )))
    }

    async fn delete(&self, kind: EntityKind, key: &str) -> Result<u64, StoreError> {
        Ok(self.delete_by_key(kind, key).await?)
    }

    async fn policies_for_client(&self, client_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.policy_numbers_for_client(client_id).await?)
    }

    async fn claims_for_policy(&self, policy_number: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.claim_ids_for_policy(policy_number).await?)
    }
}
