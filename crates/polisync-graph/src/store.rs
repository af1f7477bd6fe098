//! [`EntityStore`] implementation over the graph client.

use async_trait::async_trait;

use polisync_core::{
    Entity, EntityKind, EntityStore, InsertOutcome, Patch, Record, StoreError, StoreKind,
    UpdateOutcome, WriteAck,
};

use crate::client::GraphClient;
use crate::mutations::CreateResult;

#[async_trait]
impl EntityStore for GraphClient {
    fn kind(&self) -> StoreKind {
        StoreKind::Graph
    }

    async fn find(&self, kind: EntityKind, key: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.find_node(kind, key).await?)
    }

    async fn insert(&self, entity: &Entity) -> Result<InsertOutcome, StoreError> {
        match self.create_entity(entity).await? {
            CreateResult::Created => {
                tracing::debug!(kind = %entity.kind(), key = entity.key(), "Graph node created");
                Ok(InsertOutcome::Inserted(WriteAck::new(
                    StoreKind::Graph,
                    entity.key(),
                    1,
                )))
            }
            CreateResult::Conflict => Ok(InsertOutcome::Conflict),
        }
    }

    async fn update(
        &self,
        kind: EntityKind,
        key: &str,
        patch: &Patch,
    ) -> Result<UpdateOutcome, StoreError> {
        let matched = self.merge_properties(kind, key, patch).await?;
        if matched == 0 {
            return Ok(UpdateOutcome::NotFound);
        }
        Ok(UpdateOutcome::Updated(WriteAck::new(
            StoreKind::Graph,
            key,
            matched as u64,
        )))
    }

    async fn delete(&self, kind: EntityKind, key: &str) -> Result<u64, StoreError> {
        let removed = self.delete_node(kind, key).await?;
        Ok(removed.max(0) as u64)
    }

    async fn policies_for_client(&self, client_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.policy_ids_for_client(client_id).await?)
    }

    async fn claims_for_policy(&self, policy_number: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.claim_ids_for_policy(policy_number).await?)
    }
}
