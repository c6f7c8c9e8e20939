use std::collections::HashMap;

use async_trait::async_trait;
use gitbrain_core::model::{MessageId, MessageKind};
use gitbrain_core::repository::{RepositoryError, RepositoryResult};
use gitbrain_core::status::KindStatus;
use tokio::sync::RwLock;

use super::record::{MessageCacheRepository, MessageRecord};

#[derive(Debug, Default)]
pub struct InMemoryMessageCache {
    records: RwLock<HashMap<MessageId, MessageRecord>>,
}

impl InMemoryMessageCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageCacheRepository for InMemoryMessageCache {
    async fn insert(&self, record: MessageRecord) -> RepositoryResult<()> {
        let mut records = self.records.write().await;
        let id = record.id();
        if records.contains_key(&id) {
            return Err(RepositoryError::AlreadyExists(id.to_string()));
        }
        records.insert(id, record);
        Ok(())
    }

    async fn get(&self, id: MessageId) -> RepositoryResult<Option<MessageRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(
        &self,
        to: Option<&str>,
        kind: Option<MessageKind>,
    ) -> RepositoryResult<Vec<MessageRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| to.map_or(true, |to| r.message.to() == to))
            .filter(|r| kind.map_or(true, |k| r.kind() == k))
            .cloned()
            .collect())
    }

    async fn compare_and_set(
        &self,
        record: MessageRecord,
        expected: Option<KindStatus>,
    ) -> RepositoryResult<bool> {
        let mut records = self.records.write().await;
        let id = record.id();
        match records.get(&id) {
            None => Err(RepositoryError::NotFound(id.to_string())),
            Some(current) if current.status() != expected => Ok(false),
            Some(_) => {
                records.insert(id, record);
                Ok(true)
            }
        }
    }

    async fn delete(&self, id: MessageId) -> RepositoryResult<bool> {
        Ok(self.records.write().await.remove(&id).is_some())
    }

    async fn delete_for(&self, to: &str) -> RepositoryResult<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| r.message.to() != to);
        Ok(before - records.len())
    }
}
