use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gitbrain_core::model::{Message, MessageId, MessageKind, Payload, Value};
use gitbrain_core::repository::RepositoryResult;
use gitbrain_core::status::KindStatus;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// A stored message with its decoded, status-bearing payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message: Message,
    pub payload: Payload,
    pub updated_at: DateTime<Utc>,
}

impl MessageRecord {
    /// Decode `message` and reset its payload to the kind's initial status.
    pub fn pending(message: Message) -> Result<Self, TransportError> {
        let mut payload = message.payload()?;
        payload.reset_status();
        Ok(Self {
            message,
            payload,
            updated_at: Utc::now(),
        })
    }

    pub fn id(&self) -> MessageId {
        self.message.id()
    }

    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    pub fn status(&self) -> Option<KindStatus> {
        self.payload.status()
    }

    /// The envelope as delivered, with `content.status` reflecting the
    /// record's current status.
    pub fn to_message(&self) -> Message {
        let mut content = self.message.content().clone();
        if let Some(status) = self.status() {
            content.insert("status", Value::from(status.as_str()));
        }
        self.message.clone().with_content(content)
    }
}

/// Storage port for cached message records.
#[async_trait]
pub trait MessageCacheRepository: Send + Sync {
    async fn insert(&self, record: MessageRecord) -> RepositoryResult<()>;

    async fn get(&self, id: MessageId) -> RepositoryResult<Option<MessageRecord>>;

    /// Records addressed to `to` (all recipients if `None`), optionally of one kind.
    async fn list(
        &self,
        to: Option<&str>,
        kind: Option<MessageKind>,
    ) -> RepositoryResult<Vec<MessageRecord>>;

    /// Replace the stored record only if its status still equals `expected`.
    /// Returns false when another writer got there first.
    async fn compare_and_set(
        &self,
        record: MessageRecord,
        expected: Option<KindStatus>,
    ) -> RepositoryResult<bool>;

    async fn delete(&self, id: MessageId) -> RepositoryResult<bool>;

    /// Delete everything addressed to `to`. Returns how many were removed.
    async fn delete_for(&self, to: &str) -> RepositoryResult<usize>;
}
