//! Status-tracking mailbox over a record store. Messages stay in the store
//! and move through their kind's lifecycle instead of being consumed.

pub mod memory;
pub mod record;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gitbrain_core::model::{Message, MessageId, MessageKind};
use gitbrain_core::status::KindStatus;

pub use self::memory::InMemoryMessageCache;
pub use self::record::{MessageCacheRepository, MessageRecord};
use crate::error::TransportError;
use crate::transport::{role_segment, MailboxTransport, MessageLocation};

#[derive(Clone)]
pub struct CacheMailbox {
    store: Arc<dyn MessageCacheRepository>,
}

impl CacheMailbox {
    pub fn new(store: Arc<dyn MessageCacheRepository>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryMessageCache::new()))
    }

    /// Records for `role`, newest first, optionally narrowed by kind and status.
    pub async fn receive_filtered(
        &self,
        role: &str,
        kind: Option<MessageKind>,
        status: Option<KindStatus>,
    ) -> Result<Vec<MessageRecord>, TransportError> {
        let mut records = self.store.list(Some(role_segment(role)?), kind).await?;
        if let Some(status) = status {
            records.retain(|r| r.status() == Some(status));
        }
        records.sort_by(|a, b| {
            b.message
                .timestamp()
                .cmp(&a.message.timestamp())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(records)
    }

    pub async fn get(&self, id: MessageId) -> Result<Option<MessageRecord>, TransportError> {
        Ok(self.store.get(id).await?)
    }

    /// Move a message to `to` along its kind's transition table.
    pub async fn update_status(
        &self,
        id: MessageId,
        to: KindStatus,
    ) -> Result<MessageRecord, TransportError> {
        let mut record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| TransportError::NotFound(id.to_string()))?;
        let expected = record.status();
        record.payload.transition(to)?;
        record.updated_at = Utc::now();
        if !self.store.compare_and_set(record.clone(), expected).await? {
            return Err(TransportError::Conflict(id.to_string()));
        }
        tracing::debug!("Message {id} is now {to}");
        Ok(record)
    }

    /// Delete records for `role` that reached the end of their lifecycle.
    /// Returns how many.
    pub async fn purge_archived(&self, role: &str) -> Result<usize, TransportError> {
        let mut purged = 0;
        for record in self.store.list(Some(role_segment(role)?), None).await? {
            if record.status().is_some_and(|s| s.is_purgeable())
                && self.store.delete(record.id()).await?
            {
                purged += 1;
            }
        }
        if purged > 0 {
            tracing::info!("Purged {purged} archived messages for {role}");
        }
        Ok(purged)
    }

    async fn pending(&self, role: &str) -> Result<Vec<MessageRecord>, TransportError> {
        let mut records = self.store.list(Some(role_segment(role)?), None).await?;
        records.retain(|r| r.status().map_or(true, |s| s.is_pending()));
        records.sort_by(|a, b| {
            a.message
                .timestamp()
                .cmp(&b.message.timestamp())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(records)
    }
}

#[async_trait]
impl MailboxTransport for CacheMailbox {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn send(&self, message: &Message, to: &str) -> Result<MessageLocation, TransportError> {
        if message.to() != role_segment(to)? {
            return Err(TransportError::InvalidFormat(format!(
                "message {} is addressed to {}, not {to}",
                message.id(),
                message.to()
            )));
        }
        let record = MessageRecord::pending(message.clone())?;
        let id = record.id();
        self.store.insert(record).await?;
        Ok(MessageLocation::Record(id))
    }

    /// Pending messages for `role`, oldest first. Heartbeats count as pending
    /// until acknowledged.
    async fn receive(&self, role: &str) -> Result<Vec<Message>, TransportError> {
        Ok(self
            .pending(role)
            .await?
            .iter()
            .map(MessageRecord::to_message)
            .collect())
    }

    async fn clear(&self, role: &str) -> Result<usize, TransportError> {
        Ok(self.store.delete_for(role_segment(role)?).await?)
    }

    async fn count(&self, role: &str) -> Result<usize, TransportError> {
        Ok(self.pending(role).await?.len())
    }

    /// Heartbeats are deleted; other kinds take their receipt transition
    /// (task to in_progress, feedback to read, ...). Already-advanced
    /// records are left alone.
    async fn acknowledge(&self, _role: &str, message: &Message) -> Result<(), TransportError> {
        let Some(record) = self.store.get(message.id()).await? else {
            return Ok(());
        };
        match record.status() {
            None => {
                self.store.delete(record.id()).await?;
            }
            Some(status) if status.is_pending() => {
                if let Some(receipt) = KindStatus::receipt(record.kind()) {
                    self.update_status(record.id(), receipt).await?;
                }
            }
            Some(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gitbrain_core::model::{
        FeedbackMessage, FeedbackType, HeartbeatMessage, HeartbeatStatus, Payload, Priority,
        TaskMessage, TaskType,
    };
    use gitbrain_core::status::{FeedbackStatus, StateTransitionError, TaskStatus};

    fn task(id: &str) -> Payload {
        Payload::Task(TaskMessage {
            task_id: id.into(),
            title: format!("Task {id}"),
            description: "do it".into(),
            task_type: TaskType::Coding,
            files: None,
            deadline: None,
            // Senders cannot pre-advance a message; the cache resets this.
            status: TaskStatus::Completed,
        })
    }

    fn envelope(payload: &Payload, offset_ms: i64) -> Message {
        Message::from_payload("overseer", "coder", payload, Priority::Normal)
            .unwrap()
            .with_timestamp(Utc::now() + Duration::milliseconds(offset_ms))
    }

    #[tokio::test]
    async fn test_send_stores_pending() {
        let mailbox = CacheMailbox::in_memory();
        let msg = envelope(&task("t1"), 0);
        let MessageLocation::Record(id) = mailbox.send(&msg, "coder").await.unwrap() else {
            panic!("expected a record");
        };
        let record = mailbox.get(id).await.unwrap().unwrap();
        assert_eq!(record.status(), Some(KindStatus::Task(TaskStatus::Pending)));

        let received = mailbox.receive("coder").await.unwrap();
        assert_eq!(received[0].content().get("status").unwrap().as_str(), Some("pending"));
    }

    #[tokio::test]
    async fn test_update_status_follows_table() {
        let mailbox = CacheMailbox::in_memory();
        let msg = envelope(&task("t1"), 0);
        mailbox.send(&msg, "coder").await.unwrap();

        mailbox
            .update_status(msg.id(), TaskStatus::InProgress.into())
            .await
            .unwrap();
        let err = mailbox
            .update_status(msg.id(), TaskStatus::Pending.into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Transition(StateTransitionError::InvalidTransition { .. })
        ));
        let record = mailbox
            .update_status(msg.id(), TaskStatus::Completed.into())
            .await
            .unwrap();
        assert_eq!(record.status(), Some(TaskStatus::Completed.into()));
    }

    #[tokio::test]
    async fn test_update_status_unknown_id() {
        let mailbox = CacheMailbox::in_memory();
        assert!(matches!(
            mailbox
                .update_status(MessageId::new(), TaskStatus::InProgress.into())
                .await,
            Err(TransportError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_acknowledge_applies_receipt_and_leaves_pending_set() {
        let mailbox = CacheMailbox::in_memory();
        let feedback = Payload::Feedback(FeedbackMessage {
            feedback_type: FeedbackType::Question,
            subject: "s".into(),
            content: "c".into(),
            related_task_id: None,
            response: None,
            status: FeedbackStatus::Pending,
        });
        let a = envelope(&task("t1"), 0);
        let b = envelope(&feedback, 1);
        mailbox.send(&a, "coder").await.unwrap();
        mailbox.send(&b, "coder").await.unwrap();
        assert_eq!(mailbox.count("coder").await.unwrap(), 2);

        for msg in mailbox.receive("coder").await.unwrap() {
            mailbox.acknowledge("coder", &msg).await.unwrap();
        }
        assert_eq!(mailbox.count("coder").await.unwrap(), 0);
        assert_eq!(
            mailbox.get(a.id()).await.unwrap().unwrap().status(),
            Some(TaskStatus::InProgress.into())
        );
        assert_eq!(
            mailbox.get(b.id()).await.unwrap().unwrap().status(),
            Some(FeedbackStatus::Read.into())
        );

        // Acknowledging twice is harmless.
        mailbox.acknowledge("coder", &a).await.unwrap();
    }

    #[tokio::test]
    async fn test_heartbeat_deleted_on_acknowledge() {
        let mailbox = CacheMailbox::in_memory();
        let hb = envelope(
            &Payload::Heartbeat(HeartbeatMessage {
                status: HeartbeatStatus::Idle,
                current_task: None,
                metadata: None,
            }),
            0,
        );
        mailbox.send(&hb, "coder").await.unwrap();
        assert_eq!(mailbox.count("coder").await.unwrap(), 1);
        mailbox.acknowledge("coder", &hb).await.unwrap();
        assert!(mailbox.get(hb.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_receive_filtered_newest_first() {
        let mailbox = CacheMailbox::in_memory();
        let old = envelope(&task("old"), 0);
        let new = envelope(&task("new"), 10);
        mailbox.send(&old, "coder").await.unwrap();
        mailbox.send(&new, "coder").await.unwrap();
        mailbox
            .update_status(old.id(), TaskStatus::InProgress.into())
            .await
            .unwrap();

        let all = mailbox
            .receive_filtered("coder", Some(MessageKind::Task), None)
            .await
            .unwrap();
        assert_eq!(all[0].id(), new.id());
        assert_eq!(all[1].id(), old.id());

        let pending = mailbox
            .receive_filtered("coder", None, Some(TaskStatus::Pending.into()))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id(), new.id());
    }

    #[tokio::test]
    async fn test_purge_archived_only_removes_archived() {
        let mailbox = CacheMailbox::in_memory();
        let done = envelope(&task("done"), 0);
        let live = envelope(&task("live"), 1);
        mailbox.send(&done, "coder").await.unwrap();
        mailbox.send(&live, "coder").await.unwrap();
        for to in [
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Archived,
        ] {
            mailbox.update_status(done.id(), to.into()).await.unwrap();
        }

        assert_eq!(mailbox.purge_archived("coder").await.unwrap(), 1);
        assert!(mailbox.get(done.id()).await.unwrap().is_none());
        assert!(mailbox.get(live.id()).await.unwrap().is_some());
        assert_eq!(mailbox.clear("coder").await.unwrap(), 1);
    }
}
