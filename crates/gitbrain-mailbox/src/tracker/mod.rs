//! Messages carried as issues in a hosted tracker. Each message is one open
//! issue labelled for its recipient; receiving closes it.

pub mod issue;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use gitbrain_core::model::Message;

pub use self::issue::{Issue, IssueState, IssueTracker};
pub use self::memory::InMemoryTracker;
use crate::error::TransportError;
use crate::transport::{role_segment, sort_oldest_first, MailboxTransport, MessageLocation};

pub const BASE_LABEL: &str = "gitbrain";

pub fn recipient_label(role: &str) -> String {
    format!("{BASE_LABEL}:to:{role}")
}

pub fn kind_label(kind: &str) -> String {
    format!("{BASE_LABEL}:type:{kind}")
}

/// Result of draining a role's open issues.
#[derive(Debug, Default)]
pub struct TrackerDrain {
    pub messages: Vec<Message>,
    /// Issues whose body did not decode. Left open.
    pub undecodable: Vec<u64>,
}

#[derive(Clone)]
pub struct TrackerMailbox {
    tracker: Arc<dyn IssueTracker>,
}

impl TrackerMailbox {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }

    fn inbox_labels(role: &str) -> Result<Vec<String>, TransportError> {
        Ok(vec![BASE_LABEL.to_string(), recipient_label(role_segment(role)?)])
    }

    /// Decode and close every open issue for `role`. A message is returned
    /// only if its issue was closed.
    pub async fn drain(&self, role: &str) -> Result<TrackerDrain, TransportError> {
        let issues = self
            .tracker
            .list_open_issues(&Self::inbox_labels(role)?)
            .await?;
        let mut drain = TrackerDrain::default();
        let mut batch = Vec::new();
        for issue in issues {
            let decoded = issue
                .body
                .as_deref()
                .ok_or_else(|| TransportError::InvalidFormat("empty issue body".into()))
                .and_then(|body| Ok(Message::from_json(body)?));
            let message = match decoded {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("Leaving issue #{} open: {e}", issue.number);
                    drain.undecodable.push(issue.number);
                    continue;
                }
            };
            match self.tracker.close_issue(issue.number).await {
                Ok(()) => batch.push((message, issue.number)),
                Err(e) => tracing::warn!("Skipping issue #{}: close failed: {e}", issue.number),
            }
        }
        sort_oldest_first(&mut batch);
        drain.messages = batch.into_iter().map(|(m, _)| m).collect();
        Ok(drain)
    }
}

#[async_trait]
impl MailboxTransport for TrackerMailbox {
    fn name(&self) -> &'static str {
        "tracker"
    }

    async fn send(&self, message: &Message, to: &str) -> Result<MessageLocation, TransportError> {
        let kind = message
            .kind()
            .map(|k| k.as_str().to_string())
            .or_else(|| message.content().message_type().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        let title = format!("[GitBrain] {kind} from {} to {to}", message.from());
        let mut labels = Self::inbox_labels(to)?;
        labels.push(kind_label(&kind));
        let issue = self
            .tracker
            .create_issue(&title, &message.to_json()?, &labels)
            .await?;
        tracing::debug!("Opened issue #{} for {to}", issue.number);
        Ok(MessageLocation::Issue(issue.number))
    }

    async fn receive(&self, role: &str) -> Result<Vec<Message>, TransportError> {
        Ok(self.drain(role).await?.messages)
    }

    async fn clear(&self, role: &str) -> Result<usize, TransportError> {
        let issues = self
            .tracker
            .list_open_issues(&Self::inbox_labels(role)?)
            .await?;
        let mut closed = 0;
        for issue in issues {
            match self.tracker.close_issue(issue.number).await {
                Ok(()) => closed += 1,
                Err(e) => tracing::warn!("Failed to close issue #{}: {e}", issue.number),
            }
        }
        Ok(closed)
    }

    async fn count(&self, role: &str) -> Result<usize, TransportError> {
        Ok(self
            .tracker
            .list_open_issues(&Self::inbox_labels(role)?)
            .await?
            .len())
    }
}
