use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kind::MessageKind;
use super::payload::Payload;
use super::value::Content;
use crate::error::CoreError;

/// Unique identifier of a message envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::InvalidId(format!("{s}: {e}")))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Delivery priority. Ordered so that `Critical` compares greatest;
/// serialized as 1 (critical) through 4 (low).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn level(self) -> u8 {
        match self {
            Priority::Critical => 1,
            Priority::High => 2,
            Priority::Normal => 3,
            Priority::Low => 4,
        }
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.level()
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Priority::Critical),
            2 => Ok(Priority::High),
            3 => Ok(Priority::Normal),
            4 => Ok(Priority::Low),
            other => Err(format!("priority must be 1..=4, got {other}")),
        }
    }
}

/// Envelope-level delivery state, independent of the payload's own status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Unread,
    Read,
    Processed,
    Sent,
    Delivered,
}

/// A message exchanged between two roles.
///
/// Everything but `status` is fixed at construction; receive-side plugins
/// produce a new envelope through [`Message::with_content`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    from: String,
    to: String,
    timestamp: DateTime<Utc>,
    content: Content,
    #[serde(default)]
    status: DeliveryStatus,
    #[serde(default)]
    priority: Priority,
}

impl Message {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        content: Content,
        priority: Priority,
    ) -> Self {
        Self {
            id: MessageId::new(),
            from: from.into(),
            to: to.into(),
            timestamp: Utc::now(),
            content,
            status: DeliveryStatus::Unread,
            priority,
        }
    }

    pub fn from_payload(
        from: impl Into<String>,
        to: impl Into<String>,
        payload: &Payload,
        priority: Priority,
    ) -> Result<Self, CoreError> {
        Ok(Self::new(from, to, payload.to_content()?, priority))
    }

    /// Override the creation time, for replayed or imported messages.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Same envelope, rewritten content.
    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn set_status(&mut self, status: DeliveryStatus) {
        self.status = status;
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Kind named by the content's `"type"` tag, if it is a known one.
    pub fn kind(&self) -> Option<MessageKind> {
        self.content.message_type().and_then(|t| t.parse().ok())
    }

    pub fn payload(&self) -> Result<Payload, CoreError> {
        Payload::from_content(&self.content)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(data)?)
    }
}
