use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One of the six message kinds, each with its own payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Task,
    Review,
    Code,
    Score,
    Feedback,
    Heartbeat,
}

impl MessageKind {
    /// Order in which the daemon dispatches a poll batch.
    pub const DISPATCH_ORDER: [MessageKind; 6] = [
        MessageKind::Task,
        MessageKind::Review,
        MessageKind::Code,
        MessageKind::Score,
        MessageKind::Feedback,
        MessageKind::Heartbeat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Task => "task",
            MessageKind::Review => "review",
            MessageKind::Code => "code",
            MessageKind::Score => "score",
            MessageKind::Feedback => "feedback",
            MessageKind::Heartbeat => "heartbeat",
        }
    }

    /// Heartbeats carry no status and are never transitioned.
    pub fn has_status(&self) -> bool {
        !matches!(self, MessageKind::Heartbeat)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::DISPATCH_ORDER
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::Config(format!("unknown message kind: {s}")))
    }
}
