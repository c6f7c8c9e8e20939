use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use gitbrain_core::model::{Message, MessageId};

use crate::error::TransportError;

/// Where a sent message ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLocation {
    Path(PathBuf),
    Record(MessageId),
    Issue(u64),
}

impl fmt::Display for MessageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageLocation::Path(p) => write!(f, "{}", p.display()),
            MessageLocation::Record(id) => write!(f, "record {id}"),
            MessageLocation::Issue(n) => write!(f, "issue #{n}"),
        }
    }
}

/// A delivery backend between named roles.
///
/// `receive` returns messages oldest first. Messages stay deliverable until
/// `acknowledge` is called for them, for backends that keep them around;
/// backends that consume on receive treat `acknowledge` as a no-op.
#[async_trait]
pub trait MailboxTransport: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    async fn send(&self, message: &Message, to: &str) -> Result<MessageLocation, TransportError>;

    async fn receive(&self, role: &str) -> Result<Vec<Message>, TransportError>;

    /// Remove everything addressed to `role`. Returns how many were removed.
    async fn clear(&self, role: &str) -> Result<usize, TransportError>;

    /// Messages currently waiting for `role`.
    async fn count(&self, role: &str) -> Result<usize, TransportError>;

    /// Mark a received message as handled.
    async fn acknowledge(&self, _role: &str, _message: &Message) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Reject role names that would escape the mailbox root.
pub(crate) fn role_segment(role: &str) -> Result<&str, TransportError> {
    if role.is_empty() || role == "." || role == ".." || role.contains(['/', '\\', '\0']) {
        return Err(TransportError::InvalidFormat(format!(
            "invalid role name: {role:?}"
        )));
    }
    Ok(role)
}

/// Stable delivery order: oldest first, ties broken by `tiebreak`.
pub(crate) fn sort_oldest_first<T>(items: &mut [(Message, T)])
where
    T: Ord,
{
    items.sort_by(|(a, ka), (b, kb)| a.timestamp().cmp(&b.timestamp()).then_with(|| ka.cmp(kb)));
}
