use std::path::Path;

use gitbrain_core::repository::RepositoryError;
use gitbrain_core::status::StateTransitionError;
use gitbrain_core::validation::ValidationError;
use gitbrain_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Mailbox entry is locked: {0}")]
    Locked(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Message not found: {0}")]
    NotFound(String),

    #[error("Concurrent status change on {0}")]
    Conflict(String),

    #[error(transparent)]
    Transition(#[from] StateTransitionError),
}

impl TransportError {
    pub(crate) fn write(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::WriteFailed(format!("{}: {err}", path.display()))
    }

    pub(crate) fn read(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::ReadFailed(format!("{}: {err}", path.display()))
    }
}

impl From<CoreError> for TransportError {
    fn from(err: CoreError) -> Self {
        TransportError::InvalidFormat(err.to_string())
    }
}

impl From<RepositoryError> for TransportError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => TransportError::NotFound(id),
            RepositoryError::Serialization(e) => TransportError::InvalidFormat(e.to_string()),
            other => TransportError::ReadFailed(other.to_string()),
        }
    }
}

/// Errors surfaced by the [`crate::Mailbox`] send/receive pipeline.
#[derive(Error, Debug)]
pub enum MailboxError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
