use gitbrain_core::repository::RepositoryError;
use gitbrain_mailbox::MailboxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Daemon is already running")]
    AlreadyRunning,

    #[error("Daemon is not running")]
    NotRunning,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<MailboxError> for DaemonError {
    fn from(err: MailboxError) -> Self {
        DaemonError::DatabaseError(err.to_string())
    }
}

impl From<RepositoryError> for DaemonError {
    fn from(err: RepositoryError) -> Self {
        DaemonError::DatabaseError(err.to_string())
    }
}
