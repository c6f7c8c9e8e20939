use gitbrain_core::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Migration source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Rollback failed for {}: {reason}", items.join(", "))]
    RollbackFailed { items: Vec<String>, reason: String },

    #[error("Item not found in snapshot: {0}")]
    ItemNotFoundInSnapshot(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
