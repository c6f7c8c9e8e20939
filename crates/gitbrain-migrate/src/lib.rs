//! Moves knowledge items and brain states between repositories one item at
//! a time, retrying transient failures and recording permanent ones, with
//! snapshot-based rollback.

pub mod engine;
pub mod error;
pub mod progress;
pub mod report;
pub mod retry;
pub mod snapshot;

pub use engine::DataMigration;
pub use error::MigrationError;
pub use progress::{LogProgress, MigrationProgress};
pub use report::{MigrationFailure, MigrationPhase, MigrationReport, MigrationResult};
pub use retry::{is_transient_error, RetryPolicy};
pub use snapshot::MigrationSnapshot;
