use crate::report::{MigrationPhase, MigrationResult};

/// Observer for long-running migrations.
pub trait MigrationProgress: Send + Sync {
    fn progress(&self, phase: MigrationPhase, current: usize, total: usize, message: &str);

    fn error(&self, context: &str, error: &str);

    fn completion(&self, result: &MigrationResult);
}

/// Reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl MigrationProgress for LogProgress {
    fn progress(&self, phase: MigrationPhase, current: usize, total: usize, message: &str) {
        tracing::info!(phase = %phase, current, total, "{message}");
    }

    fn error(&self, context: &str, error: &str) {
        tracing::warn!("{context}: {error}");
    }

    fn completion(&self, result: &MigrationResult) {
        tracing::info!(
            success = result.success,
            migrated = result.items_migrated,
            failed = result.items_failed,
            "Migration finished in {:.2}s",
            result.duration.as_secs_f64()
        );
    }
}
