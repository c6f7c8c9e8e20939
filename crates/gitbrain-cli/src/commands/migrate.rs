use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use gitbrain_core::repository::file::{FileBrainStateRepository, FileKnowledgeRepository};
use gitbrain_migrate::{DataMigration, LogProgress, RetryPolicy};

use super::session::runtime;
use crate::output::format::{format_migration_result, format_report};
use crate::output::OutputFormat;

#[derive(Args)]
pub struct MigrateArgs {
    /// GitBrain home to copy from
    #[arg(long)]
    pub from: PathBuf,

    /// GitBrain home to copy into
    #[arg(long)]
    pub to: PathBuf,

    /// Retries per item for transient failures
    #[arg(long, default_value_t = 5)]
    pub max_retries: u32,

    /// Restore the target to its prior contents if any item fails
    #[arg(long)]
    pub rollback_on_failure: bool,
}

pub fn run(args: &MigrateArgs, format: OutputFormat) -> Result<()> {
    if !args.from.is_dir() {
        anyhow::bail!("Source {} does not exist", args.from.display());
    }
    let source_knowledge = FileKnowledgeRepository::new(&args.from);
    let source_brain = FileBrainStateRepository::new(&args.from);
    let target_knowledge = FileKnowledgeRepository::new(&args.to);
    let target_brain = FileBrainStateRepository::new(&args.to);

    let migration = DataMigration::new(RetryPolicy {
        max_retries: args.max_retries,
        ..RetryPolicy::default()
    })
    .with_progress(Arc::new(LogProgress));

    runtime()?.block_on(async {
        let snapshot = migration
            .create_snapshot(&target_knowledge, &target_brain)
            .await
            .context("Failed to snapshot the target")?;

        let knowledge = migration
            .migrate_knowledge_base(&source_knowledge, &target_knowledge, Some(&snapshot))
            .await
            .context("Knowledge migration failed")?;
        let brain = migration
            .migrate_brain_states(&source_brain, &target_brain, Some(&snapshot))
            .await
            .context("Brain state migration failed")?;

        println!(
            "{}",
            format_migration_result(&knowledge, "Knowledge", format).trim_end()
        );
        println!(
            "{}",
            format_migration_result(&brain, "Brain states", format).trim_end()
        );

        if knowledge.success && brain.success {
            let report = migration
                .validate_migration(&target_knowledge, &target_brain)
                .await
                .context("Failed to validate the target")?;
            println!("{}", format_report(&report, format));
            return Ok(());
        }

        if args.rollback_on_failure {
            let restored = migration
                .rollback(&snapshot, &target_knowledge, &target_brain)
                .await
                .context("Rollback failed")?;
            eprintln!("Rolled back {restored} items from snapshot {}.", snapshot.id());
        }
        anyhow::bail!(
            "{} items failed to migrate",
            knowledge.items_failed + brain.items_failed
        )
    })
}
