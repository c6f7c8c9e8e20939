use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use gitbrain_core::repository::file::{FileBrainStateRepository, FileKnowledgeRepository};
use gitbrain_migrate::DataMigration;

use super::session::{runtime, Overrides, Session};
use crate::output::format::format_report;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct ValidateArgs {
    /// GitBrain home to inspect (defaults to this repository's)
    #[arg(long)]
    pub home: Option<PathBuf>,
}

pub fn run(args: &ValidateArgs, overrides: &Overrides, format: OutputFormat) -> Result<()> {
    let home = match &args.home {
        Some(home) => home.clone(),
        None => Session::discover(overrides)?.home(),
    };
    let knowledge = FileKnowledgeRepository::new(&home);
    let brain = FileBrainStateRepository::new(&home);

    let report = runtime()?
        .block_on(DataMigration::default().validate_migration(&knowledge, &brain))
        .with_context(|| format!("Failed to read {}", home.display()))?;
    println!("{}", format_report(&report, format));
    Ok(())
}
