use anyhow::{Context, Result};

use super::session::{runtime, Overrides, Session};
use crate::output::OutputFormat;

pub fn run(overrides: &Overrides, format: OutputFormat) -> Result<()> {
    let session = Session::discover(overrides)?;
    let count = runtime()?.block_on(async {
        let mailbox = session.mailbox().await?;
        mailbox.count().await.context("Failed to count messages")
    })?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "role": session.config.role.as_str(), "count": count })
        ),
        OutputFormat::Text => println!("{count}"),
    }
    Ok(())
}
