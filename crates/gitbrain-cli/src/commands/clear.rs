use anyhow::{Context, Result};

use super::session::{runtime, Overrides, Session};

pub fn run(overrides: &Overrides) -> Result<()> {
    let session = Session::discover(overrides)?;
    let cleared = runtime()?.block_on(async {
        let mailbox = session.mailbox().await?;
        mailbox.clear().await.context("Failed to clear mailbox")
    })?;
    println!("Cleared {cleared} messages for {}.", session.config.role);
    Ok(())
}
