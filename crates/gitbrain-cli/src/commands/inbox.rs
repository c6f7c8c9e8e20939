use anyhow::{Context, Result};
use clap::Args;

use super::session::{runtime, Overrides, Session};
use crate::output::format::format_message_list;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct InboxArgs {
    /// Acknowledge each listed message so it is not delivered again
    #[arg(long)]
    pub ack: bool,

    /// Show at most this many messages
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn run(args: &InboxArgs, overrides: &Overrides, format: OutputFormat) -> Result<()> {
    let session = Session::discover(overrides)?;
    let messages = runtime()?.block_on(async {
        let mailbox = session.mailbox().await?;
        let mut messages = mailbox.receive().await.context("Failed to read inbox")?;
        if let Some(limit) = args.limit {
            messages.truncate(limit);
        }
        if args.ack {
            for message in &messages {
                mailbox
                    .acknowledge(message)
                    .await
                    .with_context(|| format!("Failed to acknowledge {}", message.id()))?;
            }
        }
        anyhow::Ok(messages)
    })?;

    println!("{}", format_message_list(&messages, format));
    Ok(())
}
