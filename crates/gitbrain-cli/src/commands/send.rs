use std::io::Read;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use gitbrain_core::model::{Content, Priority};

use super::session::{runtime, Overrides, Session};
use crate::output::OutputFormat;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Critical,
    High,
    Normal,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(p: PriorityArg) -> Self {
        match p {
            PriorityArg::Critical => Priority::Critical,
            PriorityArg::High => Priority::High,
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::Low => Priority::Low,
        }
    }
}

#[derive(Args)]
pub struct SendArgs {
    /// Message content as a JSON object with a "type" field, or `-` to read stdin
    pub content: String,

    /// Recipient role (defaults to the configured peer)
    #[arg(long)]
    pub to: Option<String>,

    #[arg(long, value_enum, default_value = "normal")]
    pub priority: PriorityArg,
}

pub fn run(args: &SendArgs, overrides: &Overrides, format: OutputFormat) -> Result<()> {
    let session = Session::discover(overrides)?;
    let raw = if args.content == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read message content from stdin")?;
        buf
    } else {
        args.content.clone()
    };
    let content: Content =
        serde_json::from_str(&raw).context("Message content must be a JSON object")?;
    let to = args.to.as_deref().unwrap_or(&session.config.peer);

    let delivery = runtime()?.block_on(async {
        let mailbox = session.mailbox().await?;
        mailbox
            .send_content(to, content, args.priority.into())
            .await
            .context("Failed to send message")
    })?;

    match format {
        OutputFormat::Json => {
            let sent = serde_json::json!({
                "id": delivery.message.id().to_string(),
                "to": to,
                "location": delivery.location.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&sent)?);
        }
        OutputFormat::Text => {
            println!("Sent {} to {to} ({})", delivery.message.id(), delivery.location);
        }
    }
    Ok(())
}
