use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use gitbrain_core::model::{
    CodeMessage, FeedbackMessage, HeartbeatMessage, ReviewMessage, ScoreMessage, TaskMessage,
};
use gitbrain_core::repository::file::FileBrainStateRepository;
use gitbrain_core::BrainStateManager;
use gitbrain_daemon::{Daemon, DaemonConfig, MessageHandler};

use super::session::{runtime, Overrides, Session};

#[derive(Args)]
pub struct DaemonArgs {
    /// Run a single poll tick and exit
    #[arg(long)]
    pub once: bool,

    /// Do not send heartbeats to the peer
    #[arg(long)]
    pub no_heartbeat: bool,

    /// Only send heartbeats; leave incoming messages untouched
    #[arg(long, conflicts_with = "no_heartbeat")]
    pub heartbeat_only: bool,
}

/// Prints one line per delivered message.
struct ConsoleHandler;

#[async_trait]
impl MessageHandler for ConsoleHandler {
    async fn on_task_received(&self, task: TaskMessage) -> anyhow::Result<()> {
        println!("task     {} [{}] {}", task.task_id, task.task_type, task.title);
        Ok(())
    }

    async fn on_review_received(&self, review: ReviewMessage) -> anyhow::Result<()> {
        let verdict = if review.approved { "approved" } else { "changes requested" };
        println!("review   {} {verdict} by {}", review.task_id, review.reviewer);
        Ok(())
    }

    async fn on_code_received(&self, code: CodeMessage) -> anyhow::Result<()> {
        println!("code     {} {} ({} files)", code.code_id, code.title, code.files.len());
        Ok(())
    }

    async fn on_score_received(&self, score: ScoreMessage) -> anyhow::Result<()> {
        println!("score    {} requested {}", score.task_id, score.requested_score);
        Ok(())
    }

    async fn on_feedback_received(&self, feedback: FeedbackMessage) -> anyhow::Result<()> {
        println!("feedback [{}] {}", feedback.feedback_type, feedback.subject);
        Ok(())
    }

    async fn on_heartbeat_received(&self, heartbeat: HeartbeatMessage) -> anyhow::Result<()> {
        let task = heartbeat.current_task.as_deref().unwrap_or("-");
        println!("heartbeat {} task={task}", heartbeat.status);
        Ok(())
    }

    async fn on_error(&self, error: &anyhow::Error) {
        eprintln!("error: {error:#}");
    }
}

pub fn run(args: &DaemonArgs, overrides: &Overrides) -> Result<()> {
    let session = Session::discover(overrides)?;
    let home = session.home();

    let mut config = DaemonConfig::from(&session.config)
        .with_lock_file(home.join(format!("daemon-{}.lock", session.config.ai_name)));
    config.auto_heartbeat = !args.no_heartbeat;
    config.process_messages = !args.heartbeat_only;
    let brain = BrainStateManager::new(Arc::new(FileBrainStateRepository::new(&home)));

    runtime()?.block_on(async {
        let mailbox = session.mailbox().await?;
        let daemon = Daemon::new(config, mailbox, Arc::new(ConsoleHandler)).with_brain_state(brain);

        if args.once {
            let summary = daemon.poll_once().await;
            println!(
                "Dispatched {} messages ({} failed).",
                summary.dispatched, summary.failed
            );
            return Ok(());
        }

        daemon.start().await.context("Failed to start daemon")?;
        let status = daemon.status().await;
        eprintln!(
            "GitBrain daemon running as {} ({}); press Ctrl-C to stop.",
            status.ai_name, status.role
        );
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        daemon.stop().await.context("Failed to stop daemon")?;
        anyhow::Ok(())
    })
}
