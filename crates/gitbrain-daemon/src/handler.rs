use async_trait::async_trait;
use gitbrain_core::model::{
    CodeMessage, FeedbackMessage, HeartbeatMessage, Payload, ReviewMessage, ScoreMessage,
    TaskMessage,
};

/// Per-kind callbacks invoked by the poll loop. Every method defaults to a
/// no-op, so handlers implement only the kinds they care about.
///
/// A callback error is routed to [`MessageHandler::on_error`] and the
/// message stays unacknowledged; it never stops the loop.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_task_received(&self, _task: TaskMessage) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_review_received(&self, _review: ReviewMessage) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_code_received(&self, _code: CodeMessage) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_score_received(&self, _score: ScoreMessage) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_feedback_received(&self, _feedback: FeedbackMessage) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_heartbeat_received(&self, _heartbeat: HeartbeatMessage) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_error(&self, _error: &anyhow::Error) {}
}

pub(crate) async fn dispatch(handler: &dyn MessageHandler, payload: Payload) -> anyhow::Result<()> {
    match payload {
        Payload::Task(m) => handler.on_task_received(m).await,
        Payload::Review(m) => handler.on_review_received(m).await,
        Payload::Code(m) => handler.on_code_received(m).await,
        Payload::Score(m) => handler.on_score_received(m).await,
        Payload::Feedback(m) => handler.on_feedback_received(m).await,
        Payload::Heartbeat(m) => handler.on_heartbeat_received(m).await,
    }
}
