use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::MessageKind;
use super::review::ReviewComment;
use super::value::Content;
use crate::error::CoreError;
use crate::status::{
    CodeStatus, FeedbackStatus, KindStatus, ReviewStatus, ScoreStatus, StateTransitionError,
    StatusMachine, TaskStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Coding,
    Review,
    Testing,
    Documentation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Bug,
    Suggestion,
    Question,
    Praise,
    Complaint,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatStatus {
    #[default]
    Active,
    Idle,
    Busy,
    Sleeping,
    Error,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Coding => "coding",
            TaskType::Review => "review",
            TaskType::Testing => "testing",
            TaskType::Documentation => "documentation",
        }
    }
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Bug => "bug",
            FeedbackType::Suggestion => "suggestion",
            FeedbackType::Question => "question",
            FeedbackType::Praise => "praise",
            FeedbackType::Complaint => "complaint",
            FeedbackType::General => "general",
        }
    }
}

impl HeartbeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeartbeatStatus::Active => "active",
            HeartbeatStatus::Idle => "idle",
            HeartbeatStatus::Busy => "busy",
            HeartbeatStatus::Sleeping => "sleeping",
            HeartbeatStatus::Error => "error",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for HeartbeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewMessage {
    pub task_id: String,
    pub approved: bool,
    pub reviewer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<ReviewComment>>,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_reviewed: Option<Vec<String>>,
    #[serde(default)]
    pub status: ReviewStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMessage {
    pub code_id: String,
    pub title: String,
    pub description: String,
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(default)]
    pub status: CodeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMessage {
    pub task_id: String,
    pub requested_score: i64,
    pub justification: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awarded_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    #[serde(default)]
    pub status: ScoreStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackMessage {
    pub feedback_type: FeedbackType,
    pub subject: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default)]
    pub status: FeedbackStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatMessage {
    pub status: HeartbeatStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Content>,
}

/// A typed message body, tagged on the wire by its `"type"` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Task(TaskMessage),
    Review(ReviewMessage),
    Code(CodeMessage),
    Score(ScoreMessage),
    Feedback(FeedbackMessage),
    Heartbeat(HeartbeatMessage),
}

impl Payload {
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::Task(_) => MessageKind::Task,
            Payload::Review(_) => MessageKind::Review,
            Payload::Code(_) => MessageKind::Code,
            Payload::Score(_) => MessageKind::Score,
            Payload::Feedback(_) => MessageKind::Feedback,
            Payload::Heartbeat(_) => MessageKind::Heartbeat,
        }
    }

    /// Current status, `None` for heartbeats.
    pub fn status(&self) -> Option<KindStatus> {
        match self {
            Payload::Task(m) => Some(m.status.into()),
            Payload::Review(m) => Some(m.status.into()),
            Payload::Code(m) => Some(m.status.into()),
            Payload::Score(m) => Some(m.status.into()),
            Payload::Feedback(m) => Some(m.status.into()),
            Payload::Heartbeat(_) => None,
        }
    }

    /// Move the payload's status along its transition table.
    pub fn transition(&mut self, to: KindStatus) -> Result<(), StateTransitionError> {
        let kind = self.kind();
        match (self, to) {
            (Payload::Task(m), KindStatus::Task(s)) => m.status.transition(s),
            (Payload::Review(m), KindStatus::Review(s)) => m.status.transition(s),
            (Payload::Code(m), KindStatus::Code(s)) => m.status.transition(s),
            (Payload::Score(m), KindStatus::Score(s)) => m.status.transition(s),
            (Payload::Feedback(m), KindStatus::Feedback(s)) => m.status.transition(s),
            (_, to) => Err(StateTransitionError::KindMismatch {
                expected: kind,
                actual: to.kind(),
            }),
        }
    }

    /// Put the payload back at the start of its lifecycle.
    pub fn reset_status(&mut self) {
        match self {
            Payload::Task(m) => m.status = TaskStatus::default(),
            Payload::Review(m) => m.status = ReviewStatus::default(),
            Payload::Code(m) => m.status = CodeStatus::default(),
            Payload::Score(m) => m.status = ScoreStatus::default(),
            Payload::Feedback(m) => m.status = FeedbackStatus::default(),
            Payload::Heartbeat(_) => {}
        }
    }

    pub fn to_content(&self) -> Result<Content, CoreError> {
        Content::from_serializable(self)
    }

    pub fn from_content(content: &Content) -> Result<Self, CoreError> {
        if content.message_type().is_none() {
            return Err(CoreError::MissingType);
        }
        content.to_deserializable()
    }
}

impl From<TaskMessage> for Payload {
    fn from(m: TaskMessage) -> Self {
        Payload::Task(m)
    }
}

impl From<ReviewMessage> for Payload {
    fn from(m: ReviewMessage) -> Self {
        Payload::Review(m)
    }
}

impl From<CodeMessage> for Payload {
    fn from(m: CodeMessage) -> Self {
        Payload::Code(m)
    }
}

impl From<ScoreMessage> for Payload {
    fn from(m: ScoreMessage) -> Self {
        Payload::Score(m)
    }
}

impl From<FeedbackMessage> for Payload {
    fn from(m: FeedbackMessage) -> Self {
        Payload::Feedback(m)
    }
}

impl From<HeartbeatMessage> for Payload {
    fn from(m: HeartbeatMessage) -> Self {
        Payload::Heartbeat(m)
    }
}
