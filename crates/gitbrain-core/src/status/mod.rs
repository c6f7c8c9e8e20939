//! Per-kind status enums and their transition tables.
//!
//! Every status type implements [`StatusMachine`]. `is_archivable` and
//! `is_purgeable` are computed from the transition table. `is_terminal` and
//! `is_active` default to the same derivation, and kinds whose lifecycle
//! reads differently override them.

pub mod code;
pub mod feedback;
pub mod review;
pub mod score;
pub mod task;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::MessageKind;

pub use code::CodeStatus;
pub use feedback::FeedbackStatus;
pub use review::ReviewStatus;
pub use score::ScoreStatus;
pub use task::TaskStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateTransitionError {
    #[error("Invalid {kind} transition: {from} -> {to}")]
    InvalidTransition {
        kind: MessageKind,
        from: String,
        to: String,
    },

    #[error("Status kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: MessageKind,
        actual: MessageKind,
    },

    #[error("Unknown {kind} status: {value}")]
    UnknownStatus { kind: MessageKind, value: String },
}

/// A status enum with an explicit, exhaustive transition table.
pub trait StatusMachine: Copy + Eq + fmt::Debug + 'static {
    const KIND: MessageKind;
    const ALL: &'static [Self];
    const PENDING: Self;
    const ARCHIVED: Self;

    /// Outgoing edges of this status.
    fn allowed_targets(self) -> &'static [Self];

    /// Wire name, snake_case.
    fn as_str(self) -> &'static str;

    fn parse(value: &str) -> Result<Self, StateTransitionError> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| StateTransitionError::UnknownStatus {
                kind: Self::KIND,
                value: value.to_string(),
            })
    }

    fn can_transition(self, to: Self) -> bool {
        self.allowed_targets().contains(&to)
    }

    /// Move to `to`, or fail without changing `self`.
    fn transition(&mut self, to: Self) -> Result<(), StateTransitionError> {
        if !self.can_transition(to) {
            return Err(StateTransitionError::InvalidTransition {
                kind: Self::KIND,
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        *self = to;
        Ok(())
    }

    /// No way forward except archiving (or already archived).
    fn is_terminal(self) -> bool {
        self.allowed_targets().iter().all(|t| *t == Self::ARCHIVED)
    }

    fn is_archivable(self) -> bool {
        self == Self::ARCHIVED || self.can_transition(Self::ARCHIVED)
    }

    fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Archived, or archiving is the only edge left.
    fn is_purgeable(self) -> bool {
        self.is_archivable() && self.allowed_targets().iter().all(|t| *t == Self::ARCHIVED)
    }
}

/// A status of any kind, for code that handles payloads generically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum KindStatus {
    Task(TaskStatus),
    Review(ReviewStatus),
    Code(CodeStatus),
    Score(ScoreStatus),
    Feedback(FeedbackStatus),
}

impl KindStatus {
    pub fn kind(&self) -> MessageKind {
        match self {
            KindStatus::Task(_) => MessageKind::Task,
            KindStatus::Review(_) => MessageKind::Review,
            KindStatus::Code(_) => MessageKind::Code,
            KindStatus::Score(_) => MessageKind::Score,
            KindStatus::Feedback(_) => MessageKind::Feedback,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KindStatus::Task(s) => s.as_str(),
            KindStatus::Review(s) => s.as_str(),
            KindStatus::Code(s) => s.as_str(),
            KindStatus::Score(s) => s.as_str(),
            KindStatus::Feedback(s) => s.as_str(),
        }
    }

    /// Initial status of a freshly sent message of `kind`.
    pub fn pending(kind: MessageKind) -> Option<Self> {
        match kind {
            MessageKind::Task => Some(KindStatus::Task(TaskStatus::PENDING)),
            MessageKind::Review => Some(KindStatus::Review(ReviewStatus::PENDING)),
            MessageKind::Code => Some(KindStatus::Code(CodeStatus::PENDING)),
            MessageKind::Score => Some(KindStatus::Score(ScoreStatus::PENDING)),
            MessageKind::Feedback => Some(KindStatus::Feedback(FeedbackStatus::PENDING)),
            MessageKind::Heartbeat => None,
        }
    }

    /// Status a pending message moves to once its recipient has handled it.
    pub fn receipt(kind: MessageKind) -> Option<Self> {
        match kind {
            MessageKind::Task => Some(KindStatus::Task(TaskStatus::InProgress)),
            MessageKind::Review => Some(KindStatus::Review(ReviewStatus::InReview)),
            MessageKind::Code => Some(KindStatus::Code(CodeStatus::Reviewing)),
            MessageKind::Score => Some(KindStatus::Score(ScoreStatus::Requested)),
            MessageKind::Feedback => Some(KindStatus::Feedback(FeedbackStatus::Read)),
            MessageKind::Heartbeat => None,
        }
    }

    /// Parse a wire status name for `kind`.
    pub fn parse(kind: MessageKind, value: &str) -> Result<Self, StateTransitionError> {
        match kind {
            MessageKind::Task => TaskStatus::parse(value).map(KindStatus::Task),
            MessageKind::Review => ReviewStatus::parse(value).map(KindStatus::Review),
            MessageKind::Code => CodeStatus::parse(value).map(KindStatus::Code),
            MessageKind::Score => ScoreStatus::parse(value).map(KindStatus::Score),
            MessageKind::Feedback => FeedbackStatus::parse(value).map(KindStatus::Feedback),
            MessageKind::Heartbeat => Err(StateTransitionError::UnknownStatus {
                kind,
                value: value.to_string(),
            }),
        }
    }

    pub fn is_pending(&self) -> bool {
        Self::pending(self.kind()).as_ref() == Some(self)
    }

    pub fn can_transition(&self, to: KindStatus) -> bool {
        match (self, to) {
            (KindStatus::Task(a), KindStatus::Task(b)) => a.can_transition(b),
            (KindStatus::Review(a), KindStatus::Review(b)) => a.can_transition(b),
            (KindStatus::Code(a), KindStatus::Code(b)) => a.can_transition(b),
            (KindStatus::Score(a), KindStatus::Score(b)) => a.can_transition(b),
            (KindStatus::Feedback(a), KindStatus::Feedback(b)) => a.can_transition(b),
            _ => false,
        }
    }

    pub fn transition(&mut self, to: KindStatus) -> Result<(), StateTransitionError> {
        match (self, to) {
            (KindStatus::Task(a), KindStatus::Task(b)) => a.transition(b),
            (KindStatus::Review(a), KindStatus::Review(b)) => a.transition(b),
            (KindStatus::Code(a), KindStatus::Code(b)) => a.transition(b),
            (KindStatus::Score(a), KindStatus::Score(b)) => a.transition(b),
            (KindStatus::Feedback(a), KindStatus::Feedback(b)) => a.transition(b),
            (current, to) => Err(StateTransitionError::KindMismatch {
                expected: current.kind(),
                actual: to.kind(),
            }),
        }
    }

    pub fn is_purgeable(&self) -> bool {
        match self {
            KindStatus::Task(s) => s.is_purgeable(),
            KindStatus::Review(s) => s.is_purgeable(),
            KindStatus::Code(s) => s.is_purgeable(),
            KindStatus::Score(s) => s.is_purgeable(),
            KindStatus::Feedback(s) => s.is_purgeable(),
        }
    }
}

impl fmt::Display for KindStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.as_str())
    }
}

impl From<TaskStatus> for KindStatus {
    fn from(s: TaskStatus) -> Self {
        KindStatus::Task(s)
    }
}

impl From<ReviewStatus> for KindStatus {
    fn from(s: ReviewStatus) -> Self {
        KindStatus::Review(s)
    }
}

impl From<CodeStatus> for KindStatus {
    fn from(s: CodeStatus) -> Self {
        KindStatus::Code(s)
    }
}

impl From<ScoreStatus> for KindStatus {
    fn from(s: ScoreStatus) -> Self {
        KindStatus::Score(s)
    }
}

impl From<FeedbackStatus> for KindStatus {
    fn from(s: FeedbackStatus) -> Self {
        KindStatus::Feedback(s)
    }
}

/// Checks a status type against an edge list: every listed pair succeeds,
/// every other pair fails with `InvalidTransition` and leaves the status alone.
#[cfg(test)]
pub(crate) fn assert_transition_table<S: StatusMachine>(edges: &[(S, S)]) {
    for &from in S::ALL {
        for &to in S::ALL {
            let mut status = from;
            let result = status.transition(to);
            if edges.contains(&(from, to)) {
                assert!(result.is_ok(), "{from:?} -> {to:?} should be allowed");
                assert_eq!(status, to);
            } else {
                match result {
                    Err(StateTransitionError::InvalidTransition { kind, .. }) => {
                        assert_eq!(kind, S::KIND);
                    }
                    other => panic!("{from:?} -> {to:?} should be rejected, got {other:?}"),
                }
                assert_eq!(status, from);
            }
        }
    }
}
