use std::fmt;

use serde::{Deserialize, Serialize};

use super::StatusMachine;
use crate::model::MessageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Archived,
}

impl StatusMachine for TaskStatus {
    const KIND: MessageKind = MessageKind::Task;
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
        Self::Archived,
    ];
    const PENDING: Self = Self::Pending;
    const ARCHIVED: Self = Self::Archived;

    fn allowed_targets(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => &[Self::Archived],
            Self::Archived => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Archived => "archived",
        }
    }

    /// Archived tasks are filed away, not finished.
    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::assert_transition_table;

    #[test]
    fn test_transition_table() {
        use TaskStatus::*;
        assert_transition_table(&[
            (Pending, InProgress),
            (Pending, Cancelled),
            (InProgress, Completed),
            (InProgress, Failed),
            (InProgress, Cancelled),
            (Completed, Archived),
            (Failed, Archived),
            (Cancelled, Archived),
        ]);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut status = TaskStatus::Pending;
        status.transition(TaskStatus::InProgress).unwrap();
        status.transition(TaskStatus::Completed).unwrap();
        status.transition(TaskStatus::Archived).unwrap();
        assert_eq!(status, TaskStatus::Archived);
        assert!(status.transition(TaskStatus::Pending).is_err());
    }

    #[test]
    fn test_derived_predicates() {
        assert!(TaskStatus::Pending.is_active());
        assert!(!TaskStatus::Pending.is_archivable());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Failed.is_purgeable());
        assert!(TaskStatus::Archived.is_purgeable());
        assert!(!TaskStatus::InProgress.is_purgeable());
    }

    #[test]
    fn test_archived_is_neither_terminal_nor_active() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(!TaskStatus::Completed.is_active());
        assert!(!TaskStatus::Archived.is_terminal());
        assert!(!TaskStatus::Archived.is_active());
        assert!(TaskStatus::InProgress.is_active());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(
            TaskStatus::parse("in_progress").unwrap(),
            TaskStatus::InProgress
        );
    }
}
