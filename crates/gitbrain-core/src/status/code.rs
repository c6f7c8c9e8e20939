use std::fmt;

use serde::{Deserialize, Serialize};

use super::StatusMachine;
use crate::model::MessageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    #[default]
    Pending,
    Reviewing,
    Approved,
    Rejected,
    Merged,
    Archived,
}

impl StatusMachine for CodeStatus {
    const KIND: MessageKind = MessageKind::Code;
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::Reviewing,
        Self::Approved,
        Self::Rejected,
        Self::Merged,
        Self::Archived,
    ];
    const PENDING: Self = Self::Pending;
    const ARCHIVED: Self = Self::Archived;

    fn allowed_targets(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Reviewing, Self::Approved, Self::Rejected],
            Self::Reviewing => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Merged, Self::Archived],
            Self::Rejected | Self::Merged => &[Self::Archived],
            Self::Archived => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewing => "reviewing",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Merged => "merged",
            Self::Archived => "archived",
        }
    }

    fn is_terminal(self) -> bool {
        self == Self::Archived
    }

    /// Only code still awaiting a verdict is active.
    fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Reviewing)
    }
}

impl fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
