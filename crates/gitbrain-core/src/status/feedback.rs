use std::fmt;

use serde::{Deserialize, Serialize};

use super::StatusMachine;
use crate::model::MessageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Read,
    Acknowledged,
    Actioned,
    Archived,
}

impl StatusMachine for FeedbackStatus {
    const KIND: MessageKind = MessageKind::Feedback;
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::Read,
        Self::Acknowledged,
        Self::Actioned,
        Self::Archived,
    ];
    const PENDING: Self = Self::Pending;
    const ARCHIVED: Self = Self::Archived;

    fn allowed_targets(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Read, Self::Acknowledged],
            Self::Read => &[Self::Acknowledged, Self::Actioned],
            Self::Acknowledged => &[Self::Actioned, Self::Archived],
            Self::Actioned => &[Self::Archived],
            Self::Archived => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Read => "read",
            Self::Acknowledged => "acknowledged",
            Self::Actioned => "actioned",
            Self::Archived => "archived",
        }
    }

    fn is_terminal(self) -> bool {
        self == Self::Archived
    }

    fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Read | Self::Acknowledged)
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
