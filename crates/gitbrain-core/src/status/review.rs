use std::fmt;

use serde::{Deserialize, Serialize};

use super::StatusMachine;
use crate::model::MessageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    InReview,
    Approved,
    Rejected,
    NeedsChanges,
    Applied,
    Archived,
}

impl ReviewStatus {
    /// The reviewer or the author still owes work on this review.
    pub fn requires_action(self) -> bool {
        matches!(self, Self::Pending | Self::NeedsChanges)
    }
}

impl StatusMachine for ReviewStatus {
    const KIND: MessageKind = MessageKind::Review;
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::InReview,
        Self::Approved,
        Self::Rejected,
        Self::NeedsChanges,
        Self::Applied,
        Self::Archived,
    ];
    const PENDING: Self = Self::Pending;
    const ARCHIVED: Self = Self::Archived;

    fn allowed_targets(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::InReview, Self::Approved, Self::Rejected],
            Self::InReview => &[Self::Approved, Self::Rejected, Self::NeedsChanges],
            Self::NeedsChanges => &[Self::InReview, Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Applied, Self::Archived],
            Self::Rejected | Self::Applied => &[Self::Archived],
            Self::Archived => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::NeedsChanges => "needs_changes",
            Self::Applied => "applied",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
