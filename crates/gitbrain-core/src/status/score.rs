use std::fmt;

use serde::{Deserialize, Serialize};

use super::StatusMachine;
use crate::model::MessageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    #[default]
    Pending,
    Requested,
    Awarded,
    Rejected,
    Archived,
}

impl StatusMachine for ScoreStatus {
    const KIND: MessageKind = MessageKind::Score;
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::Requested,
        Self::Awarded,
        Self::Rejected,
        Self::Archived,
    ];
    const PENDING: Self = Self::Pending;
    const ARCHIVED: Self = Self::Archived;

    fn allowed_targets(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Requested],
            Self::Requested => &[Self::Awarded, Self::Rejected],
            Self::Awarded | Self::Rejected => &[Self::Archived],
            Self::Archived => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Requested => "requested",
            Self::Awarded => "awarded",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }

    fn is_terminal(self) -> bool {
        self == Self::Archived
    }

    fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Requested)
    }
}

impl fmt::Display for ScoreStatus {
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
        use ScoreStatus::*;
        assert_transition_table(&[
            (Pending, Requested),
            (Requested, Awarded),
            (Requested, Rejected),
            (Awarded, Archived),
            (Rejected, Archived),
        ]);
    }

    #[test]
    fn test_pending_cannot_skip_request() {
        assert!(!ScoreStatus::Pending.can_transition(ScoreStatus::Awarded));
        assert!(ScoreStatus::Pending.is_active());
    }

    #[test]
    fn test_awarded_is_settled_but_not_terminal() {
        assert!(!ScoreStatus::Awarded.is_active());
        assert!(!ScoreStatus::Awarded.is_terminal());
        assert!(ScoreStatus::Awarded.is_purgeable());
        assert!(ScoreStatus::Archived.is_terminal());
    }
}
