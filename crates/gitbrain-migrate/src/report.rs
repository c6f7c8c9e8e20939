use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPhase {
    Discovery,
    Transfer,
    Verification,
    Rollback,
}

impl MigrationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationPhase::Discovery => "discovery",
            MigrationPhase::Transfer => "transfer",
            MigrationPhase::Verification => "verification",
            MigrationPhase::Rollback => "rollback",
        }
    }
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item that could not be migrated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationFailure {
    /// `category/key` for knowledge, the agent name for brain states.
    pub item: String,
    pub error: String,
    pub phase: MigrationPhase,
    pub timestamp: DateTime<Utc>,
    pub retry_count: u32,
}

impl MigrationFailure {
    pub fn new(item: impl Into<String>, error: impl fmt::Display, phase: MigrationPhase, retry_count: u32) -> Self {
        Self {
            item: item.into(),
            error: error.to_string(),
            phase,
            timestamp: Utc::now(),
            retry_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationResult {
    pub success: bool,
    pub items_migrated: usize,
    pub items_failed: usize,
    pub errors: Vec<MigrationFailure>,
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
}

impl MigrationResult {
    /// Names of the items that failed, in order.
    pub fn failed_items(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|f| f.item.as_str())
    }
}

/// Counts recomputed from live repository state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub knowledge_categories: usize,
    pub knowledge_items: usize,
    pub brain_states: usize,
}

impl MigrationReport {
    pub fn total_items(&self) -> usize {
        self.knowledge_items + self.brain_states
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migration Report:")?;
        writeln!(f, "- Knowledge Categories: {}", self.knowledge_categories)?;
        writeln!(f, "- Knowledge Items: {}", self.knowledge_items)?;
        writeln!(f, "- Brain States: {}", self.brain_states)?;
        write!(f, "- Total Items: {}", self.total_items())
    }
}
