use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gitbrain_core::repository::RepositoryResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub labels: Vec<String>,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
}

impl Issue {
    pub fn has_labels(&self, labels: &[String]) -> bool {
        labels.iter().all(|l| self.labels.contains(l))
    }
}

/// The subset of an issue tracker the tracker mailbox needs.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> RepositoryResult<Issue>;

    /// Open issues carrying every label in `labels`.
    async fn list_open_issues(&self, labels: &[String]) -> RepositoryResult<Vec<Issue>>;

    async fn close_issue(&self, number: u64) -> RepositoryResult<()>;
}
