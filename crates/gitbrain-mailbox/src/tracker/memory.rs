use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use gitbrain_core::repository::{RepositoryError, RepositoryResult};
use tokio::sync::RwLock;

use super::issue::{Issue, IssueState, IssueTracker};

/// Issue tracker kept in memory, numbering issues from 1.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    issues: RwLock<BTreeMap<u64, Issue>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn issue(&self, number: u64) -> Option<Issue> {
        self.issues.read().await.get(&number).cloned()
    }
}

#[async_trait]
impl IssueTracker for InMemoryTracker {
    async fn create_issue(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> RepositoryResult<Issue> {
        let mut issues = self.issues.write().await;
        let number = issues.keys().next_back().map_or(1, |n| n + 1);
        let issue = Issue {
            number,
            title: title.to_string(),
            body: Some(body.to_string()),
            labels: labels.to_vec(),
            state: IssueState::Open,
            created_at: Utc::now(),
        };
        issues.insert(number, issue.clone());
        Ok(issue)
    }

    async fn list_open_issues(&self, labels: &[String]) -> RepositoryResult<Vec<Issue>> {
        Ok(self
            .issues
            .read()
            .await
            .values()
            .filter(|i| i.state == IssueState::Open && i.has_labels(labels))
            .cloned()
            .collect())
    }

    async fn close_issue(&self, number: u64) -> RepositoryResult<()> {
        let mut issues = self.issues.write().await;
        let issue = issues
            .get_mut(&number)
            .ok_or_else(|| RepositoryError::NotFound(format!("issue #{number}")))?;
        issue.state = IssueState::Closed;
        Ok(())
    }
}
