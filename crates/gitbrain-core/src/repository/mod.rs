//! Storage ports for knowledge items and brain states, with in-memory and
//! file-backed adapters.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{BrainState, Content, Value};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Item already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// One knowledge record, addressed by `(category, key)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub category: String,
    pub key: String,
    pub value: Content,
    #[serde(default)]
    pub metadata: Content,
    pub timestamp: DateTime<Utc>,
}

impl KnowledgeEntry {
    pub fn new(category: impl Into<String>, key: impl Into<String>, value: Content) -> Self {
        Self {
            category: category.into(),
            key: key.into(),
            value,
            metadata: Content::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Content) -> Self {
        self.metadata = metadata;
        self
    }

    /// `category/key`, used in logs and failure records.
    pub fn address(&self) -> String {
        format!("{}/{}", self.category, self.key)
    }

    /// Case-insensitive match on the key or any string in the value.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.key.to_lowercase().contains(&needle)
            || self
                .value
                .iter()
                .any(|(_, v)| v.to_string().to_lowercase().contains(&needle))
    }
}

#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    /// Insert a new item. Fails with `AlreadyExists` if the address is taken.
    async fn add(&self, entry: KnowledgeEntry) -> RepositoryResult<()>;

    async fn get(&self, category: &str, key: &str) -> RepositoryResult<Option<KnowledgeEntry>>;

    /// Replace an existing item. Returns `false` if there was nothing to replace.
    async fn update(&self, entry: KnowledgeEntry) -> RepositoryResult<bool>;

    async fn delete(&self, category: &str, key: &str) -> RepositoryResult<bool>;

    async fn list_categories(&self) -> RepositoryResult<Vec<String>>;

    async fn list_keys(&self, category: &str) -> RepositoryResult<Vec<String>>;

    async fn search(&self, category: &str, query: &str) -> RepositoryResult<Vec<KnowledgeEntry>>;

    /// Add, or update when the item already exists.
    async fn put(&self, entry: KnowledgeEntry) -> RepositoryResult<()> {
        match self.add(entry.clone()).await {
            Err(RepositoryError::AlreadyExists(_)) => {
                let address = entry.address();
                if self.update(entry).await? {
                    Ok(())
                } else {
                    Err(RepositoryError::NotFound(address))
                }
            }
            other => other,
        }
    }
}

#[async_trait]
pub trait BrainStateRepository: Send + Sync {
    /// Insert the first record for an agent. Fails with `AlreadyExists`.
    async fn create(&self, state: &BrainState) -> RepositoryResult<()>;

    async fn load(&self, ai_name: &str) -> RepositoryResult<Option<BrainState>>;

    /// Insert or overwrite the agent's record.
    async fn save(&self, state: &BrainState) -> RepositoryResult<()>;

    /// Set one key. Returns `false` if the agent has no record.
    async fn update(&self, ai_name: &str, key: &str, value: Value) -> RepositoryResult<bool>;

    async fn get(&self, ai_name: &str, key: &str) -> RepositoryResult<Option<Value>>;

    async fn delete(&self, ai_name: &str) -> RepositoryResult<bool>;

    /// Agent names with a live record, sorted.
    async fn list(&self) -> RepositoryResult<Vec<String>>;

    /// Copy the current record aside. Returns the backup name, or `None`
    /// if the agent has no record.
    async fn backup(&self, ai_name: &str, suffix: Option<&str>) -> RepositoryResult<Option<String>>;

    /// Replace the live record with a named backup. Returns `false` if the
    /// backup does not exist.
    async fn restore(&self, ai_name: &str, backup_name: &str) -> RepositoryResult<bool>;
}

/// Backup name for `ai_name`, suffixed with `suffix` or the current time.
pub(crate) fn backup_name(ai_name: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(s) => format!("{ai_name}_{s}"),
        None => format!("{ai_name}_{}", Utc::now().format("%Y%m%d%H%M%S%3f")),
    }
}
