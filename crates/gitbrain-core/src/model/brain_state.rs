use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::value::{Content, Value};
use crate::error::CoreError;

pub const BRAIN_STATE_VERSION: &str = "1.0.0";

/// The two cooperating roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Coder,
    Overseer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coder => "coder",
            Role::Overseer => "overseer",
        }
    }

    /// The role on the other side of the conversation.
    pub fn counterpart(&self) -> Role {
        match self {
            Role::Coder => Role::Overseer,
            Role::Overseer => Role::Coder,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coder" => Ok(Role::Coder),
            "overseer" => Ok(Role::Overseer),
            other => Err(CoreError::Config(format!("unknown role: {other}"))),
        }
    }
}

/// Twelve hex characters of SHA-256 over `ai_name:content_hash:epoch_seconds`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrainStateId(String);

impl BrainStateId {
    pub fn derive(ai_name: &str, content_hash: &str, at: DateTime<Utc>) -> Self {
        let digest = Sha256::digest(format!("{ai_name}:{content_hash}:{}", at.timestamp()));
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex[..12].to_string())
    }

    /// Derive using the short HEAD commit of the repository at `repo_path`,
    /// falling back to `"nogit"` outside a repository.
    pub fn for_repository(ai_name: &str, repo_path: &Path, at: DateTime<Utc>) -> Self {
        let hash = head_short_hash(repo_path).unwrap_or_else(|| "nogit".to_string());
        Self::derive(ai_name, &hash, at)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BrainStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BrainStateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BrainStateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

fn head_short_hash(repo_path: &Path) -> Option<String> {
    let repo = git2::Repository::discover(repo_path).ok()?;
    let head = repo.head().ok()?.peel_to_commit().ok()?;
    let id = head.id().to_string();
    Some(id[..7.min(id.len())].to_string())
}

/// An agent's durable working memory. One live record per `ai_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainState {
    pub id: BrainStateId,
    pub ai_name: String,
    pub role: Role,
    pub version: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub state: Content,
}

impl BrainState {
    pub fn new(ai_name: impl Into<String>, role: Role, state: Content) -> Self {
        let ai_name = ai_name.into();
        let now = Utc::now();
        Self {
            id: BrainStateId::derive(&ai_name, "nogit", now),
            ai_name,
            role,
            version: BRAIN_STATE_VERSION.to_string(),
            last_updated: now,
            state,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.insert(key, value);
        self.last_updated = Utc::now();
    }
}
