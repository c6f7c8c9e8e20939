use chrono::{DateTime, Utc};
use gitbrain_core::model::BrainState;
use gitbrain_core::repository::{BrainStateRepository, KnowledgeEntry, KnowledgeRepository};
use serde::{Deserialize, Serialize};

use crate::error::MigrationError;

/// Point-in-time copy of every knowledge item and brain state, taken before
/// a migration so it can be rolled back. Read-only once captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationSnapshot {
    id: String,
    timestamp: DateTime<Utc>,
    knowledge_items: Vec<KnowledgeEntry>,
    brain_states: Vec<BrainState>,
}

impl MigrationSnapshot {
    pub fn new(knowledge_items: Vec<KnowledgeEntry>, brain_states: Vec<BrainState>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            knowledge_items,
            brain_states,
        }
    }

    pub async fn capture(
        knowledge: &dyn KnowledgeRepository,
        brain: &dyn BrainStateRepository,
    ) -> Result<Self, MigrationError> {
        let mut items = Vec::new();
        for category in knowledge.list_categories().await? {
            for key in knowledge.list_keys(&category).await? {
                if let Some(entry) = knowledge.get(&category, &key).await? {
                    items.push(entry);
                }
            }
        }
        let mut states = Vec::new();
        for ai_name in brain.list().await? {
            if let Some(state) = brain.load(&ai_name).await? {
                states.push(state);
            }
        }
        let snapshot = Self::new(items, states);
        tracing::info!(
            id = %snapshot.id,
            "Snapshot holds {} knowledge items and {} brain states",
            snapshot.knowledge_items.len(),
            snapshot.brain_states.len()
        );
        Ok(snapshot)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn knowledge_items(&self) -> &[KnowledgeEntry] {
        &self.knowledge_items
    }

    pub fn brain_states(&self) -> &[BrainState] {
        &self.brain_states
    }

    pub fn knowledge_item(&self, category: &str, key: &str) -> Option<&KnowledgeEntry> {
        self.knowledge_items
            .iter()
            .find(|e| e.category == category && e.key == key)
    }

    pub fn brain_state(&self, ai_name: &str) -> Option<&BrainState> {
        self.brain_states.iter().find(|s| s.ai_name == ai_name)
    }
}
