use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    backup_name, BrainStateRepository, KnowledgeEntry, KnowledgeRepository, RepositoryError,
    RepositoryResult,
};
use crate::model::{BrainState, Value};

/// Knowledge items held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeRepository {
    items: RwLock<BTreeMap<(String, String), KnowledgeEntry>>,
}

impl InMemoryKnowledgeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl KnowledgeRepository for InMemoryKnowledgeRepository {
    async fn add(&self, entry: KnowledgeEntry) -> RepositoryResult<()> {
        let mut items = self.items.write().await;
        let id = (entry.category.clone(), entry.key.clone());
        if items.contains_key(&id) {
            return Err(RepositoryError::AlreadyExists(entry.address()));
        }
        items.insert(id, entry);
        Ok(())
    }

    async fn get(&self, category: &str, key: &str) -> RepositoryResult<Option<KnowledgeEntry>> {
        let items = self.items.read().await;
        Ok(items.get(&(category.to_string(), key.to_string())).cloned())
    }

    async fn update(&self, entry: KnowledgeEntry) -> RepositoryResult<bool> {
        let mut items = self.items.write().await;
        match items.get_mut(&(entry.category.clone(), entry.key.clone())) {
            Some(existing) => {
                *existing = entry;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, category: &str, key: &str) -> RepositoryResult<bool> {
        let mut items = self.items.write().await;
        Ok(items
            .remove(&(category.to_string(), key.to_string()))
            .is_some())
    }

    async fn list_categories(&self) -> RepositoryResult<Vec<String>> {
        let items = self.items.read().await;
        let mut categories: Vec<String> = items.keys().map(|(c, _)| c.clone()).collect();
        categories.dedup();
        Ok(categories)
    }

    async fn list_keys(&self, category: &str) -> RepositoryResult<Vec<String>> {
        let items = self.items.read().await;
        Ok(items
            .keys()
            .filter(|(c, _)| c == category)
            .map(|(_, k)| k.clone())
            .collect())
    }

    async fn search(&self, category: &str, query: &str) -> RepositoryResult<Vec<KnowledgeEntry>> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|e| e.category == category && e.matches(query))
            .cloned()
            .collect())
    }
}

/// Brain states held in process memory, with backups kept alongside.
#[derive(Debug, Default)]
pub struct InMemoryBrainStateRepository {
    states: RwLock<BTreeMap<String, BrainState>>,
    backups: RwLock<BTreeMap<String, BrainState>>,
}

impl InMemoryBrainStateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BrainStateRepository for InMemoryBrainStateRepository {
    async fn create(&self, state: &BrainState) -> RepositoryResult<()> {
        let mut states = self.states.write().await;
        if states.contains_key(&state.ai_name) {
            return Err(RepositoryError::AlreadyExists(state.ai_name.clone()));
        }
        states.insert(state.ai_name.clone(), state.clone());
        Ok(())
    }

    async fn load(&self, ai_name: &str) -> RepositoryResult<Option<BrainState>> {
        Ok(self.states.read().await.get(ai_name).cloned())
    }

    async fn save(&self, state: &BrainState) -> RepositoryResult<()> {
        let mut states = self.states.write().await;
        states.insert(state.ai_name.clone(), state.clone());
        Ok(())
    }

    async fn update(&self, ai_name: &str, key: &str, value: Value) -> RepositoryResult<bool> {
        let mut states = self.states.write().await;
        match states.get_mut(ai_name) {
            Some(state) => {
                state.set(key, value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get(&self, ai_name: &str, key: &str) -> RepositoryResult<Option<Value>> {
        let states = self.states.read().await;
        Ok(states.get(ai_name).and_then(|s| s.get(key).cloned()))
    }

    async fn delete(&self, ai_name: &str) -> RepositoryResult<bool> {
        Ok(self.states.write().await.remove(ai_name).is_some())
    }

    async fn list(&self) -> RepositoryResult<Vec<String>> {
        Ok(self.states.read().await.keys().cloned().collect())
    }

    async fn backup(&self, ai_name: &str, suffix: Option<&str>) -> RepositoryResult<Option<String>> {
        let Some(state) = self.states.read().await.get(ai_name).cloned() else {
            return Ok(None);
        };
        let name = backup_name(ai_name, suffix);
        self.backups.write().await.insert(name.clone(), state);
        Ok(Some(name))
    }

    async fn restore(&self, ai_name: &str, backup_name: &str) -> RepositoryResult<bool> {
        let Some(mut state) = self.backups.read().await.get(backup_name).cloned() else {
            return Ok(false);
        };
        state.ai_name = ai_name.to_string();
        state.last_updated = Utc::now();
        self.states.write().await.insert(ai_name.to_string(), state);
        Ok(true)
    }
}
