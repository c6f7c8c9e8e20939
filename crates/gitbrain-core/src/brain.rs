use std::sync::Arc;

use crate::model::{BrainState, Content, Role, Value};
use crate::repository::{BrainStateRepository, RepositoryResult};

/// Logging wrapper over a [`BrainStateRepository`].
#[derive(Clone)]
pub struct BrainStateManager {
    repository: Arc<dyn BrainStateRepository>,
}

impl BrainStateManager {
    pub fn new(repository: Arc<dyn BrainStateRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<dyn BrainStateRepository> {
        &self.repository
    }

    pub async fn create(
        &self,
        ai_name: &str,
        role: Role,
        initial: Option<Content>,
    ) -> RepositoryResult<BrainState> {
        let state = BrainState::new(ai_name, role, initial.unwrap_or_default());
        self.repository.create(&state).await?;
        tracing::info!("Created brain state for {ai_name} ({role})");
        Ok(state)
    }

    /// Load the agent's state, creating an empty one on first use.
    pub async fn load_or_create(&self, ai_name: &str, role: Role) -> RepositoryResult<BrainState> {
        match self.load(ai_name).await? {
            Some(state) => Ok(state),
            None => self.create(ai_name, role, None).await,
        }
    }

    pub async fn load(&self, ai_name: &str) -> RepositoryResult<Option<BrainState>> {
        let state = self.repository.load(ai_name).await?;
        if state.is_none() {
            tracing::debug!("No brain state for {ai_name}");
        }
        Ok(state)
    }

    pub async fn save(&self, state: &BrainState) -> RepositoryResult<()> {
        self.repository.save(state).await?;
        tracing::debug!("Saved brain state for {}", state.ai_name);
        Ok(())
    }

    pub async fn update_key(&self, ai_name: &str, key: &str, value: Value) -> RepositoryResult<bool> {
        let updated = self.repository.update(ai_name, key, value).await?;
        if updated {
            tracing::debug!("Updated {key} in brain state of {ai_name}");
        } else {
            tracing::warn!("Cannot update {key}: no brain state for {ai_name}");
        }
        Ok(updated)
    }

    pub async fn get_key(&self, ai_name: &str, key: &str) -> RepositoryResult<Option<Value>> {
        self.repository.get(ai_name, key).await
    }

    pub async fn delete(&self, ai_name: &str) -> RepositoryResult<bool> {
        let deleted = self.repository.delete(ai_name).await?;
        if deleted {
            tracing::info!("Deleted brain state for {ai_name}");
        }
        Ok(deleted)
    }

    pub async fn list(&self) -> RepositoryResult<Vec<String>> {
        self.repository.list().await
    }

    pub async fn backup(&self, ai_name: &str, suffix: Option<&str>) -> RepositoryResult<Option<String>> {
        let name = self.repository.backup(ai_name, suffix).await?;
        match &name {
            Some(name) => tracing::info!("Backed up brain state for {ai_name} as {name}"),
            None => tracing::warn!("Nothing to back up for {ai_name}"),
        }
        Ok(name)
    }

    pub async fn restore(&self, ai_name: &str, backup_name: &str) -> RepositoryResult<bool> {
        let restored = self.repository.restore(ai_name, backup_name).await?;
        if restored {
            tracing::info!("Restored brain state for {ai_name} from {backup_name}");
        } else {
            tracing::warn!("Backup {backup_name} not found for {ai_name}");
        }
        Ok(restored)
    }
}
