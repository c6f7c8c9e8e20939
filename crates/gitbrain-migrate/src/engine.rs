use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use gitbrain_core::repository::{BrainStateRepository, KnowledgeRepository, RepositoryError};

use crate::error::MigrationError;
use crate::progress::MigrationProgress;
use crate::report::{MigrationFailure, MigrationPhase, MigrationReport, MigrationResult};
use crate::retry::{Retried, RetryPolicy};
use crate::snapshot::MigrationSnapshot;

/// Copies knowledge items and brain states from one repository to another.
///
/// Items move one at a time. Transient failures are retried per the
/// [`RetryPolicy`]; anything still failing is recorded in the result and
/// the remaining items carry on. Writes are upserts, so a run can be
/// repeated safely.
#[derive(Clone, Default)]
pub struct DataMigration {
    policy: RetryPolicy,
    progress: Option<Arc<dyn MigrationProgress>>,
}

/// Running totals for one migration call.
struct Tally {
    started: Instant,
    migrated: usize,
    failures: Vec<MigrationFailure>,
}

impl Tally {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            migrated: 0,
            failures: Vec::new(),
        }
    }

    fn finish(self, snapshot: Option<&MigrationSnapshot>) -> MigrationResult {
        MigrationResult {
            success: self.failures.is_empty(),
            items_migrated: self.migrated,
            items_failed: self.failures.len(),
            errors: self.failures,
            duration: self.started.elapsed(),
            timestamp: Utc::now(),
            snapshot_id: snapshot.map(|s| s.id().to_string()),
        }
    }
}

impl DataMigration {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn MigrationProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn create_snapshot(
        &self,
        knowledge: &dyn KnowledgeRepository,
        brain: &dyn BrainStateRepository,
    ) -> Result<MigrationSnapshot, MigrationError> {
        MigrationSnapshot::capture(knowledge, brain).await
    }

    /// Copy every knowledge item from `source` into `target`.
    pub async fn migrate_knowledge_base(
        &self,
        source: &dyn KnowledgeRepository,
        target: &dyn KnowledgeRepository,
        snapshot: Option<&MigrationSnapshot>,
    ) -> Result<MigrationResult, MigrationError> {
        let mut tally = Tally::new();
        self.report_progress(MigrationPhase::Discovery, 0, 0, "Starting knowledge migration");

        let categories = self
            .policy
            .retry("knowledge categories", || source.list_categories())
            .await
            .map_err(|e| MigrationError::SourceUnavailable(e.value.to_string()))?
            .value;

        let mut items = Vec::new();
        for category in categories {
            let c = category.as_str();
            match self.policy.retry(c, move || source.list_keys(c)).await {
                Ok(keys) => items.extend(keys.value.into_iter().map(|k| (category.clone(), k))),
                Err(e) => self.record(&mut tally, format!("{category}/*"), e, MigrationPhase::Discovery),
            }
        }
        let total = items.len();
        tracing::info!(total, "Migrating knowledge items");
        self.report_progress(MigrationPhase::Discovery, 0, total, &format!("Found {total} items"));

        for (n, (category, key)) in items.iter().enumerate() {
            self.transfer_knowledge(category, key, source, target, &mut tally)
                .await;
            self.report_progress(MigrationPhase::Transfer, n + 1, total, &format!("{category}/{key}"));
        }
        Ok(self.complete(tally, snapshot, "knowledge"))
    }

    /// Copy every brain state from `source` into `target`.
    pub async fn migrate_brain_states(
        &self,
        source: &dyn BrainStateRepository,
        target: &dyn BrainStateRepository,
        snapshot: Option<&MigrationSnapshot>,
    ) -> Result<MigrationResult, MigrationError> {
        let mut tally = Tally::new();
        self.report_progress(MigrationPhase::Discovery, 0, 0, "Starting brain state migration");

        let names = self
            .policy
            .retry("brain states", || source.list())
            .await
            .map_err(|e| MigrationError::SourceUnavailable(e.value.to_string()))?
            .value;
        let total = names.len();
        tracing::info!(total, "Migrating brain states");

        for (n, ai_name) in names.iter().enumerate() {
            self.transfer_brain_state(ai_name, source, target, &mut tally)
                .await;
            self.report_progress(MigrationPhase::Transfer, n + 1, total, ai_name);
        }
        Ok(self.complete(tally, snapshot, "brain state"))
    }

    /// Re-run only the knowledge items that failed in `previous`.
    pub async fn retry_failed_knowledge(
        &self,
        previous: &MigrationResult,
        source: &dyn KnowledgeRepository,
        target: &dyn KnowledgeRepository,
    ) -> MigrationResult {
        let mut tally = Tally::new();
        for item in previous.failed_items() {
            match item.split_once('/') {
                Some((_, "*")) | None => {
                    tracing::warn!("Cannot retry {item}: not a single knowledge item");
                }
                Some((category, key)) => {
                    self.transfer_knowledge(category, key, source, target, &mut tally)
                        .await;
                }
            }
        }
        self.complete(tally, None, "knowledge retry")
    }

    /// Re-run only the brain states that failed in `previous`.
    pub async fn retry_failed_brain_states(
        &self,
        previous: &MigrationResult,
        source: &dyn BrainStateRepository,
        target: &dyn BrainStateRepository,
    ) -> MigrationResult {
        let mut tally = Tally::new();
        for ai_name in previous.failed_items() {
            self.transfer_brain_state(ai_name, source, target, &mut tally)
                .await;
        }
        self.complete(tally, None, "brain state retry")
    }

    /// Write every item in `snapshot` back into the targets. Items are added
    /// or overwritten; items created after the snapshot are left alone.
    /// Returns how many items were restored.
    pub async fn rollback(
        &self,
        snapshot: &MigrationSnapshot,
        knowledge: &dyn KnowledgeRepository,
        brain: &dyn BrainStateRepository,
    ) -> Result<usize, MigrationError> {
        tracing::info!(id = %snapshot.id(), "Rolling back to snapshot");
        let mut restored = 0;
        let mut failed = Vec::new();
        let mut last_error = String::new();

        for entry in snapshot.knowledge_items() {
            let address = entry.address();
            match self.policy.retry(&address, || knowledge.put(entry.clone())).await {
                Ok(_) => restored += 1,
                Err(e) => {
                    self.report_error(&format!("Rolling back {address}"), &e.value.to_string());
                    last_error = e.value.to_string();
                    failed.push(address);
                }
            }
        }
        for state in snapshot.brain_states() {
            match self.policy.retry(&state.ai_name, || brain.save(state)).await {
                Ok(_) => restored += 1,
                Err(e) => {
                    self.report_error(&format!("Rolling back {}", state.ai_name), &e.value.to_string());
                    last_error = e.value.to_string();
                    failed.push(state.ai_name.clone());
                }
            }
        }

        if !failed.is_empty() {
            tracing::error!(failed = failed.len(), "Rollback incomplete");
            return Err(MigrationError::RollbackFailed {
                items: failed,
                reason: last_error,
            });
        }
        tracing::info!(restored, "Rollback complete");
        Ok(restored)
    }

    pub async fn rollback_item(
        &self,
        category: &str,
        key: &str,
        snapshot: &MigrationSnapshot,
        target: &dyn KnowledgeRepository,
    ) -> Result<(), MigrationError> {
        let entry = snapshot
            .knowledge_item(category, key)
            .ok_or_else(|| MigrationError::ItemNotFoundInSnapshot(format!("{category}/{key}")))?;
        target.put(entry.clone()).await?;
        tracing::info!("Rolled back knowledge item {category}/{key}");
        Ok(())
    }

    pub async fn rollback_brain_state(
        &self,
        ai_name: &str,
        snapshot: &MigrationSnapshot,
        target: &dyn BrainStateRepository,
    ) -> Result<(), MigrationError> {
        let state = snapshot
            .brain_state(ai_name)
            .ok_or_else(|| MigrationError::ItemNotFoundInSnapshot(ai_name.to_string()))?;
        target.save(state).await?;
        tracing::info!("Rolled back brain state for {ai_name}");
        Ok(())
    }

    /// Count what is actually in the repositories now.
    pub async fn validate_migration(
        &self,
        knowledge: &dyn KnowledgeRepository,
        brain: &dyn BrainStateRepository,
    ) -> Result<MigrationReport, MigrationError> {
        self.report_progress(MigrationPhase::Verification, 0, 100, "Starting validation");
        let categories = knowledge.list_categories().await?;
        let mut report = MigrationReport {
            knowledge_categories: categories.len(),
            ..MigrationReport::default()
        };
        for category in &categories {
            report.knowledge_items += knowledge.list_keys(category).await?.len();
        }
        report.brain_states = brain.list().await?.len();
        self.report_progress(MigrationPhase::Verification, 100, 100, "Validation complete");
        Ok(report)
    }

    async fn transfer_knowledge(
        &self,
        category: &str,
        key: &str,
        source: &dyn KnowledgeRepository,
        target: &dyn KnowledgeRepository,
        tally: &mut Tally,
    ) {
        let address = format!("{category}/{key}");
        let entry = match self.policy.retry(&address, || source.get(category, key)).await {
            Ok(Retried { value: Some(entry), .. }) => entry,
            Ok(Retried { value: None, retries }) => {
                let missing = Retried {
                    value: RepositoryError::NotFound(address.clone()),
                    retries,
                };
                self.record(tally, address, missing, MigrationPhase::Discovery);
                return;
            }
            Err(e) => {
                self.record(tally, address, e, MigrationPhase::Transfer);
                return;
            }
        };
        match self.policy.retry(&address, || target.put(entry.clone())).await {
            Ok(_) => {
                tally.migrated += 1;
                tracing::debug!("Migrated {address}");
            }
            Err(e) => self.record(tally, address, e, MigrationPhase::Transfer),
        }
    }

    async fn transfer_brain_state(
        &self,
        ai_name: &str,
        source: &dyn BrainStateRepository,
        target: &dyn BrainStateRepository,
        tally: &mut Tally,
    ) {
        let state = match self.policy.retry(ai_name, || source.load(ai_name)).await {
            Ok(Retried { value: Some(state), .. }) => state,
            Ok(Retried { value: None, retries }) => {
                let missing = Retried {
                    value: RepositoryError::NotFound(ai_name.to_string()),
                    retries,
                };
                self.record(tally, ai_name.to_string(), missing, MigrationPhase::Discovery);
                return;
            }
            Err(e) => {
                self.record(tally, ai_name.to_string(), e, MigrationPhase::Transfer);
                return;
            }
        };
        match self.policy.retry(ai_name, || target.save(&state)).await {
            Ok(_) => {
                tally.migrated += 1;
                tracing::debug!("Migrated brain state {ai_name}");
            }
            Err(e) => self.record(tally, ai_name.to_string(), e, MigrationPhase::Transfer),
        }
    }

    fn record(
        &self,
        tally: &mut Tally,
        item: String,
        error: Retried<RepositoryError>,
        phase: MigrationPhase,
    ) {
        tracing::error!(
            phase = %phase,
            retries = error.retries,
            "Failed to migrate {item}: {}",
            error.value
        );
        self.report_error(&format!("Migrating {item}"), &error.value.to_string());
        tally
            .failures
            .push(MigrationFailure::new(item, &error.value, phase, error.retries));
    }

    fn complete(&self, tally: Tally, snapshot: Option<&MigrationSnapshot>, what: &str) -> MigrationResult {
        let result = tally.finish(snapshot);
        tracing::info!(
            migrated = result.items_migrated,
            failed = result.items_failed,
            "Finished {what} migration"
        );
        if let Some(progress) = &self.progress {
            progress.completion(&result);
        }
        result
    }

    fn report_progress(&self, phase: MigrationPhase, current: usize, total: usize, message: &str) {
        if let Some(progress) = &self.progress {
            progress.progress(phase, current, total, message);
        }
    }

    fn report_error(&self, context: &str, error: &str) {
        if let Some(progress) = &self.progress {
            progress.error(context, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use gitbrain_core::model::{BrainState, Content, Role, Value};
    use gitbrain_core::repository::memory::{
        InMemoryBrainStateRepository, InMemoryKnowledgeRepository,
    };
    use gitbrain_core::repository::file::{FileBrainStateRepository, FileKnowledgeRepository};
    use gitbrain_core::repository::{KnowledgeEntry, RepositoryResult};
    use tempfile::TempDir;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            backoff_multiplier: 2.0,
        }
    }

    /// Target whose writes fail: `flaky` keys a few times with a transient
    /// error, `broken` keys always with a permanent one.
    #[derive(Default)]
    struct FaultyTarget {
        inner: InMemoryKnowledgeRepository,
        flaky: Mutex<HashMap<String, u32>>,
        broken: Vec<String>,
    }

    impl FaultyTarget {
        fn check(&self, entry: &KnowledgeEntry) -> RepositoryResult<()> {
            let address = entry.address();
            if self.broken.contains(&address) {
                return Err(RepositoryError::InvalidKey(address));
            }
            if let Some(left) = self.flaky.lock().unwrap().get_mut(&address) {
                if *left > 0 {
                    *left -= 1;
                    return Err(RepositoryError::Unavailable("connection reset".into()));
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KnowledgeRepository for FaultyTarget {
        async fn add(&self, entry: KnowledgeEntry) -> RepositoryResult<()> {
            self.check(&entry)?;
            self.inner.add(entry).await
        }
        async fn get(&self, c: &str, k: &str) -> RepositoryResult<Option<KnowledgeEntry>> {
            self.inner.get(c, k).await
        }
        async fn update(&self, entry: KnowledgeEntry) -> RepositoryResult<bool> {
            self.check(&entry)?;
            self.inner.update(entry).await
        }
        async fn delete(&self, c: &str, k: &str) -> RepositoryResult<bool> {
            self.inner.delete(c, k).await
        }
        async fn list_categories(&self) -> RepositoryResult<Vec<String>> {
            self.inner.list_categories().await
        }
        async fn list_keys(&self, c: &str) -> RepositoryResult<Vec<String>> {
            self.inner.list_keys(c).await
        }
        async fn search(&self, c: &str, q: &str) -> RepositoryResult<Vec<KnowledgeEntry>> {
            self.inner.search(c, q).await
        }
    }

    async fn seeded_source(items: &[(&str, &str)]) -> InMemoryKnowledgeRepository {
        let repo = InMemoryKnowledgeRepository::new();
        for (category, key) in items {
            repo.add(KnowledgeEntry::new(
                *category,
                *key,
                Content::new().with("summary", format!("{category}:{key}")),
            ))
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_empty_source_succeeds() {
        let tmp = TempDir::new().unwrap();
        let source = FileKnowledgeRepository::new(tmp.path());
        let target = InMemoryKnowledgeRepository::new();
        let result = DataMigration::new(fast())
            .migrate_knowledge_base(&source, &target, None)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.items_migrated, 0);
        assert_eq!(result.items_failed, 0);
    }

    #[tokio::test]
    async fn test_file_tree_to_memory() {
        let tmp = TempDir::new().unwrap();
        let source = FileKnowledgeRepository::new(tmp.path());
        for (c, k) in [("patterns", "retry"), ("patterns", "cache"), ("notes", "a")] {
            source
                .add(KnowledgeEntry::new(c, k, Content::new().with("k", k)))
                .await
                .unwrap();
        }
        let target = InMemoryKnowledgeRepository::new();
        let migration = DataMigration::new(fast());
        let result = migration
            .migrate_knowledge_base(&source, &target, None)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.items_migrated, 3);

        // Upserts make a second run a no-op rather than a conflict.
        let again = migration
            .migrate_knowledge_base(&source, &target, None)
            .await
            .unwrap();
        assert!(again.success);
        assert_eq!(target.len().await, 3);

        let brain = InMemoryBrainStateRepository::new();
        let report = migration.validate_migration(&target, &brain).await.unwrap();
        assert_eq!(report.knowledge_categories, 2);
        assert_eq!(report.knowledge_items, 3);
        assert_eq!(report.total_items(), 3);
    }

    #[tokio::test]
    async fn test_partial_failure_is_recorded_not_raised() {
        let source = seeded_source(&[("a", "ok"), ("a", "flaky"), ("b", "broken")]).await;
        let target = FaultyTarget {
            flaky: Mutex::new(HashMap::from([("a/flaky".to_string(), 2)])),
            broken: vec!["b/broken".into()],
            ..FaultyTarget::default()
        };
        let result = DataMigration::new(fast())
            .migrate_knowledge_base(&source, &target, None)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.items_migrated, 2);
        assert_eq!(result.items_failed, 1);
        let failure = &result.errors[0];
        assert_eq!(failure.item, "b/broken");
        assert_eq!(failure.phase, MigrationPhase::Transfer);
        assert_eq!(failure.retry_count, 0);
        assert!(target.inner.get("a", "flaky").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_exhausted_retries_counted_then_retry_failed() {
        let source = seeded_source(&[("a", "slow"), ("a", "fine")]).await;
        let target = FaultyTarget {
            flaky: Mutex::new(HashMap::from([("a/slow".to_string(), 10)])),
            ..FaultyTarget::default()
        };
        let migration = DataMigration::new(fast());
        let result = migration
            .migrate_knowledge_base(&source, &target, None)
            .await
            .unwrap();
        assert_eq!(result.items_failed, 1);
        assert_eq!(result.errors[0].retry_count, 3);

        target.flaky.lock().unwrap().clear();
        let retried = migration
            .retry_failed_knowledge(&result, &source, &target)
            .await;
        assert!(retried.success);
        assert_eq!(retried.items_migrated, 1);
        assert!(target.inner.get("a", "slow").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_restores_snapshot_items() {
        let knowledge = seeded_source(&[("a", "1"), ("a", "2"), ("b", "3")]).await;
        let brain = InMemoryBrainStateRepository::new();
        let mut state = BrainState::new("claude", Role::Coder, Content::new());
        state.set("current_task", Value::from("t-1"));
        brain.create(&state).await.unwrap();

        let migration = DataMigration::new(fast());
        let snapshot = migration.create_snapshot(&knowledge, &brain).await.unwrap();

        // Damage the stores, then add something new.
        knowledge.delete("a", "1").await.unwrap();
        knowledge
            .update(KnowledgeEntry::new("a", "2", Content::new().with("summary", "changed")))
            .await
            .unwrap();
        knowledge
            .add(KnowledgeEntry::new("c", "new", Content::new()))
            .await
            .unwrap();
        brain.update("claude", "current_task", Value::from("t-9")).await.unwrap();

        let restored = migration.rollback(&snapshot, &knowledge, &brain).await.unwrap();
        assert_eq!(restored, 4);
        assert_eq!(
            knowledge.get("a", "2").await.unwrap().unwrap().value,
            snapshot.knowledge_item("a", "2").unwrap().value
        );
        assert!(knowledge.get("a", "1").await.unwrap().is_some());
        // Additive: the post-snapshot item survives.
        assert!(knowledge.get("c", "new").await.unwrap().is_some());
        assert_eq!(
            brain.get("claude", "current_task").await.unwrap(),
            Some(Value::from("t-1"))
        );
    }

    #[tokio::test]
    async fn test_rollback_failure_lists_items() {
        let source = seeded_source(&[("a", "1"), ("b", "2")]).await;
        let brain = InMemoryBrainStateRepository::new();
        let migration = DataMigration::new(fast());
        let snapshot = migration.create_snapshot(&source, &brain).await.unwrap();

        let target = FaultyTarget {
            broken: vec!["b/2".into()],
            ..FaultyTarget::default()
        };
        let err = migration
            .rollback(&snapshot, &target, &brain)
            .await
            .unwrap_err();
        match err {
            MigrationError::RollbackFailed { items, .. } => assert_eq!(items, vec!["b/2"]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(target.inner.get("a", "1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_single_items() {
        let knowledge = seeded_source(&[("a", "1")]).await;
        let brain = InMemoryBrainStateRepository::new();
        brain
            .create(&BrainState::new("claude", Role::Overseer, Content::new()))
            .await
            .unwrap();
        let migration = DataMigration::new(fast());
        let snapshot = migration.create_snapshot(&knowledge, &brain).await.unwrap();

        let target = InMemoryKnowledgeRepository::new();
        migration
            .rollback_item("a", "1", &snapshot, &target)
            .await
            .unwrap();
        assert_eq!(target.len().await, 1);
        assert!(matches!(
            migration.rollback_item("a", "zzz", &snapshot, &target).await,
            Err(MigrationError::ItemNotFoundInSnapshot(item)) if item == "a/zzz"
        ));

        let brain_target = InMemoryBrainStateRepository::new();
        migration
            .rollback_brain_state("claude", &snapshot, &brain_target)
            .await
            .unwrap();
        assert_eq!(brain_target.list().await.unwrap(), vec!["claude"]);
        assert!(matches!(
            migration
                .rollback_brain_state("ghost", &snapshot, &brain_target)
                .await,
            Err(MigrationError::ItemNotFoundInSnapshot(_))
        ));
    }

    #[tokio::test]
    async fn test_brain_states_between_file_stores() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        let source = FileBrainStateRepository::new(src_dir.path());
        let target = FileBrainStateRepository::new(dst_dir.path());
        for (name, role) in [("claude", Role::Coder), ("gemini", Role::Overseer)] {
            source
                .create(&BrainState::new(name, role, Content::new().with("k", name)))
                .await
                .unwrap();
        }

        let migration = DataMigration::new(fast());
        let result = migration
            .migrate_brain_states(&source, &target, None)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.items_migrated, 2);
        assert_eq!(target.list().await.unwrap(), vec!["claude", "gemini"]);
        assert_eq!(
            target.load("gemini").await.unwrap().unwrap().role,
            Role::Overseer
        );

        let retried = migration
            .retry_failed_brain_states(&result, &source, &target)
            .await;
        assert_eq!(retried.items_migrated, 0);
    }
}
