//! File-backed repositories.
//!
//! Layout under the base directory:
//! `Knowledge/<category>/<key>.json`, `BrainState/<ai_name>.json` and
//! `BrainState/backups/<name>.json`. Writes hold an exclusive lock on the
//! target file, reads a shared one.

use std::fs;
use std::io::{Read as _, Seek, SeekFrom, Write as _};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    backup_name, BrainStateRepository, KnowledgeEntry, KnowledgeRepository, RepositoryError,
    RepositoryResult,
};
use crate::model::{BrainState, Value};

const KNOWLEDGE_DIR: &str = "Knowledge";
const BRAIN_STATE_DIR: &str = "BrainState";
const BACKUP_DIR: &str = "backups";

/// Run blocking filesystem work off the async executor.
async fn blocking<T, F>(f: F) -> RepositoryResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> RepositoryResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RepositoryError::Unavailable(format!("blocking task failed: {e}")))?
}

/// Reject names that would escape their directory.
fn segment(name: &str) -> RepositoryResult<&str> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0')
    {
        return Err(RepositoryError::InvalidKey(name.to_string()));
    }
    Ok(name)
}

/// Release a lock taken by `write_json`/`read_json`. A failure here is logged
/// so it never hides the result of the I/O done under the lock.
fn unlock(file: &fs::File, path: &Path) {
    if let Err(e) = fs2::FileExt::unlock(file) {
        tracing::warn!("Failed to unlock {}: {e}", path.display());
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RepositoryResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    fs2::FileExt::lock_exclusive(&file)?;
    let result = file
        .set_len(0)
        .and_then(|_| file.seek(SeekFrom::Start(0)))
        .and_then(|_| file.write_all(json.as_bytes()));
    unlock(&file, path);
    Ok(result?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> RepositoryResult<Option<T>> {
    let mut file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    fs2::FileExt::lock_shared(&file)?;
    let mut data = String::new();
    let result = file.read_to_string(&mut data);
    unlock(&file, path);
    result?;
    Ok(Some(serde_json::from_str(&data)?))
}

fn remove(path: &Path) -> RepositoryResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Sorted names of entries in `dir` accepted by `pick`.
fn list_names(dir: &Path, pick: impl Fn(&Path) -> Option<String>) -> RepositoryResult<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if let Some(name) = pick(&path) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn json_stem(path: &Path) -> Option<String> {
    if path.extension().is_some_and(|ext| ext == "json") {
        path.file_stem().map(|s| s.to_string_lossy().into_owned())
    } else {
        None
    }
}

fn dir_name(path: &Path) -> Option<String> {
    if path.is_dir() {
        path.file_name().map(|s| s.to_string_lossy().into_owned())
    } else {
        None
    }
}

/// Knowledge items stored one JSON file per item.
#[derive(Debug, Clone)]
pub struct FileKnowledgeRepository {
    root: PathBuf,
}

impl FileKnowledgeRepository {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            root: base.as_ref().join(KNOWLEDGE_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_path(&self, category: &str, key: &str) -> RepositoryResult<PathBuf> {
        Ok(self
            .root
            .join(segment(category)?)
            .join(format!("{}.json", segment(key)?)))
    }
}

#[async_trait]
impl KnowledgeRepository for FileKnowledgeRepository {
    async fn add(&self, entry: KnowledgeEntry) -> RepositoryResult<()> {
        let path = self.item_path(&entry.category, &entry.key)?;
        blocking(move || {
            if path.exists() {
                return Err(RepositoryError::AlreadyExists(entry.address()));
            }
            write_json(&path, &entry)
        })
        .await
    }

    async fn get(&self, category: &str, key: &str) -> RepositoryResult<Option<KnowledgeEntry>> {
        let path = self.item_path(category, key)?;
        blocking(move || read_json(&path)).await
    }

    async fn update(&self, entry: KnowledgeEntry) -> RepositoryResult<bool> {
        let path = self.item_path(&entry.category, &entry.key)?;
        blocking(move || {
            if !path.exists() {
                return Ok(false);
            }
            write_json(&path, &entry)?;
            Ok(true)
        })
        .await
    }

    async fn delete(&self, category: &str, key: &str) -> RepositoryResult<bool> {
        let path = self.item_path(category, key)?;
        blocking(move || remove(&path)).await
    }

    async fn list_categories(&self) -> RepositoryResult<Vec<String>> {
        let root = self.root.clone();
        blocking(move || list_names(&root, dir_name)).await
    }

    async fn list_keys(&self, category: &str) -> RepositoryResult<Vec<String>> {
        let dir = self.root.join(segment(category)?);
        blocking(move || list_names(&dir, json_stem)).await
    }

    async fn search(&self, category: &str, query: &str) -> RepositoryResult<Vec<KnowledgeEntry>> {
        let mut found = Vec::new();
        for key in self.list_keys(category).await? {
            match self.get(category, &key).await {
                Ok(Some(entry)) if entry.matches(query) => found.push(entry),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable knowledge item {category}/{key}: {e}"),
            }
        }
        Ok(found)
    }
}

/// Brain states stored one JSON file per agent.
#[derive(Debug, Clone)]
pub struct FileBrainStateRepository {
    root: PathBuf,
}

impl FileBrainStateRepository {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            root: base.as_ref().join(BRAIN_STATE_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn state_path(&self, ai_name: &str) -> RepositoryResult<PathBuf> {
        Ok(self.root.join(format!("{}.json", segment(ai_name)?)))
    }

    fn backup_path(&self, name: &str) -> RepositoryResult<PathBuf> {
        Ok(self
            .root
            .join(BACKUP_DIR)
            .join(format!("{}.json", segment(name)?)))
    }
}

#[async_trait]
impl BrainStateRepository for FileBrainStateRepository {
    async fn create(&self, state: &BrainState) -> RepositoryResult<()> {
        let path = self.state_path(&state.ai_name)?;
        let state = state.clone();
        blocking(move || {
            if path.exists() {
                return Err(RepositoryError::AlreadyExists(state.ai_name.clone()));
            }
            write_json(&path, &state)
        })
        .await
    }

    async fn load(&self, ai_name: &str) -> RepositoryResult<Option<BrainState>> {
        let path = self.state_path(ai_name)?;
        blocking(move || read_json(&path)).await
    }

    async fn save(&self, state: &BrainState) -> RepositoryResult<()> {
        let path = self.state_path(&state.ai_name)?;
        let state = state.clone();
        blocking(move || write_json(&path, &state)).await
    }

    async fn update(&self, ai_name: &str, key: &str, value: Value) -> RepositoryResult<bool> {
        let path = self.state_path(ai_name)?;
        let key = key.to_string();
        blocking(move || {
            let Some(mut state) = read_json::<BrainState>(&path)? else {
                return Ok(false);
            };
            state.set(key, value);
            write_json(&path, &state)?;
            Ok(true)
        })
        .await
    }

    async fn get(&self, ai_name: &str, key: &str) -> RepositoryResult<Option<Value>> {
        Ok(self
            .load(ai_name)
            .await?
            .and_then(|state| state.get(key).cloned()))
    }

    async fn delete(&self, ai_name: &str) -> RepositoryResult<bool> {
        let path = self.state_path(ai_name)?;
        blocking(move || remove(&path)).await
    }

    async fn list(&self) -> RepositoryResult<Vec<String>> {
        let root = self.root.clone();
        blocking(move || {
            list_names(&root, |p| if p.is_file() { json_stem(p) } else { None })
        })
        .await
    }

    async fn backup(&self, ai_name: &str, suffix: Option<&str>) -> RepositoryResult<Option<String>> {
        let Some(state) = self.load(ai_name).await? else {
            return Ok(None);
        };
        let name = backup_name(ai_name, suffix);
        let path = self.backup_path(&name)?;
        blocking(move || write_json(&path, &state)).await?;
        tracing::debug!("Backed up brain state for {ai_name} as {name}");
        Ok(Some(name))
    }

    async fn restore(&self, ai_name: &str, backup_name: &str) -> RepositoryResult<bool> {
        let backup = self.backup_path(backup_name)?;
        let target = self.state_path(ai_name)?;
        let ai_name = ai_name.to_string();
        blocking(move || {
            let Some(mut state) = read_json::<BrainState>(&backup)? else {
                return Ok(false);
            };
            state.ai_name = ai_name;
            state.last_updated = Utc::now();
            write_json(&target, &state)?;
            Ok(true)
        })
        .await
    }
}
