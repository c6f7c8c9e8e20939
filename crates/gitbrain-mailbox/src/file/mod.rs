//! One JSON file per message under `<root>/<recipient>/`, named
//! `<ISO8601>_<id>.json` so that lexicographic order is chronological.

pub mod lock;

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use gitbrain_core::model::Message;

use self::lock::MessageLock;
use crate::error::TransportError;
use crate::transport::{role_segment, sort_oldest_first, MailboxTransport, MessageLocation};

/// Timestamp part of a message file name. Fixed width, so names sort by time.
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

#[derive(Debug, Clone)]
pub struct FileMailbox {
    root: PathBuf,
}

impl FileMailbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn role_dir(&self, role: &str) -> Result<PathBuf, TransportError> {
        Ok(self.root.join(role_segment(role)?))
    }

    pub fn file_name(message: &Message) -> String {
        format!(
            "{}_{}.json",
            message.timestamp().format(FILE_TIMESTAMP_FORMAT),
            message.id()
        )
    }
}

#[async_trait]
impl MailboxTransport for FileMailbox {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn send(&self, message: &Message, to: &str) -> Result<MessageLocation, TransportError> {
        let dir = self.role_dir(to)?;
        let path = dir.join(Self::file_name(message));
        let json = message.to_json()?;
        blocking(move || {
            fs::create_dir_all(&dir).map_err(|e| TransportError::write(&dir, e))?;
            let _lock = MessageLock::acquire(&path)?;
            fs::write(&path, json).map_err(|e| TransportError::write(&path, e))?;
            tracing::debug!("Wrote message to {}", path.display());
            Ok(MessageLocation::Path(path))
        })
        .await
    }

    async fn receive(&self, role: &str) -> Result<Vec<Message>, TransportError> {
        let dir = self.role_dir(role)?;
        blocking(move || {
            let mut batch = Vec::new();
            for path in message_files(&dir)? {
                let _guard = match MessageLock::probe(&path) {
                    Ok(guard) => guard,
                    Err(TransportError::Locked(_)) => {
                        tracing::debug!("Skipping {} while it is being written", path.display());
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!("Skipping {}: {e}", path.display());
                        continue;
                    }
                };
                let data = match fs::read_to_string(&path) {
                    Ok(data) => data,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable message {}: {e}", path.display());
                        continue;
                    }
                };
                match Message::from_json(&data) {
                    Ok(message) => batch.push((message, path)),
                    Err(e) => tracing::warn!("Skipping malformed message {}: {e}", path.display()),
                }
            }
            sort_oldest_first(&mut batch);
            Ok(batch.into_iter().map(|(m, _)| m).collect())
        })
        .await
    }

    async fn clear(&self, role: &str) -> Result<usize, TransportError> {
        let dir = self.role_dir(role)?;
        blocking(move || {
            let mut removed = 0;
            for path in message_files(&dir)? {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!("Failed to remove {}: {e}", path.display()),
                }
            }
            Ok(removed)
        })
        .await
    }

    async fn count(&self, role: &str) -> Result<usize, TransportError> {
        let dir = self.role_dir(role)?;
        blocking(move || Ok(message_files(&dir)?.len())).await
    }

    /// Delete the message file; until then the message is redelivered.
    async fn acknowledge(&self, role: &str, message: &Message) -> Result<(), TransportError> {
        let dir = self.role_dir(role)?;
        let suffix = format!("_{}.json", message.id());
        blocking(move || {
            for path in message_files(&dir)? {
                let matches = path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with(&suffix));
                if matches {
                    return fs::remove_file(&path).map_err(|e| TransportError::write(&path, e));
                }
            }
            Ok(())
        })
        .await
    }
}

/// `*.json` files directly in `dir`. A missing directory is an empty mailbox.
pub(crate) fn message_files(dir: &Path) -> Result<Vec<PathBuf>, TransportError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(TransportError::read(dir, e)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| TransportError::read(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub(crate) async fn blocking<T, F>(f: F) -> Result<T, TransportError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TransportError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TransportError::ReadFailed(format!("blocking task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use gitbrain_core::model::{Content, Priority};
    use tempfile::TempDir;

    fn message(to: &str, title: &str) -> Message {
        let content = Content::new().with("type", "note").with("title", title);
        Message::new("overseer", to, content, Priority::Normal)
    }

    #[tokio::test]
    async fn test_send_then_receive_in_timestamp_order() {
        let tmp = TempDir::new().unwrap();
        let mailbox = FileMailbox::new(tmp.path());
        let base = Utc::now();

        // Sent out of order; must come back oldest first.
        for offset in [3, 1, 4, 0, 2] {
            let msg = message("coder", &format!("m{offset}"))
                .with_timestamp(base + Duration::milliseconds(offset));
            mailbox.send(&msg, "coder").await.unwrap();
        }

        let received = mailbox.receive("coder").await.unwrap();
        assert_eq!(received.len(), 5);
        let titles: Vec<String> = received
            .iter()
            .map(|m| m.content().get("title").unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["m0", "m1", "m2", "m3", "m4"]);
        assert!(received.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()));
    }

    #[tokio::test]
    async fn test_file_name_encodes_time_and_id() {
        let tmp = TempDir::new().unwrap();
        let mailbox = FileMailbox::new(tmp.path());
        let msg = message("coder", "x");
        let MessageLocation::Path(path) = mailbox.send(&msg, "coder").await.unwrap() else {
            panic!("expected a path");
        };
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(&format!("_{}.json", msg.id())));
        assert!(name.starts_with(&msg.timestamp().format("%Y-%m-%dT").to_string()));
        assert!(!lock::lock_path(&path).exists());
    }

    #[tokio::test]
    async fn test_locked_file_is_skipped_until_released() {
        let tmp = TempDir::new().unwrap();
        let mailbox = FileMailbox::new(tmp.path());
        let msg = message("coder", "in-flight");
        let path = mailbox.role_dir("coder").unwrap().join(FileMailbox::file_name(&msg));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let writer = MessageLock::acquire(&path).unwrap();
        std::fs::write(&path, msg.to_json().unwrap()).unwrap();
        assert!(mailbox.receive("coder").await.unwrap().is_empty());

        drop(writer);
        let received = mailbox.receive("coder").await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].id(), msg.id());
    }

    #[tokio::test]
    async fn test_send_to_locked_target_fails_fast() {
        let tmp = TempDir::new().unwrap();
        let mailbox = FileMailbox::new(tmp.path());
        let msg = message("coder", "x");
        let path = mailbox.role_dir("coder").unwrap().join(FileMailbox::file_name(&msg));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let _held = MessageLock::acquire(&path).unwrap();
        assert!(matches!(
            mailbox.send(&msg, "coder").await,
            Err(TransportError::Locked(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_file_does_not_fail_batch() {
        let tmp = TempDir::new().unwrap();
        let mailbox = FileMailbox::new(tmp.path());
        mailbox.send(&message("coder", "good"), "coder").await.unwrap();
        std::fs::write(
            tmp.path().join("coder/0000-garbage.json"),
            "{ not json",
        )
        .unwrap();

        let received = mailbox.receive("coder").await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(mailbox.count("coder").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_counts() {
        let tmp = TempDir::new().unwrap();
        let mailbox = FileMailbox::new(tmp.path());
        assert_eq!(mailbox.clear("coder").await.unwrap(), 0);
        mailbox.send(&message("coder", "x"), "coder").await.unwrap();
        assert_eq!(mailbox.clear("coder").await.unwrap(), 1);
        assert_eq!(mailbox.clear("coder").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_acknowledge_removes_only_that_message() {
        let tmp = TempDir::new().unwrap();
        let mailbox = FileMailbox::new(tmp.path());
        let a = message("coder", "a");
        let b = message("coder", "b");
        mailbox.send(&a, "coder").await.unwrap();
        mailbox.send(&b, "coder").await.unwrap();

        // Unacknowledged messages are redelivered.
        assert_eq!(mailbox.receive("coder").await.unwrap().len(), 2);
        mailbox.acknowledge("coder", &a).await.unwrap();
        let left = mailbox.receive("coder").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id(), b.id());
    }

    #[tokio::test]
    async fn test_rejects_escaping_role() {
        let tmp = TempDir::new().unwrap();
        let mailbox = FileMailbox::new(tmp.path());
        assert!(mailbox.count("../etc").await.is_err());
    }
}
