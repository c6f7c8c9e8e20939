//! Mailboxes inside a git worktree shared by both agents:
//! `<root>/<role>/{inbox,processed,outbox}`. Receiving moves each file from
//! `inbox/` to `processed/`, so a message is delivered once.

pub mod setup;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use gitbrain_core::model::Message;

use crate::error::TransportError;
use crate::file::{blocking, message_files};
use crate::transport::{role_segment, sort_oldest_first, MailboxTransport, MessageLocation};

pub use setup::ensure_shared_worktree;

const INBOX: &str = "inbox";
const PROCESSED: &str = "processed";
const OUTBOX: &str = "outbox";

#[derive(Debug, Clone)]
pub struct WorktreeMailbox {
    root: PathBuf,
}

impl WorktreeMailbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn inbox(&self, role: &str) -> Result<PathBuf, TransportError> {
        Ok(self.root.join(role_segment(role)?).join(INBOX))
    }

    pub fn processed(&self, role: &str) -> Result<PathBuf, TransportError> {
        Ok(self.root.join(role_segment(role)?).join(PROCESSED))
    }

    /// Create `inbox/`, `processed/` and `outbox/` for `role`.
    pub fn setup_role_directory(&self, role: &str) -> Result<PathBuf, TransportError> {
        let dir = self.root.join(role_segment(role)?);
        for sub in [INBOX, PROCESSED, OUTBOX] {
            let path = dir.join(sub);
            fs::create_dir_all(&path).map_err(|e| TransportError::write(&path, e))?;
        }
        Ok(dir)
    }

    fn file_name(message: &Message) -> String {
        format!("{}_{}.json", message.timestamp().timestamp_millis(), message.id())
    }
}

#[async_trait]
impl MailboxTransport for WorktreeMailbox {
    fn name(&self) -> &'static str {
        "worktree"
    }

    async fn send(&self, message: &Message, to: &str) -> Result<MessageLocation, TransportError> {
        let inbox = self.inbox(to)?;
        let name = Self::file_name(message);
        let json = message.to_json()?;
        blocking(move || {
            fs::create_dir_all(&inbox).map_err(|e| TransportError::write(&inbox, e))?;
            let path = inbox.join(&name);
            write_atomic(&path, json.as_bytes())?;
            tracing::debug!("Delivered message to {}", path.display());
            Ok(MessageLocation::Path(path))
        })
        .await
    }

    async fn receive(&self, role: &str) -> Result<Vec<Message>, TransportError> {
        let inbox = self.inbox(role)?;
        let processed = self.processed(role)?;
        blocking(move || {
            let mut batch = Vec::new();
            for path in message_files(&inbox)? {
                let message = match fs::read_to_string(&path)
                    .map_err(|e| TransportError::read(&path, e))
                    .and_then(|data| Ok(Message::from_json(&data)?))
                {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!("Leaving undecodable message {} in inbox: {e}", path.display());
                        continue;
                    }
                };
                let Some(name) = path.file_name() else { continue };
                if let Err(e) = fs::create_dir_all(&processed) {
                    tracing::warn!("Skipping {}: {e}", path.display());
                    continue;
                }
                let target = processed.join(name);
                match fs::rename(&path, &target) {
                    Ok(()) => batch.push((message, target)),
                    Err(e) => tracing::warn!("Skipping {}: move to processed failed: {e}", path.display()),
                }
            }
            sort_oldest_first(&mut batch);
            Ok(batch.into_iter().map(|(m, _)| m).collect())
        })
        .await
    }

    async fn clear(&self, role: &str) -> Result<usize, TransportError> {
        let dirs = [self.inbox(role)?, self.processed(role)?];
        blocking(move || {
            let mut removed = 0;
            for dir in &dirs {
                for path in message_files(dir)? {
                    match fs::remove_file(&path) {
                        Ok(()) => removed += 1,
                        Err(e) => tracing::warn!("Failed to remove {}: {e}", path.display()),
                    }
                }
            }
            Ok(removed)
        })
        .await
    }

    async fn count(&self, role: &str) -> Result<usize, TransportError> {
        let inbox = self.inbox(role)?;
        blocking(move || Ok(message_files(&inbox)?.len())).await
    }
}

/// Write to a hidden temp file in the same directory, then rename over
/// `path`, so readers never observe a partial file.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), TransportError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile_in(dir, path)?;
    tmp.1
        .write_all(data)
        .and_then(|_| tmp.1.sync_all())
        .map_err(|e| TransportError::write(&tmp.0, e))?;
    fs::rename(&tmp.0, path).map_err(|e| {
        let _ = fs::remove_file(&tmp.0);
        TransportError::write(path, e)
    })
}

fn tempfile_in(dir: &Path, target: &Path) -> Result<(PathBuf, fs::File), TransportError> {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    // Leading dot and a non-json extension keep it out of `message_files`.
    let tmp = dir.join(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()));
    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp)
        .map_err(|e| TransportError::write(&tmp, e))?;
    Ok((tmp, file))
}
