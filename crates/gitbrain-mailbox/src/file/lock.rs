use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::TransportError;

/// Path of the sibling lock file for a message file.
pub fn lock_path(message_path: &Path) -> PathBuf {
    let mut name = message_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    message_path.with_file_name(name)
}

/// A non-blocking exclusive lock on a message file's sibling `.lock` file.
/// Released, and the lock file removed, on drop.
#[derive(Debug)]
pub struct MessageLock {
    file: File,
    path: PathBuf,
}

impl MessageLock {
    /// Take the lock for writing `message_path`. Fails with `Locked` instead
    /// of waiting if someone else holds it.
    pub fn acquire(message_path: &Path) -> Result<Self, TransportError> {
        let path = lock_path(message_path);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| TransportError::write(&path, e))?;
        Self::try_lock(file, path)
    }

    /// Take the lock for reading `message_path`. Returns `Ok(None)` when no
    /// lock file exists, meaning no writer is or was active.
    pub fn probe(message_path: &Path) -> Result<Option<Self>, TransportError> {
        let path = lock_path(message_path);
        let file = match OpenOptions::new().write(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TransportError::read(&path, e)),
        };
        Self::try_lock(file, path).map(Some)
    }

    fn try_lock(file: File, path: PathBuf) -> Result<Self, TransportError> {
        match fs2::FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Self { file, path }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(TransportError::Locked(path.display().to_string()))
            }
            Err(e) => Err(TransportError::write(&path, e)),
        }
    }
}

impl Drop for MessageLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_is_sibling() {
        let p = Path::new("/tmp/box/coder/2025-01-01T00:00:00.000000Z_x.json");
        assert_eq!(
            lock_path(p),
            PathBuf::from("/tmp/box/coder/2025-01-01T00:00:00.000000Z_x.json.lock")
        );
    }

    #[test]
    fn test_second_acquire_is_locked_not_blocked() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("m.json");
        let held = MessageLock::acquire(&target).unwrap();
        assert!(matches!(
            MessageLock::acquire(&target),
            Err(TransportError::Locked(_))
        ));
        assert!(matches!(
            MessageLock::probe(&target),
            Err(TransportError::Locked(_))
        ));
        drop(held);
        assert!(!lock_path(&target).exists());
        assert!(MessageLock::probe(&target).unwrap().is_none());
    }
}
