use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::DaemonError;

/// Exclusive lock on a PID file, held for the daemon's lifetime.
#[derive(Debug)]
pub struct DaemonLock {
    file: File,
    path: PathBuf,
}

impl DaemonLock {
    /// Take the lock without waiting and record this process's PID in it.
    pub fn acquire(path: &Path) -> Result<Self, DaemonError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| config_error(path, e))?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| config_error(path, e))?;
        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                let holder = fs::read_to_string(path).unwrap_or_default();
                tracing::warn!("Another daemon holds {} (pid {})", path.display(), holder.trim());
                return Err(DaemonError::AlreadyRunning);
            }
            return Err(config_error(path, e));
        }
        file.set_len(0)
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .and_then(|_| write!(file, "{}", std::process::id()))
            .and_then(|_| file.flush())
            .map_err(|e| config_error(path, e))?;
        tracing::info!("Acquired daemon lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
        let _ = FileExt::unlock(&self.file);
        tracing::debug!("Released daemon lock {}", self.path.display());
    }
}

fn config_error(path: &Path, err: std::io::Error) -> DaemonError {
    DaemonError::ConfigurationError(format!("lock file {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_lock_is_already_running() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("run/daemon.lock");
        let lock = DaemonLock::acquire(&path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            std::process::id().to_string()
        );
        assert!(matches!(
            DaemonLock::acquire(&path),
            Err(DaemonError::AlreadyRunning)
        ));
        drop(lock);
        assert!(!path.exists());
        assert!(DaemonLock::acquire(&path).is_ok());
    }
}
