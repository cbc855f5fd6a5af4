use crate::error::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const LOCK_FILE_NAME: &str = ".repo-backup.lock";

/// Advisory lock on a destination root. Held for the lifetime of the value;
/// the lock file is removed on drop.
#[derive(Debug)]
pub struct DestinationLock {
    path: PathBuf,
}

impl DestinationLock {
    pub fn acquire(destination_root: &Path) -> Result<Self> {
        let path = destination_root.join(LOCK_FILE_NAME);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::DestinationLocked { lock_file: path });
            }
            Err(e) => return Err(Error::filesystem(&path, e)),
        };
        writeln!(file, "{}", std::process::id()).map_err(|e| Error::filesystem(&path, e))?;
        debug!("Acquired destination lock {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DestinationLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let dir = tempdir().unwrap();
        let lock = DestinationLock::acquire(dir.path()).unwrap();
        assert!(lock.path().exists());
        assert!(matches!(
            DestinationLock::acquire(dir.path()),
            Err(Error::DestinationLocked { .. })
        ));
        drop(lock);
        assert!(!dir.path().join(LOCK_FILE_NAME).exists());
        DestinationLock::acquire(dir.path()).unwrap();
    }
}
