//! File-based locking so only one ndefence writes the artifacts at a time.
//!
//! Uses flock-style advisory locking on a configurable lock file.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Holds an exclusive lock; released when dropped.
pub struct LockGuard {
    _file: File,
}

impl LockGuard {
    /// Attempt to acquire an exclusive lock on `lock_path`.
    /// Returns an error if another instance already holds it.
    ///
    /// Opens with create+read+write (no truncate) so creation and locking
    /// cannot race.
    pub fn acquire(lock_path: &Path) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).ok();
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .with_context(|| format!("Failed to open lock file: {:?}", lock_path))?;

        fs::set_permissions(lock_path, fs::Permissions::from_mode(0o600))
            .context("Failed to set lock file permissions")?;

        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "Another instance of ndefence is already running.\n\
                 If you believe this is an error, remove the lock file: {:?}",
                lock_path
            )
        })?;

        Ok(Self { _file: file })
    }
}
