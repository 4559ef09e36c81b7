//! # Cache Directory Lock
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on Windows).
//! One process at a time may own a cache directory.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::{CacheError, IoContext};

/// Exclusive lock on a cache directory.
///
/// Acquired when the cache opens, released on drop (RAII).
pub struct CacheLock {
    /// The lock file handle (kept open to maintain lock)
    file: File,
    path: PathBuf,
}

impl CacheLock {
    const LOCK_FILE: &'static str = "LOCK";

    /// Take the lock without waiting.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Locked` if another handle holds the lock.
    pub fn acquire(cache_dir: &Path) -> Result<Self, CacheError> {
        let path = cache_dir.join(Self::LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .at(&path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(CacheError::Locked { path });
        }

        let mut locked = file;
        locked.set_len(0).at(&path)?;
        writeln!(locked, "{}", std::process::id()).at(&path)?;
        locked.sync_all().at(&path)?;
        debug!(path = %path.display(), "Acquired cache lock");

        Ok(Self { file: locked, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        #[allow(clippy::incompatible_msrv)]
        let _ = FileExt::unlock(&self.file);
        debug!(path = %self.path.display(), "Released cache lock");
    }
}
