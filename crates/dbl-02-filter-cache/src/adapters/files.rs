//! File system helpers for the cache directory

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{CacheError, IoContext};

fn temp_beside(dest: &Path) -> Result<NamedTempFile, CacheError> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    NamedTempFile::new_in(dir).at(dir)
}

fn persist(temp: NamedTempFile, dest: &Path) -> Result<(), CacheError> {
    temp.as_file().sync_all().at(dest)?;
    temp.persist(dest).map_err(|e| CacheError::io(dest, e.error))?;
    Ok(())
}

/// Replace `dest` with `bytes`; readers see the old or the new content.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let mut temp = temp_beside(dest)?;
    temp.write_all(bytes).at(dest)?;
    persist(temp, dest)
}

/// Copy `src` to `dest` through a temporary file in the destination directory.
pub fn copy_atomic(src: &Path, dest: &Path) -> Result<u64, CacheError> {
    let mut source = File::open(src).at(src)?;
    let mut temp = temp_beside(dest)?;
    let copied = io::copy(&mut source, &mut temp).at(src)?;
    persist(temp, dest)?;
    Ok(copied)
}

/// Remove a file; a file that is already gone is not an error.
pub fn remove_quietly(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

/// Delete everything inside `dir`, keeping the directory itself.
pub fn wipe_dir(dir: &Path) -> Result<usize, CacheError> {
    let mut removed = 0;
    for entry in fs::read_dir(dir).at(dir)? {
        let path = entry.at(dir)?.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove stale cache file"),
        }
    }
    Ok(removed)
}
