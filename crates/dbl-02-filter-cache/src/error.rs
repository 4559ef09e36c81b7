//! Error types for the filter cache

use std::io;
use std::path::PathBuf;

use shared_types::CachedFilterKey;
use thiserror::Error;

/// Errors that can occur while reading or mutating the cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Index serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache directory already in use ({})", path.display())]
    Locked { path: PathBuf },

    #[error("Artifact {key} needs a storage file but none was given")]
    MissingStorageFile { key: CachedFilterKey },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Attach a path to an I/O result
pub(crate) trait IoContext<T> {
    fn at(self, path: &std::path::Path) -> Result<T, CacheError>;
}

impl<T> IoContext<T> for Result<T, io::Error> {
    fn at(self, path: &std::path::Path) -> Result<T, CacheError> {
        self.map_err(|e| CacheError::io(path, e))
    }
}
