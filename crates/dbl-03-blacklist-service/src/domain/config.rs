//! Service configuration

use std::env;
use std::path::PathBuf;

use crate::error::RegistryError;

/// False positive target for bloom files built by the service
pub const DEFAULT_BLOOM_FPP: f64 = 0.001;

pub const DEFAULT_CACHE_DIR: &str = "dbl-cache";

#[derive(Debug, Clone, PartialEq)]
pub struct BlacklistConfig {
    /// Root of the filter cache (`index.json`, `lists/`, `profiles/`)
    pub cache_dir: PathBuf,
    /// Used when a string or hash list arrives without a bloom file
    pub bloom_fpp: f64,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            bloom_fpp: DEFAULT_BLOOM_FPP,
        }
    }
}

impl BlacklistConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DBL_CACHE_DIR`: cache root (default: dbl-cache)
    /// - `DBL_BLOOM_FPP`: bloom false positive target (default: 0.001)
    pub fn from_env() -> Self {
        Self {
            cache_dir: env::var("DBL_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR)),

            bloom_fpp: env::var("DBL_BLOOM_FPP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_BLOOM_FPP),
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_bloom_fpp(mut self, bloom_fpp: f64) -> Self {
        self.bloom_fpp = bloom_fpp;
        self
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(RegistryError::InvalidConfig("cache_dir must not be empty".into()));
        }
        if !(self.bloom_fpp > 0.0 && self.bloom_fpp < 1.0) {
            return Err(RegistryError::InvalidConfig(format!(
                "bloom_fpp must be in (0, 1), got {}",
                self.bloom_fpp
            )));
        }
        Ok(())
    }
}
