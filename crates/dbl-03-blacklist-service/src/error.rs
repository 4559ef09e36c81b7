//! Error types for the blacklist service

use dbl_01_domain_filters::FilterError;
use dbl_02_filter_cache::CacheError;
use thiserror::Error;

/// Errors that abort an update cycle or prevent the service from starting
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Update worker has stopped")]
    WorkerStopped,

    #[error("Update cycle panicked: {0}")]
    WorkerPanicked(String),
}
