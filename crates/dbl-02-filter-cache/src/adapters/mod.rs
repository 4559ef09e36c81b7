//! Adapters Layer - File system access for the cache directory

pub mod files;
pub mod lock;

pub use lock::CacheLock;
