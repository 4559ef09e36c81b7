//! Domain Layer - Configuration and update outcomes

pub mod config;
pub mod update;

pub use config::{BlacklistConfig, DEFAULT_BLOOM_FPP, DEFAULT_CACHE_DIR};
pub use update::UpdateSummary;
