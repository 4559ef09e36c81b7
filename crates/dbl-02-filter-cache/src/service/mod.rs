//! Service Layer - Cache orchestration

pub mod filter_cache;

pub use filter_cache::{FilterCache, INDEX_FILE, LISTS_DIR};
