//! Domain Layer - Index model and migration
//!
//! RULES:
//! - No I/O operations; file existence is asked through a closure

pub mod entities;
pub mod index;
pub mod migration;

pub use entities::CachedFileFilter;
pub use index::{CacheIndex, CURRENT_INDEX_FORMAT};
pub use migration::{load_index, IndexLoad, PROFILES_DIR};
