//! # Shared Types Crate
//!
//! Identity and format types shared by every domain blacklist crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: list keys, storage formats and configured
//!   list descriptions are defined once, here.
//! - **Value Identity**: two artifacts with the same id and version are the
//!   same artifact; nothing in this crate compares by reference.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
