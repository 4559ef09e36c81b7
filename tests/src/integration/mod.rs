//! Cross-crate integration tests

pub mod composition;
pub mod flows;
pub mod migration;
