//! # Error Types
//!
//! Errors raised while interpreting shared configuration values.

use thiserror::Error;

/// A list format tag could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatTagError {
    /// The tag belongs to the domain blacklist family but names no known format.
    #[error("Unknown domain blacklist format: {0}")]
    Unknown(String),
}
