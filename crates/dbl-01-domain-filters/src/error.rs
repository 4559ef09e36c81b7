//! Error types for the domain filter crate

use thiserror::Error;

/// Errors that can occur while building, loading or querying filters
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad magic bytes in {kind} file: expected {expected:02x?}, found {found:02x?}")]
    BadMagic {
        kind: &'static str,
        expected: Vec<u8>,
        found: Vec<u8>,
    },

    #[error("Unsupported {kind} format version: {version}")]
    UnsupportedVersion { kind: &'static str, version: u8 },

    #[error("Corrupt {kind} file: {reason}")]
    Corrupt { kind: &'static str, reason: String },

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Filter {0} cannot enumerate its domains")]
    NotEnumerable(String),

    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid rewrite pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl FilterError {
    /// Whether the error means "this file is not a filter we can read",
    /// as opposed to an I/O failure.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            FilterError::BadMagic { .. }
                | FilterError::UnsupportedVersion { .. }
                | FilterError::Corrupt { .. }
                | FilterError::SerializationError(_)
        )
    }

    pub(crate) fn corrupt(kind: &'static str, reason: impl Into<String>) -> Self {
        FilterError::Corrupt {
            kind,
            reason: reason.into(),
        }
    }
}
