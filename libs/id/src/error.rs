//! Error types for ID parsing.

use thiserror::Error;

/// Errors returned when a string is not a valid record ID.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The ID string is empty.
    #[error("ID cannot be empty")]
    Empty,

    /// No `_` between prefix and ULID.
    #[error("ID missing underscore separator")]
    MissingSeparator,

    /// The ID belongs to a different record kind.
    #[error("invalid ID prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        expected: &'static str,
        actual: String,
    },

    /// The ULID portion does not decode.
    #[error("invalid ULID: {0}")]
    InvalidUlid(String),
}
