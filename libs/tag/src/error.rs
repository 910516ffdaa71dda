//! Error types for tag allocation.

use thiserror::Error;

/// Errors that can occur while allocating tags.
///
/// Parsing never fails with an error; unreadable tags are simply `None`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagError {
    /// Every prefix in the domain has reached capacity.
    #[error("No available prefixes")]
    Exhausted,

    /// The per-prefix capacity is outside the supported range.
    #[error("invalid prefix capacity {capacity}: must be between 1 and {max}")]
    InvalidCapacity { capacity: u32, max: u32 },
}

impl TagError {
    /// Returns true if this error means the tag space is used up.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, TagError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_exhausted() {
        assert!(TagError::Exhausted.is_exhausted());
        assert!(!TagError::InvalidCapacity { capacity: 0, max: 999 }.is_exhausted());
        assert_eq!(TagError::Exhausted.to_string(), "No available prefixes");
    }
}
