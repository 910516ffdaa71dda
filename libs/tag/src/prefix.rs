//! Prefix domain enumeration and deterministic prefix selection.

use std::collections::HashMap;
use std::iter::FusedIterator;

use crate::{TagError, PREFIX_CAPACITY};

const LETTERS: u8 = 26;

/// Total number of prefixes: 26 single letters plus 26 * 26 letter pairs.
pub const PREFIX_COUNT: usize = 26 + 26 * 26;

/// Count of existing tags per prefix.
pub type PrefixUsage = HashMap<String, u32>;

/// Iterator over the prefix domain in scan order.
///
/// Yields `A`..`Z`, then `AA`, `AB`, .., `AZ`, `BA`, .., `ZZ`.
#[derive(Debug, Clone, Default)]
pub struct Prefixes {
    next: usize,
}

impl Prefixes {
    /// Creates an iterator positioned at `A`.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    fn prefix_at(index: usize) -> String {
        let letter = |offset: usize| char::from(b'A' + offset as u8);
        let singles = LETTERS as usize;

        if index < singles {
            letter(index).to_string()
        } else {
            let pair = index - singles;
            let mut prefix = String::with_capacity(2);
            prefix.push(letter(pair / singles));
            prefix.push(letter(pair % singles));
            prefix
        }
    }
}

impl Iterator for Prefixes {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= PREFIX_COUNT {
            return None;
        }
        let prefix = Self::prefix_at(self.next);
        self.next += 1;
        Some(prefix)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = PREFIX_COUNT.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Prefixes {}

impl FusedIterator for Prefixes {}

/// Returns the full prefix domain in scan order.
#[must_use]
pub fn all_prefixes() -> Prefixes {
    Prefixes::new()
}

/// Returns the first prefix whose usage is below [`PREFIX_CAPACITY`].
pub fn next_available_prefix(usage: &PrefixUsage) -> Result<String, TagError> {
    next_available_prefix_with_capacity(usage, PREFIX_CAPACITY)
}

/// Returns the first prefix in scan order whose usage is below `capacity`.
///
/// Prefixes missing from `usage` count as unused. Fails with
/// [`TagError::Exhausted`] when every prefix is at or above capacity.
pub fn next_available_prefix_with_capacity(
    usage: &PrefixUsage,
    capacity: u32,
) -> Result<String, TagError> {
    all_prefixes()
        .find(|prefix| usage.get(prefix).copied().unwrap_or(0) < capacity)
        .ok_or(TagError::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_domain_shape() {
        let prefixes: Vec<String> = all_prefixes().collect();
        assert_eq!(prefixes.len(), 702);
        assert_eq!(prefixes[0], "A");
        assert_eq!(prefixes[25], "Z");
        assert_eq!(prefixes[26], "AA");
        assert_eq!(prefixes[27], "AB");
        assert_eq!(prefixes[51], "AZ");
        assert_eq!(prefixes[52], "BA");
        assert_eq!(prefixes.last().map(String::as_str), Some("ZZ"));
    }

    #[test]
    fn test_prefix_domain_unique() {
        let unique: std::collections::HashSet<_> = all_prefixes().collect();
        assert_eq!(unique.len(), PREFIX_COUNT);
    }

    #[test]
    fn test_prefixes_exact_size() {
        let mut prefixes = all_prefixes();
        assert_eq!(prefixes.len(), PREFIX_COUNT);
        prefixes.nth(700);
        assert_eq!(prefixes.len(), 1);
        assert_eq!(prefixes.next().as_deref(), Some("ZZ"));
        assert_eq!(prefixes.next(), None);
        assert_eq!(prefixes.len(), 0);
    }

    #[test]
    fn test_prefixes_restartable() {
        let first: Vec<_> = all_prefixes().take(30).collect();
        let second: Vec<_> = all_prefixes().take(30).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_next_available_empty_usage() {
        assert_eq!(next_available_prefix(&PrefixUsage::new()).unwrap(), "A");
    }

    #[test]
    fn test_next_available_skips_full_prefixes() {
        let mut usage = PrefixUsage::new();
        usage.insert("A".to_string(), PREFIX_CAPACITY);
        usage.insert("B".to_string(), PREFIX_CAPACITY + 3);
        usage.insert("C".to_string(), PREFIX_CAPACITY - 1);
        assert_eq!(next_available_prefix(&usage).unwrap(), "C");
    }

    #[test]
    fn test_next_available_moves_to_pairs() {
        let usage: PrefixUsage = all_prefixes()
            .take(26)
            .map(|p| (p, PREFIX_CAPACITY))
            .collect();
        assert_eq!(next_available_prefix(&usage).unwrap(), "AA");
    }

    #[test]
    fn test_next_available_exhausted() {
        let usage: PrefixUsage = all_prefixes().map(|p| (p, PREFIX_CAPACITY)).collect();
        assert_eq!(next_available_prefix(&usage), Err(TagError::Exhausted));
    }

    #[test]
    fn test_next_available_custom_capacity() {
        let mut usage = PrefixUsage::new();
        usage.insert("A".to_string(), 2);
        assert_eq!(next_available_prefix_with_capacity(&usage, 2).unwrap(), "B");
        assert_eq!(next_available_prefix_with_capacity(&usage, 3).unwrap(), "A");
    }
}
