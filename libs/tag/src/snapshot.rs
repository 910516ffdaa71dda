//! Snapshot of tags already in use.

use std::collections::{HashMap, HashSet};

use crate::{PrefixUsage, Tag};

/// Usage counts and taken numbers per prefix, built from existing tags.
///
/// Strings that do not parse as tags are ignored: they can never collide with
/// an allocated tag.
#[derive(Debug, Clone, Default)]
pub struct TagSnapshot {
    usage: PrefixUsage,
    taken: HashMap<String, HashSet<u32>>,
}

impl TagSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from existing tag strings.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut snapshot = Self::new();
        for tag in tags {
            if let Some(tag) = Tag::parse(tag.as_ref()) {
                snapshot.record(&tag);
            }
        }
        snapshot
    }

    /// Records a tag under its prefix.
    ///
    /// Usage grows for every recorded tag, including repeats of a number
    /// already taken (`A01` after `A1`). Returns false for such a repeat.
    pub fn record(&mut self, tag: &Tag) -> bool {
        *self.usage.entry(tag.prefix().to_string()).or_insert(0) += 1;
        self.taken
            .entry(tag.prefix().to_string())
            .or_default()
            .insert(tag.number())
    }

    /// Returns true if `number` is taken under `prefix`.
    #[must_use]
    pub fn is_taken(&self, prefix: &str, number: u32) -> bool {
        self.taken
            .get(prefix)
            .is_some_and(|numbers| numbers.contains(&number))
    }

    /// Returns the number of tags recorded under `prefix`.
    #[must_use]
    pub fn usage_of(&self, prefix: &str) -> u32 {
        self.usage.get(prefix).copied().unwrap_or(0)
    }

    /// Returns the per-prefix usage counts.
    #[must_use]
    pub fn usage(&self) -> &PrefixUsage {
        &self.usage
    }

    pub(crate) fn mark_full(&mut self, prefix: &str, capacity: u32) {
        self.usage.insert(prefix.to_string(), capacity);
    }

    /// Number of distinct `(prefix, number)` slots taken.
    #[must_use]
    pub fn len(&self) -> usize {
        self.taken.values().map(HashSet::len).sum()
    }

    /// Returns true if no tags are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_per_prefix() {
        let snapshot = TagSnapshot::from_tags(["A1", "A2", "B7", "AA3"]);
        assert_eq!(snapshot.usage_of("A"), 2);
        assert_eq!(snapshot.usage_of("B"), 1);
        assert_eq!(snapshot.usage_of("AA"), 1);
        assert_eq!(snapshot.usage_of("C"), 0);
        assert!(snapshot.is_taken("B", 7));
        assert!(!snapshot.is_taken("B", 8));
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn test_snapshot_ignores_unparseable() {
        let snapshot = TagSnapshot::from_tags(["a1", "COW", "A1234", ""]);
        assert!(snapshot.is_empty());
        assert!(snapshot.usage().is_empty());
    }

    #[test]
    fn test_snapshot_repeated_slot_counts_each_tag() {
        // "A01" and "A1" share a slot but are separate tags.
        let snapshot = TagSnapshot::from_tags(["A1", "A01", "A1"]);
        assert_eq!(snapshot.usage_of("A"), 3);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.is_taken("A", 1));
    }

    #[test]
    fn test_snapshot_record_incrementally() {
        let mut snapshot = TagSnapshot::from_tags(["C3"]);
        assert!(snapshot.record(&Tag::new("C", 4)));
        assert_eq!(snapshot.usage_of("C"), 2);
        assert!(!snapshot.record(&Tag::new("C", 4)));
        assert_eq!(snapshot.usage_of("C"), 3);
    }
}
