//! Batch tag allocation.

use crate::{
    next_available_prefix_with_capacity, Tag, TagError, TagSnapshot, MAX_PREFIX_CAPACITY,
    PREFIX_CAPACITY, PREFIX_COUNT,
};

/// Deterministic batch allocator.
///
/// Fills the lowest available prefix up to its capacity before moving to the
/// next prefix in scan order, skipping numbers already present in the
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagAllocator {
    capacity: u32,
}

impl Default for TagAllocator {
    fn default() -> Self {
        Self {
            capacity: PREFIX_CAPACITY,
        }
    }
}

impl TagAllocator {
    /// Creates an allocator with the given per-prefix capacity.
    pub fn new(capacity: u32) -> Result<Self, TagError> {
        if !(1..=MAX_PREFIX_CAPACITY).contains(&capacity) {
            return Err(TagError::InvalidCapacity {
                capacity,
                max: MAX_PREFIX_CAPACITY,
            });
        }
        Ok(Self { capacity })
    }

    /// Returns the per-prefix capacity.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Allocates `count` new tags that do not appear in `existing`.
    pub fn allocate<I, S>(&self, existing: I, count: usize) -> Result<Vec<String>, TagError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allocate_from(TagSnapshot::from_tags(existing), count)
    }

    /// Allocates `count` new tags against a prepared snapshot.
    ///
    /// The snapshot is consumed; the returned tags are in allocation order.
    pub fn allocate_from(
        &self,
        mut snapshot: TagSnapshot,
        count: usize,
    ) -> Result<Vec<String>, TagError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let capacity = self.capacity;
        let mut prefix = next_available_prefix_with_capacity(snapshot.usage(), capacity)?;

        // Cursor sits one below the first free slot so the loop can pre-increment.
        let mut number = (1..=capacity)
            .find(|n| !snapshot.is_taken(&prefix, *n))
            .map_or(0, |n| n - 1);

        // A batch can never exceed every slot in the domain.
        let bound = PREFIX_COUNT.saturating_mul(capacity as usize);
        let mut tags = Vec::with_capacity(count.min(bound));
        for _ in 0..count {
            number += 1;
            // Usage counts every stored tag, so a prefix can fill up before
            // its numbers run out.
            if number > capacity || snapshot.usage_of(&prefix) >= capacity {
                prefix = self.advance(&mut snapshot, &prefix)?;
                number = 1;
            }

            while snapshot.is_taken(&prefix, number) {
                number += 1;
                if number > capacity {
                    prefix = self.advance(&mut snapshot, &prefix)?;
                    number = 1;
                }
            }

            let tag = Tag::new(prefix.as_str(), number);
            snapshot.record(&tag);
            tags.push(tag.to_string());
        }

        Ok(tags)
    }

    fn advance(&self, snapshot: &mut TagSnapshot, full: &str) -> Result<String, TagError> {
        snapshot.mark_full(full, self.capacity);
        next_available_prefix_with_capacity(snapshot.usage(), self.capacity)
    }
}

/// Allocates `count` tags with an explicit per-prefix capacity.
pub fn allocate<I, S>(existing: I, count: usize, capacity: u32) -> Result<Vec<String>, TagError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    TagAllocator::new(capacity)?.allocate(existing, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::all_prefixes;

    fn filled(prefix: &str, upto: u32) -> Vec<String> {
        (1..=upto).map(|n| format!("{prefix}{n}")).collect()
    }

    #[test]
    fn test_allocate_empty_snapshot() {
        let tags = allocate(Vec::<String>::new(), 3, 50).unwrap();
        assert_eq!(tags, vec!["A1", "A2", "A3"]);
    }

    #[test]
    fn test_allocate_continues_after_existing() {
        let tags = allocate(["A1", "A2"], 3, 50).unwrap();
        assert_eq!(tags, vec!["A3", "A4", "A5"]);
    }

    #[test]
    fn test_allocate_crosses_prefix_boundary() {
        let existing = filled("A", 50);
        let tags = allocate(&existing, 2, 50).unwrap();
        assert_eq!(tags, vec!["B1", "B2"]);
    }

    #[test]
    fn test_allocate_batch_spills_into_next_prefix() {
        let existing = filled("A", 48);
        let tags = allocate(&existing, 4, 50).unwrap();
        assert_eq!(tags, vec!["A49", "A50", "B1", "B2"]);
    }

    #[test]
    fn test_allocate_fills_first_gap() {
        let tags = allocate(["A1", "A2", "A4", "A5", "A7"], 3, 50).unwrap();
        assert_eq!(tags, vec!["A3", "A6", "A8"]);
    }

    #[test]
    fn test_allocate_skips_taken_in_next_prefix() {
        let mut existing = filled("A", 50);
        existing.extend(["B1".to_string(), "B2".to_string(), "B4".to_string()]);
        let tags = allocate(&existing, 3, 50).unwrap();
        assert_eq!(tags, vec!["B3", "B5", "B6"]);
    }

    #[test]
    fn test_allocate_ignores_unparseable_tags() {
        let tags = allocate(["cow-1", "a1", "A1234"], 1, 50).unwrap();
        assert_eq!(tags, vec!["A1"]);
    }

    #[test]
    fn test_allocate_zero_count() {
        assert!(allocate(["A1"], 0, 50).unwrap().is_empty());
    }

    #[test]
    fn test_allocate_with_larger_capacity() {
        let existing = filled("A", 50);
        let tags = allocate(&existing, 2, 99).unwrap();
        assert_eq!(tags, vec!["A51", "A52"]);
    }

    #[test]
    fn test_allocate_rejects_invalid_capacity() {
        assert_eq!(
            allocate(["A1"], 1, 0),
            Err(TagError::InvalidCapacity {
                capacity: 0,
                max: MAX_PREFIX_CAPACITY
            })
        );
        assert!(TagAllocator::new(1000).is_err());
        assert!(TagAllocator::new(MAX_PREFIX_CAPACITY).is_ok());
    }

    #[test]
    fn test_allocate_exhausted_domain() {
        let existing: Vec<String> = all_prefixes().map(|p| format!("{p}1")).collect();
        assert_eq!(allocate(&existing, 1, 1), Err(TagError::Exhausted));
    }

    #[test]
    fn test_allocate_exhausts_mid_batch() {
        // Capacity 1 leaves only ZZ free.
        let existing: Vec<String> = all_prefixes()
            .take(crate::PREFIX_COUNT - 1)
            .map(|p| format!("{p}1"))
            .collect();
        assert_eq!(allocate(&existing, 1, 1).unwrap(), vec!["ZZ1"]);
        assert_eq!(allocate(&existing, 2, 1), Err(TagError::Exhausted));
    }

    #[test]
    fn test_allocate_default_capacity() {
        let allocator = TagAllocator::default();
        assert_eq!(allocator.capacity(), PREFIX_CAPACITY);
        let existing = filled("A", PREFIX_CAPACITY);
        assert_eq!(allocator.allocate(&existing, 1).unwrap(), vec!["B1"]);
    }

    #[test]
    fn test_allocate_from_snapshot() {
        let mut snapshot = TagSnapshot::from_tags(["A1"]);
        snapshot.record(&Tag::new("A", 2));
        let tags = TagAllocator::default().allocate_from(snapshot, 1).unwrap();
        assert_eq!(tags, vec!["A3"]);
    }

    #[test]
    fn test_allocate_counts_repeated_slots_toward_capacity() {
        // 49 tags plus A01 puts 50 tags under A.
        let mut existing = filled("A", 49);
        existing.push("A01".to_string());
        assert_eq!(allocate(&existing, 1, 50).unwrap(), vec!["B1"]);
    }

    #[test]
    fn test_allocate_stops_at_capacity_mid_batch() {
        // 49 tags under A leave room for exactly one more.
        let mut existing = filled("A", 48);
        existing.push("A01".to_string());
        assert_eq!(allocate(&existing, 2, 50).unwrap(), vec!["A49", "B1"]);
    }
}
