//! Randomized prefix selection kept for older callers.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::{all_prefixes, TagError};

/// Picks a uniformly random prefix that is not in `used`.
///
/// Unlike [`crate::next_available_prefix`] this has no ordering guarantee and
/// ignores capacity. Fails with [`TagError::Exhausted`] once every prefix is in
/// `used`.
#[deprecated(note = "use next_available_prefix or TagAllocator for deterministic allocation")]
pub fn random_unused_prefix<R>(used: &HashSet<String>, rng: &mut R) -> Result<String, TagError>
where
    R: Rng + ?Sized,
{
    let available: Vec<String> = all_prefixes().filter(|p| !used.contains(p)).collect();
    available.choose(rng).cloned().ok_or(TagError::Exhausted)
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_prefix_avoids_used() {
        let used: HashSet<String> = all_prefixes().filter(|p| p != "QX").collect();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(random_unused_prefix(&used, &mut rng).unwrap(), "QX");
    }

    #[test]
    fn test_random_prefix_from_domain() {
        let used = HashSet::from(["A".to_string(), "B".to_string()]);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let prefix = random_unused_prefix(&used, &mut rng).unwrap();
            assert!(!used.contains(&prefix));
            assert!(all_prefixes().any(|p| p == prefix));
        }
    }

    #[test]
    fn test_random_prefix_exhausted() {
        let used: HashSet<String> = all_prefixes().collect();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            random_unused_prefix(&used, &mut rng),
            Err(TagError::Exhausted)
        );
    }
}
