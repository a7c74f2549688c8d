//! Uniform random selection over a slice.

use rand::Rng;
use thiserror::Error;

/// Raised when asked to choose from an empty collection.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot choose from an empty collection of {what}")]
pub struct EmptyChoice {
    /// What was being chosen, for the error message ("spawn points", ...)
    pub what: &'static str,
}

/// Picks one element of `items` uniformly at random.
///
/// Fails with [`EmptyChoice`] instead of panicking when `items` is empty;
/// a map without recommended spawn points is a server-side condition the
/// caller reports, not a programming error.
pub fn random_choice<'a, T>(
    items: &'a [T],
    what: &'static str,
    rng: &mut impl Rng,
) -> Result<&'a T, EmptyChoice> {
    if items.is_empty() {
        return Err(EmptyChoice { what });
    }
    Ok(&items[rng.gen_range(0..items.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_empty_slice_is_an_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let items: [u8; 0] = [];
        let err = random_choice(&items, "spawn points", &mut rng).unwrap_err();
        assert_eq!(err.what, "spawn points");
    }

    #[test]
    fn test_singleton_returns_the_element() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let items = ["vehicle.tesla.model3"];
        assert_eq!(
            random_choice(&items, "blueprints", &mut rng).unwrap(),
            &"vehicle.tesla.model3"
        );
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let items: Vec<u32> = (0..100).collect();
        let pick = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..10)
                .map(|_| *random_choice(&items, "items", &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(42), pick(42));
        assert_ne!(pick(42), pick(43));
    }

    #[test]
    fn test_every_element_reachable() {
        let items = [0usize, 1, 2, 3];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[*random_choice(&items, "items", &mut rng).unwrap()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    proptest! {
        #[test]
        fn test_choice_stays_in_bounds(items in prop::collection::vec(any::<i64>(), 1..64), seed: u64) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let chosen = random_choice(&items, "items", &mut rng).unwrap();
            prop_assert!(items.iter().any(|item| std::ptr::eq(item, chosen)));
        }
    }
}
