//! Seeded entropy for reproducible dry runs.

use ecrs_env::{EntropySource, MAX_ENTROPY_WORD};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Entropy source backed by a seeded ChaCha8 RNG.
///
/// Replaces the wall clock when a launch must be replayed exactly,
/// e.g. to audit which words a job was given.
pub struct SeededEntropy {
    seed: u64,
    rng: ChaCha8Rng,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
    
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl EntropySource for SeededEntropy {
    fn next_word(&mut self) -> i64 {
        self.rng.gen_range(0..=MAX_ENTROPY_WORD)
    }
    
    fn describe(&self) -> String {
        format!("seeded ChaCha8 ({})", self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    
    #[test]
    fn test_same_seed_same_words() {
        let mut a = SeededEntropy::new(42);
        let mut b = SeededEntropy::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_word(), b.next_word());
        }
    }
    
    #[test]
    fn test_different_seed_different_words() {
        let mut a = SeededEntropy::new(42);
        let mut b = SeededEntropy::new(43);
        let xs: Vec<i64> = (0..8).map(|_| a.next_word()).collect();
        let ys: Vec<i64> = (0..8).map(|_| b.next_word()).collect();
        assert_ne!(xs, ys);
    }
    
    proptest! {
        #[test]
        fn prop_words_in_range(seed in any::<u64>()) {
            let mut entropy = SeededEntropy::new(seed);
            for _ in 0..16 {
                let w = entropy.next_word();
                prop_assert!((0..=MAX_ENTROPY_WORD).contains(&w));
            }
        }
    }
}
