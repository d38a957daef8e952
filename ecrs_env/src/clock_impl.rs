//! Production entropy source seeded from the wall clock.

use crate::context::{EntropySource, MAX_ENTROPY_WORD};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Entropy source seeded once from wall-clock time.
///
/// Two processes started at different instants draw different words;
/// nothing about the sequence is reproducible.
pub struct ClockEntropy {
    /// Clock reading the generator was seeded with
    clock_seed: u64,
    
    rng: StdRng,
}

impl ClockEntropy {
    /// Seeds a new source from the current time.
    pub fn new() -> Self {
        let clock_seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self {
            clock_seed,
            rng: StdRng::seed_from_u64(clock_seed),
        }
    }
    
    /// Returns the clock reading used as seed.
    pub fn clock_seed(&self) -> u64 {
        self.clock_seed
    }
}

impl Default for ClockEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for ClockEntropy {
    fn next_word(&mut self) -> i64 {
        self.rng.gen_range(0..=MAX_ENTROPY_WORD)
    }
    
    fn describe(&self) -> String {
        format!("wall clock ({})", self.clock_seed)
    }
}
