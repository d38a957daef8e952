//! RANECU random engine.
//!
//! L'Ecuyer's combined multiplicative congruential generator with a table
//! of independent sequence rows. A seed index selects the row; the two seed
//! words become that row's state.

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Number of independent sequence rows.
pub const MAX_SEQUENCES: usize = 215;

const ECUYER_A: i64 = 40014;
const ECUYER_B: i64 = 53668;
const ECUYER_C: i64 = 12211;
const ECUYER_D: i64 = 40692;
const ECUYER_E: i64 = 52774;
const ECUYER_F: i64 = 3791;
const SHIFT1: i64 = 2_147_483_563;
const SHIFT2: i64 = 2_147_483_399;
const PREC: f64 = 4.6566128E-10;

/// Snapshot of the engine's active row, for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Active sequence row
    pub sequence: usize,
    
    /// Current state of the row
    pub seeds: [i64; 2],
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RanecuEngine row {} seeds [{}, {}]", self.sequence, self.seeds[0], self.seeds[1])
    }
}

/// RANECU generator.
#[derive(Debug, Clone)]
pub struct RanecuEngine {
    table: Vec<[i64; 2]>,
    sequence: usize,
}

impl RanecuEngine {
    /// Creates an engine with every row at the default state.
    pub fn new() -> Self {
        let table = (0..MAX_SEQUENCES as i64)
            .map(|row| [1 + 2 * row, 2 + 2 * row])
            .collect();
        Self { table, sequence: 0 }
    }
    
    /// Selects the row for `index` and installs the two words as its state.
    ///
    /// Every index maps to row `|index mod 215|`; a negative index does not
    /// mean "keep the current row".
    pub fn set_seeds(&mut self, words: [i64; 2], index: i64) {
        self.sequence = (index % MAX_SEQUENCES as i64).unsigned_abs() as usize;
        // A zero word would pin the row at zero forever
        let s1 = words[0].abs() % SHIFT1;
        let s2 = words[1].abs() % SHIFT2;
        self.table[self.sequence] = [s1.max(1), s2.max(1)];
    }
    
    /// Returns the active row and its state.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            sequence: self.sequence,
            seeds: self.table[self.sequence],
        }
    }
    
    /// Draws a uniform double in (0, 1).
    pub fn flat(&mut self) -> f64 {
        let [mut seed1, mut seed2] = self.table[self.sequence];
        
        let k1 = seed1 / ECUYER_B;
        let k2 = seed2 / ECUYER_E;
        
        seed1 = ECUYER_A * (seed1 - k1 * ECUYER_B) - k1 * ECUYER_C;
        if seed1 < 0 {
            seed1 += SHIFT1;
        }
        seed2 = ECUYER_D * (seed2 - k2 * ECUYER_E) - k2 * ECUYER_F;
        if seed2 < 0 {
            seed2 += SHIFT2;
        }
        
        self.table[self.sequence] = [seed1, seed2];
        
        let mut diff = seed1 - seed2;
        if diff <= 0 {
            diff += SHIFT1 - 1;
        }
        diff as f64 * PREC
    }
}

impl Default for RanecuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for RanecuEngine {
    fn next_u32(&mut self) -> u32 {
        (self.flat() * 4_294_967_296.0) as u64 as u32
    }
    
    fn next_u64(&mut self) -> u64 {
        (u64::from(self.next_u32()) << 32) | u64::from(self.next_u32())
    }
    
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
    
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
