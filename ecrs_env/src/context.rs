//! Entropy seam for the stream allocator.

/// Largest value an entropy word can take (the classic `RAND_MAX`).
pub const MAX_ENTROPY_WORD: i64 = i32::MAX as i64;

/// Ambient, non-cryptographic entropy used to seed the random stream.
///
/// # Implementations
///
/// - **Production**: `ClockEntropy` - seeded from the wall clock once
/// - **Dry runs / tests**: a seeded implementation for reproducible draws
///
/// Words are always in `0..=MAX_ENTROPY_WORD`.
pub trait EntropySource {
    /// Draws the next entropy word.
    fn next_word(&mut self) -> i64;
    
    /// Describes where the entropy comes from (for logging).
    fn describe(&self) -> String;
}
