//! Pre-generated seed-index table shared by every job of a campaign.
//!
//! The resource is plain text: exactly `SEED_TABLE_LEN` whitespace-separated
//! integers, read in order. Tokens past the last entry are ignored.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Number of entries in a seed table.
pub const SEED_TABLE_LEN: usize = 10_000;

/// Default resource name, resolved against the working directory.
pub const DEFAULT_SEED_TABLE: &str = "ECRS_500kRand.txt";

/// Seed table resource errors.
#[derive(Debug, Error)]
pub enum SeedTableError {
    #[error("Seed table {path} unreadable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    
    #[error("Seed table entry {position} is not an integer: '{token}'")]
    Malformed { position: usize, token: String },
    
    #[error("Seed table has {found} entries, {expected} required")]
    Short { found: usize, expected: usize },
}

/// Ordered, immutable table of seed indices.
#[derive(Debug, Clone)]
pub struct SeedTable {
    entries: Vec<i64>,
}

impl SeedTable {
    /// Reads the table from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SeedTableError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SeedTableError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&text)?;
        info!("Loaded seed table {} ({} entries)", path.display(), table.len());
        Ok(table)
    }
    
    /// Parses table text.
    pub fn parse(text: &str) -> Result<Self, SeedTableError> {
        let mut entries = Vec::with_capacity(SEED_TABLE_LEN);
        let mut tokens = text.split_whitespace();
        
        for position in 0..SEED_TABLE_LEN {
            let Some(token) = tokens.next() else {
                return Err(SeedTableError::Short {
                    found: position,
                    expected: SEED_TABLE_LEN,
                });
            };
            let value = token.parse::<i64>().map_err(|_| SeedTableError::Malformed {
                position,
                token: token.to_string(),
            })?;
            entries.push(value);
        }
        
        if tokens.next().is_some() {
            debug!("Seed table has trailing entries past {}, ignored", SEED_TABLE_LEN);
        }
        
        Ok(Self { entries })
    }
    
    /// Returns the entry at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<i64> {
        self.entries.get(index).copied()
    }
    
    /// Number of entries (always `SEED_TABLE_LEN`).
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    
    /// Always false for a loaded table.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
