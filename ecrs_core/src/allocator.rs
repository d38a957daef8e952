//! Stream allocator - reproducible, decorrelated random streams per job.
//!
//! Two independent choices make up a stream:
//! - **Seed index** ("which subsequence"): drawn from entropy for ad-hoc
//!   runs, or looked up in the campaign's seed table by job index. The table
//!   path is reproducible; rerunning job 7 always reports the same index.
//! - **Seed words** ("which state"): two fresh entropy words every run, so an
//!   accidental rerun of the same job does not duplicate its output.
//!
//! ```text
//! SeedSelection ──select_seed_index──► seed index ──install_engine──► EngineSeedState
//!                      │                                  │
//!                SeedTable (lazy)                  EntropySource × 2
//! ```

use crate::context::RunContext;
use crate::error::BootstrapError;
use crate::seed_table::{SeedTable, SEED_TABLE_LEN};
use ecrs_env::EntropySource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Usage text reported for any malformed invocation.
pub const USAGE: &str = "expected [JOB_INDEX [MACRO]] - pick a proper random seed index";

/// A validated job index in `[0, SEED_TABLE_LEN)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobIndex(u32);

impl JobIndex {
    /// Validates a job index against the table bounds.
    pub fn new(index: i64) -> Result<Self, BootstrapError> {
        if (0..SEED_TABLE_LEN as i64).contains(&index) {
            Ok(Self(index as u32))
        } else {
            Err(BootstrapError::Index {
                index,
                max: SEED_TABLE_LEN - 1,
            })
        }
    }
    
    /// Parses a command-line token.
    pub fn parse(token: &str) -> Result<Self, BootstrapError> {
        let index = token
            .trim()
            .parse::<i64>()
            .map_err(|_| BootstrapError::usage(format!("job index '{}' is not an integer; {}", token, USAGE)))?;
        Self::new(index)
    }
    
    pub fn get(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for JobIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the seed index is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSelection {
    /// Fresh index from ambient entropy (ad-hoc runs)
    Entropy,
    
    /// Index looked up in the seed table (campaign jobs)
    Job(JobIndex),
}

impl SeedSelection {
    /// Derives the selection from a full argument vector (program name first).
    ///
    /// - 1 argument: entropy
    /// - 2 or 3 arguments: the first extra argument is the job index
    /// - anything else: usage error
    pub fn from_args(args: &[String]) -> Result<Self, BootstrapError> {
        match args.len() {
            1 => Ok(SeedSelection::Entropy),
            2 | 3 => Ok(SeedSelection::Job(JobIndex::parse(&args[1])?)),
            n => Err(BootstrapError::usage(format!("{} extra arguments given; {}", n.saturating_sub(1), USAGE))),
        }
    }
}

/// One-time seed state of the process-wide engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSeedState {
    /// Raw engine seed words
    pub seeds: [i64; 2],
    
    /// Selected subsequence
    pub seed_index: i64,
}

/// Derives and installs the random stream for one process.
pub struct StreamAllocator {
    /// Seed table resource, read only for job selections
    table_path: PathBuf,
}

impl StreamAllocator {
    /// Creates an allocator reading the seed table from `table_path`.
    pub fn new(table_path: impl AsRef<Path>) -> Self {
        Self {
            table_path: table_path.as_ref().to_path_buf(),
        }
    }
    
    pub fn table_path(&self) -> &Path {
        &self.table_path
    }
    
    /// Chooses the seed index.
    ///
    /// The table is loaded only for `SeedSelection::Job`; the job index has
    /// already been bounds-checked by `JobIndex`.
    pub fn select_seed_index(
        &self,
        selection: &SeedSelection,
        entropy: &mut dyn EntropySource,
    ) -> Result<i64, BootstrapError> {
        match selection {
            SeedSelection::Entropy => {
                let seed_index = entropy.next_word();
                info!("Seed index {} drawn from {}", seed_index, entropy.describe());
                Ok(seed_index)
            }
            SeedSelection::Job(job) => {
                let table = SeedTable::load(&self.table_path)?;
                let seed_index = table.get(job.get()).ok_or(BootstrapError::Index {
                    index: job.get() as i64,
                    max: table.len().saturating_sub(1),
                })?;
                info!("Seed index {} selected for job {}", seed_index, job);
                Ok(seed_index)
            }
        }
    }
    
    /// Chooses the seed index from a raw argument vector.
    pub fn select_seed_index_from_args(
        &self,
        args: &[String],
        entropy: &mut dyn EntropySource,
    ) -> Result<i64, BootstrapError> {
        let selection = SeedSelection::from_args(args)?;
        self.select_seed_index(&selection, entropy)
    }
    
    /// Draws two seed words and installs the engine into `ctx`.
    ///
    /// Fails without drawing if an engine is already installed.
    pub fn install_engine(
        &self,
        ctx: &RunContext,
        seed_index: i64,
        entropy: &mut dyn EntropySource,
    ) -> Result<EngineSeedState, BootstrapError> {
        if ctx.engine_installed() {
            return Err(crate::error::SequencingError::EngineAlreadyInstalled.into());
        }
        
        let state = EngineSeedState {
            seeds: [entropy.next_word(), entropy.next_word()],
            seed_index,
        };
        ctx.install_engine(state)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SequencingError;
    use crate::output::OutputChannel;
    use crate::seed_table::tests::write_sample_table;
    use crate::units::UnitTable;
    use proptest::prelude::*;
    use std::sync::Arc;
    
    /// Counter-based entropy for predictable draws.
    struct CountingEntropy(i64);
    
    impl EntropySource for CountingEntropy {
        fn next_word(&mut self) -> i64 {
            self.0 += 1;
            self.0
        }
        
        fn describe(&self) -> String {
            "counter".to_string()
        }
    }
    
    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }
    
    fn context() -> RunContext {
        RunContext::new(UnitTable::campaign().unwrap(), Arc::new(OutputChannel::new()))
    }
    
    #[test]
    fn test_selection_from_args() {
        assert_eq!(SeedSelection::from_args(&args(&["ecrs"])).unwrap(), SeedSelection::Entropy);
        assert_eq!(
            SeedSelection::from_args(&args(&["ecrs", "7"])).unwrap(),
            SeedSelection::Job(JobIndex::new(7).unwrap())
        );
        assert_eq!(
            SeedSelection::from_args(&args(&["ecrs", "7", "run.mac"])).unwrap(),
            SeedSelection::Job(JobIndex::new(7).unwrap())
        );
        assert!(matches!(SeedSelection::from_args(&args(&[])), Err(BootstrapError::Usage(_))));
        assert!(matches!(
            SeedSelection::from_args(&args(&["ecrs", "7", "run.mac", "extra"])),
            Err(BootstrapError::Usage(_))
        ));
    }
    
    #[test]
    fn test_job_index_bounds() {
        assert!(JobIndex::new(0).is_ok());
        assert!(JobIndex::new(9999).is_ok());
        assert!(matches!(JobIndex::new(10_000), Err(BootstrapError::Index { index: 10_000, max: 9999 })));
        assert!(matches!(JobIndex::new(-1), Err(BootstrapError::Index { .. })));
        assert!(matches!(JobIndex::parse("seven"), Err(BootstrapError::Usage(_))));
        assert!(matches!(JobIndex::parse("10000"), Err(BootstrapError::Index { .. })));
    }
    
    #[test]
    fn test_out_of_range_job_never_reads_table() {
        // Path does not exist: an Index error proves the table was not touched
        let allocator = StreamAllocator::new("/nonexistent/ECRS_500kRand.txt");
        let mut entropy = CountingEntropy(0);
        let err = allocator
            .select_seed_index_from_args(&args(&["ecrs", "12000"]), &mut entropy)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Index { .. }));
    }
    
    #[test]
    fn test_missing_table_is_resource_error() {
        let allocator = StreamAllocator::new("/nonexistent/ECRS_500kRand.txt");
        let mut entropy = CountingEntropy(0);
        let err = allocator
            .select_seed_index(&SeedSelection::Job(JobIndex::new(3).unwrap()), &mut entropy)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::SeedTable(_)));
    }
    
    #[test]
    fn test_job_seven_reproducible_words_fresh() {
        let path = write_sample_table();
        let allocator = StreamAllocator::new(&path);
        
        // Two "processes" with different entropy
        let mut entropy_a = CountingEntropy(100);
        let mut entropy_b = CountingEntropy(900);
        
        let selection = SeedSelection::Job(JobIndex::new(7).unwrap());
        let index_a = allocator.select_seed_index(&selection, &mut entropy_a).unwrap();
        let index_b = allocator.select_seed_index(&selection, &mut entropy_b).unwrap();
        assert_eq!(index_a, 482913);
        assert_eq!(index_b, 482913);
        
        let ctx_a = context();
        let ctx_b = context();
        let state_a = allocator.install_engine(&ctx_a, index_a, &mut entropy_a).unwrap();
        let state_b = allocator.install_engine(&ctx_b, index_b, &mut entropy_b).unwrap();
        
        assert_eq!(state_a.seed_index, state_b.seed_index);
        assert_ne!(state_a.seeds, state_b.seeds);
        let _ = std::fs::remove_file(path);
    }
    
    #[test]
    fn test_entropy_selection_uses_source() {
        let allocator = StreamAllocator::new("/nonexistent/ECRS_500kRand.txt");
        let mut entropy = CountingEntropy(41);
        let index = allocator.select_seed_index(&SeedSelection::Entropy, &mut entropy).unwrap();
        assert_eq!(index, 42);
    }
    
    #[test]
    fn test_install_twice_rejected() {
        let allocator = StreamAllocator::new("unused");
        let ctx = context();
        let mut entropy = CountingEntropy(0);
        
        let first = allocator.install_engine(&ctx, 5, &mut entropy).unwrap();
        assert_eq!(first.seeds, [1, 2]);
        
        let err = allocator.install_engine(&ctx, 6, &mut entropy).unwrap_err();
        assert!(matches!(err, BootstrapError::Sequencing(SequencingError::EngineAlreadyInstalled)));
        assert_eq!(ctx.seed_state(), Some(first));
        
        // No words consumed by the rejected install
        assert_eq!(entropy.next_word(), 3);
    }
    
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        
        #[test]
        fn prop_table_lookup_is_deterministic(j1 in 0i64..10_000, j2 in 0i64..10_000) {
            let table = SeedTable::parse(&crate::seed_table::tests::sample_table_text()).unwrap();
            let path = write_sample_table();
            let allocator = StreamAllocator::new(&path);
            let mut entropy = CountingEntropy(j1 * 7 + j2);
            
            let s1 = allocator.select_seed_index(&SeedSelection::Job(JobIndex::new(j1).unwrap()), &mut entropy).unwrap();
            let s2 = allocator.select_seed_index(&SeedSelection::Job(JobIndex::new(j2).unwrap()), &mut entropy).unwrap();
            
            prop_assert_eq!(Some(s1), table.get(j1 as usize));
            prop_assert_eq!(Some(s2), table.get(j2 as usize));
            let _ = std::fs::remove_file(path);
        }
    }
}
