//! Launch plan: which stream and which execution mode.
//!
//! Two input shapes map onto the same plan:
//!
//! | positional          | named                       | plan                          |
//! |---------------------|-----------------------------|-------------------------------|
//! | (none)              | (none)                      | Entropy, Interactive          |
//! | `JOB`               | `--job JOB`                 | Job(JOB), Interactive         |
//! | `JOB MACRO`         | `--job JOB --macro MACRO`   | Job(JOB), BatchScript(MACRO)  |
//! | anything longer     |                             | usage error                   |

use crate::allocator::{JobIndex, SeedSelection, USAGE};
use crate::error::BootstrapError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command prefix used to submit a macro script.
pub const EXECUTE_PREFIX: &str = "/control/execute ";

/// How the process runs once bootstrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Operator-driven session; blocks until the operator exits
    Interactive,
    
    /// Unattended macro script
    BatchScript(PathBuf),
}

impl ExecutionMode {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::Interactive => "interactive",
            ExecutionMode::BatchScript(_) => "batch",
        }
    }
    
    /// Macro script path, in batch mode.
    pub fn script(&self) -> Option<&PathBuf> {
        match self {
            ExecutionMode::BatchScript(path) => Some(path),
            ExecutionMode::Interactive => None,
        }
    }
}

/// Everything the per-job invocation decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPlan {
    pub seed: SeedSelection,
    pub mode: ExecutionMode,
}

impl LaunchPlan {
    /// Parses a full argument vector (program name first).
    pub fn from_args(args: &[String]) -> Result<Self, BootstrapError> {
        let seed = SeedSelection::from_args(args)?;
        let mode = match args.len() {
            3 => ExecutionMode::BatchScript(PathBuf::from(&args[2])),
            _ => ExecutionMode::Interactive,
        };
        Ok(Self { seed, mode })
    }
    
    /// Parses positional tokens that follow the program name.
    pub fn from_positional(tokens: &[String]) -> Result<Self, BootstrapError> {
        let mut args = Vec::with_capacity(tokens.len() + 1);
        args.push(String::from("ecrs"));
        args.extend_from_slice(tokens);
        Self::from_args(&args)
    }
    
    /// Builds a plan from named options.
    ///
    /// A macro without a job index runs in batch mode on an entropy-drawn
    /// stream.
    pub fn from_named(job: Option<i64>, script: Option<PathBuf>) -> Result<Self, BootstrapError> {
        let seed = match job {
            Some(index) => SeedSelection::Job(JobIndex::new(index)?),
            None => SeedSelection::Entropy,
        };
        let mode = match script {
            Some(path) => ExecutionMode::BatchScript(path),
            None => ExecutionMode::Interactive,
        };
        Ok(Self { seed, mode })
    }
    
    /// Resolves the plan from whichever shape was used. Mixing both is a
    /// usage error.
    pub fn resolve(
        positional: &[String],
        job: Option<i64>,
        script: Option<PathBuf>,
    ) -> Result<Self, BootstrapError> {
        let named = job.is_some() || script.is_some();
        match (positional.is_empty(), named) {
            (false, true) => Err(BootstrapError::usage(format!(
                "positional arguments cannot be combined with --job/--macro; {}",
                USAGE
            ))),
            (false, false) => Self::from_positional(positional),
            (true, _) => Self::from_named(job, script),
        }
    }
}
