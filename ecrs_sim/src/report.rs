//! JSON bootstrap report.
//!
//! Summarizes one launch for campaign bookkeeping: which stream the job got,
//! which mode ran, and how it ended.

use ecrs_core::{BootstrapError, BootstrapOutcome};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Stream identity of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamReport {
    /// "entropy" or the job index
    pub source: String,
    pub seed_index: i64,
    pub seeds: [i64; 2],
    /// Engine row the seed index selected
    pub sequence: usize,
}

/// Complete report of one launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamReport>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_path: Option<String>,
    
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    
    pub output_path: String,
    
    pub exit_code: i32,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BootstrapReport {
    /// Report of a successful launch.
    pub fn from_outcome(outcome: &BootstrapOutcome, output_path: &Path) -> Self {
        let source = match outcome.seed_selection {
            ecrs_core::SeedSelection::Entropy => "entropy".to_string(),
            ecrs_core::SeedSelection::Job(job) => format!("job {}", job),
        };
        Self {
            run_id: Some(outcome.run_id.to_string()),
            stream: Some(StreamReport {
                source,
                seed_index: outcome.seed_state.seed_index,
                seeds: outcome.seed_state.seeds,
                sequence: outcome.engine.sequence,
            }),
            mode: Some(outcome.mode.name().to_string()),
            macro_path: outcome.mode.script().map(|p| p.display().to_string()),
            commands: outcome.commands.clone(),
            output_path: output_path.display().to_string(),
            exit_code: 0,
            error: None,
        }
    }
    
    /// Report of a failed launch.
    pub fn from_error(error: &BootstrapError, output_path: &Path) -> Self {
        Self {
            run_id: None,
            stream: None,
            mode: None,
            macro_path: None,
            commands: Vec::new(),
            output_path: output_path.display().to_string(),
            exit_code: error.exit_code(),
            error: Some(error.to_string()),
        }
    }
    
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
    
    /// Writes the report to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
