//! Campaign-level bootstrap configuration.

use crate::error::BootstrapError;
use crate::output::DEFAULT_OUTPUT;
use crate::seed_table::DEFAULT_SEED_TABLE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A process toggled by name after the run manager is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessToggle {
    pub name: String,
    pub enabled: bool,
}

impl ProcessToggle {
    pub fn new(name: &str, enabled: bool) -> Self {
        Self {
            name: name.to_string(),
            enabled,
        }
    }
}

/// Configuration shared by every job of a campaign.
///
/// Per-job inputs (job index, macro path) are not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Seed-index table resource
    pub seed_table_path: PathBuf,
    
    /// Output file
    pub output_path: PathBuf,
    
    /// Append to an existing output file instead of truncating
    pub output_append: bool,
    
    /// Physics list name
    pub physics_list: String,
    
    /// Applied in order after finalize
    pub process_toggles: Vec<ProcessToggle>,
    
    /// Commands applied before the execution mode starts
    pub startup_commands: Vec<String>,
    
    /// Start the interactive session after a batch script completes
    pub keep_session_in_batch: bool,
    
    /// World radius in earth radii
    pub world_radius_re: f64,
    
    /// Register the optional stacking/stepping/tracking observers
    pub optional_observers: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            seed_table_path: PathBuf::from(DEFAULT_SEED_TABLE),
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            output_append: false,
            physics_list: "QGSP_BERT_HP".to_string(),
            process_toggles: vec![
                ProcessToggle::new("MYTransportation", false),
                ProcessToggle::new("Transportation", true),
            ],
            startup_commands: vec!["/tracking/verbose 0".to_string()],
            keep_session_in_batch: false,
            world_radius_re: 25.0,
            optional_observers: true,
        }
    }
}

impl BootstrapConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, BootstrapError> {
        let config: Self = serde_json::from_str(text).map_err(|e| BootstrapError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
    
    /// Reads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BootstrapError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BootstrapError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }
    
    /// Rejects values the bootstrap cannot run with.
    pub fn validate(&self) -> Result<(), BootstrapError> {
        if !(self.world_radius_re.is_finite() && self.world_radius_re > 0.0) {
            return Err(BootstrapError::Config(format!(
                "world_radius_re must be positive, got {}",
                self.world_radius_re
            )));
        }
        if self.physics_list.trim().is_empty() {
            return Err(BootstrapError::Config("physics_list is empty".to_string()));
        }
        Ok(())
    }
}
