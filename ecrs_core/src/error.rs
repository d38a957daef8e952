//! Error types for the bootstrap.

use crate::seed_table::SeedTableError;
use crate::units::UnitError;
use ecrs_env::{CollaboratorRole, EnvError};
use thiserror::Error;

/// Programming-contract violations: the bootstrap order was not respected.
///
/// Never recoverable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequencingError {
    #[error("Output channel written before open")]
    WriteWhileUnopened,
    
    #[error("Output channel written after close")]
    WriteAfterClose,
    
    #[error("Output channel already open")]
    AlreadyOpen,
    
    #[error("Output channel cannot be reopened after close")]
    ReopenAfterClose,
    
    #[error("Random engine already installed")]
    EngineAlreadyInstalled,
    
    #[error("Random engine used before install")]
    EngineNotInstalled,
    
    #[error("Cannot build {role}: {missing} not constructed yet")]
    MissingDependency {
        role: CollaboratorRole,
        missing: CollaboratorRole,
    },
    
    #[error("Collaborator {0} already constructed")]
    AlreadyConstructed(CollaboratorRole),
    
    #[error("Collaborator {0} constructed after the run manager was finalized")]
    AfterFinalize(CollaboratorRole),
}

/// Errors from the output channel.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error(transparent)]
    Sequencing(#[from] SequencingError),
    
    #[error("Output I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort the bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Wrong invocation shape
    #[error("Usage error: {0}")]
    Usage(String),
    
    /// Job index outside the seed table
    #[error("Job index {index} outside [0, {max}]")]
    Index { index: i64, max: usize },
    
    #[error(transparent)]
    SeedTable(#[from] SeedTableError),
    
    #[error(transparent)]
    Sequencing(#[from] SequencingError),
    
    #[error(transparent)]
    Units(#[from] UnitError),
    
    #[error(transparent)]
    Output(#[from] OutputError),
    
    #[error("Toolkit error: {0}")]
    Env(#[from] EnvError),
    
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BootstrapError {
    /// Creates a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
    
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::Config(_) => 2,
            _ => 1,
        }
    }
}
