//! Error types for the toolkit boundary.

use thiserror::Error;

/// Errors that can occur at the toolkit boundary.
#[derive(Debug, Error)]
pub enum EnvError {
    /// No handler for the command path
    #[error("Command not found: {0}")]
    UnknownCommand(String),
    
    /// Command was recognized but rejected
    #[error("Command failed: {command}: {reason}")]
    CommandFailed { command: String, reason: String },
    
    /// Macro script could not be read
    #[error("Cannot read macro {path}: {reason}")]
    MacroUnreadable { path: String, reason: String },
    
    /// Process name is not in the process table
    #[error("Unknown process: {0}")]
    UnknownProcess(String),
    
    /// Registration or activation outside the allowed lifecycle window
    #[error("Run manager state error: {0}")]
    RunManagerState(String),
    
    /// A collaborator callback failed
    #[error("Collaborator {role} failed: {reason}")]
    Collaborator { role: String, reason: String },
    
    /// Interactive session I/O failed
    #[error("Session error: {0}")]
    Session(String),
}

impl EnvError {
    /// Creates a command failure.
    pub fn command_failed(command: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::CommandFailed {
            command: command.into(),
            reason: reason.to_string(),
        }
    }
    
    /// Creates a collaborator failure.
    pub fn collaborator(role: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::Collaborator {
            role: role.to_string(),
            reason: reason.to_string(),
        }
    }
    
    /// Creates a run manager state error.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::RunManagerState(msg.into())
    }
}
