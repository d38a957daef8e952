//! Contract consumed from the external transport toolkit.

use crate::error::EnvError;
use crate::types::{CollaboratorRole, LifecycleEvent};
use std::sync::Arc;

/// A simulation-lifecycle participant handed to the run manager.
///
/// Ownership is shared with the run manager once registered; the toolkit
/// delivers lifecycle notifications through `notify`.
pub trait Collaborator: Send + Sync {
    /// The role this collaborator plays.
    fn role(&self) -> CollaboratorRole;
    
    /// Human-readable label (defaults to the role name).
    fn label(&self) -> String {
        self.role().name().to_string()
    }
    
    /// Process names this collaborator contributes to the process table.
    ///
    /// Only physics lists return a non-empty list.
    fn process_names(&self) -> Vec<String> {
        Vec::new()
    }
    
    /// Receives a lifecycle notification.
    fn notify(&self, _event: &LifecycleEvent) -> Result<(), EnvError> {
        Ok(())
    }
}

/// The external run-management authority.
///
/// # Lifecycle
///
/// ```text
/// register_mandatory* / register_optional*  →  finalize  →  set_process_activation*
/// ```
///
/// `finalize` is irreversible. Process activation is only available after
/// it, since the process table is built there.
pub trait RunManager {
    /// Registers a mandatory collaborator under `role`.
    fn register_mandatory(
        &mut self,
        role: CollaboratorRole,
        collaborator: Arc<dyn Collaborator>,
    ) -> Result<(), EnvError>;
    
    /// Registers an optional collaborator.
    fn register_optional(&mut self, collaborator: Arc<dyn Collaborator>) -> Result<(), EnvError>;
    
    /// Initializes the toolkit. No mandatory collaborator may follow.
    fn finalize(&mut self) -> Result<(), EnvError>;
    
    /// Enables or disables a named process.
    fn set_process_activation(&mut self, name: &str, enabled: bool) -> Result<(), EnvError>;
}

/// The toolkit's command interpreter.
pub trait CommandInterface {
    /// Applies one command line, synchronously.
    fn apply_command(&mut self, command: &str) -> Result<(), EnvError>;
}

/// An operator-facing session (terminal, GUI, visualization).
///
/// Created once per process and released during teardown. In batch mode it
/// may be created without ever being started.
pub trait UiSession {
    /// Runs the session, blocking until the operator ends it.
    fn start(&mut self, commands: &mut dyn CommandInterface) -> Result<(), EnvError>;
}
