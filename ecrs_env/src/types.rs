//! Common types for the toolkit boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one bootstrap invocation.
///
/// Written into the output header so records from thousands of jobs can
/// be told apart after they are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Creates a new random RunId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed roles a collaborator can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollaboratorRole {
    /// Geometry / detector provider
    Detector,
    
    /// Physics-process list
    PhysicsList,
    
    /// Run-level observer
    RunObserver,
    
    /// Event-level observer
    EventObserver,
    
    /// Primary-event generator
    PrimaryGenerator,
    
    /// Stacking-policy observer
    Stacking,
    
    /// Stepping observer
    Stepping,
    
    /// Tracking observer
    Tracking,
}

impl CollaboratorRole {
    /// Returns the role name.
    pub fn name(&self) -> &'static str {
        match self {
            CollaboratorRole::Detector => "detector",
            CollaboratorRole::PhysicsList => "physics_list",
            CollaboratorRole::RunObserver => "run_observer",
            CollaboratorRole::EventObserver => "event_observer",
            CollaboratorRole::PrimaryGenerator => "primary_generator",
            CollaboratorRole::Stacking => "stacking",
            CollaboratorRole::Stepping => "stepping",
            CollaboratorRole::Tracking => "tracking",
        }
    }
    
    /// Returns true if the run manager cannot initialize without this role.
    pub fn is_mandatory(&self) -> bool {
        matches!(self,
            CollaboratorRole::Detector |
            CollaboratorRole::PhysicsList |
            CollaboratorRole::RunObserver |
            CollaboratorRole::EventObserver |
            CollaboratorRole::PrimaryGenerator
        )
    }
    
    /// Returns the mandatory roles.
    pub fn mandatory() -> Vec<CollaboratorRole> {
        vec![
            CollaboratorRole::Detector,
            CollaboratorRole::PhysicsList,
            CollaboratorRole::RunObserver,
            CollaboratorRole::EventObserver,
            CollaboratorRole::PrimaryGenerator,
        ]
    }
}

impl std::fmt::Display for CollaboratorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A lifecycle notification the toolkit delivers to collaborators.
///
/// Within one event the order is always
/// `GeneratePrimaries` → `BeginEvent` → `EndEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A run of `events` events is starting
    BeginRun { run: u64, events: u64 },
    
    /// Primaries for the event must be produced
    GeneratePrimaries { event: u64 },
    
    /// Event processing starts
    BeginEvent { event: u64 },
    
    /// Event processing finished
    EndEvent { event: u64 },
    
    /// The run finished after `events` events
    EndRun { run: u64, events: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_mandatory_roles() {
        let mandatory = CollaboratorRole::mandatory();
        assert_eq!(mandatory.len(), 5);
        assert!(mandatory.iter().all(|r| r.is_mandatory()));
        assert!(!CollaboratorRole::Stacking.is_mandatory());
        assert!(!CollaboratorRole::Stepping.is_mandatory());
        assert!(!CollaboratorRole::Tracking.is_mandatory());
    }
    
    #[test]
    fn test_run_ids_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
