//! Dependency-ordered construction of the collaborator graph.
//!
//! ```text
//! detector ─┬──────────────────────────► primary generator
//! physics   │                     ┌────► stepping (optional)
//! run ──────┼─────────────────────┤
//! event ────┘                     └────► tracking (optional, run + event)
//! stacking (optional)
//! ```
//!
//! Constructors already take their dependencies as handles; the builder
//! additionally refuses out-of-order construction at runtime so a bootstrap
//! sequence that skips a step fails with a `SequencingError`.

use crate::collaborators::{
    DetectorConstruction, EventAction, PhysicsList, PrimaryGenerator, RunAction, StackingAction,
    SteppingAction, TrackingAction,
};
use crate::context::RunContext;
use crate::error::SequencingError;
use ecrs_env::{Collaborator, CollaboratorRole};
use std::sync::Arc;

/// The fully constructed graph.
pub struct CollaboratorGraph {
    pub detector: Arc<DetectorConstruction>,
    pub physics: Arc<PhysicsList>,
    pub run: Arc<RunAction>,
    pub event: Arc<EventAction>,
    pub generator: Arc<PrimaryGenerator>,
    pub stacking: Option<Arc<StackingAction>>,
    pub stepping: Option<Arc<SteppingAction>>,
    pub tracking: Option<Arc<TrackingAction>>,
}

impl CollaboratorGraph {
    /// Every collaborator in construction order.
    pub fn collaborators(&self) -> Vec<Arc<dyn Collaborator>> {
        let mut all: Vec<Arc<dyn Collaborator>> = vec![
            self.detector.clone(),
            self.physics.clone(),
            self.run.clone(),
            self.event.clone(),
            self.generator.clone(),
        ];
        if let Some(s) = &self.stacking {
            all.push(s.clone());
        }
        if let Some(s) = &self.stepping {
            all.push(s.clone());
        }
        if let Some(t) = &self.tracking {
            all.push(t.clone());
        }
        all
    }
}

/// Builds the graph one role at a time.
pub struct GraphBuilder {
    ctx: Arc<RunContext>,
    detector: Option<Arc<DetectorConstruction>>,
    physics: Option<Arc<PhysicsList>>,
    run: Option<Arc<RunAction>>,
    event: Option<Arc<EventAction>>,
    generator: Option<Arc<PrimaryGenerator>>,
    stacking: Option<Arc<StackingAction>>,
    stepping: Option<Arc<SteppingAction>>,
    tracking: Option<Arc<TrackingAction>>,
    
    /// Set once the run manager is finalized
    sealed: bool,
}

fn require<T>(
    slot: &Option<Arc<T>>,
    role: CollaboratorRole,
    missing: CollaboratorRole,
) -> Result<Arc<T>, SequencingError> {
    slot.clone()
        .ok_or(SequencingError::MissingDependency { role, missing })
}

fn vacant<T>(slot: &Option<Arc<T>>, role: CollaboratorRole) -> Result<(), SequencingError> {
    match slot {
        Some(_) => Err(SequencingError::AlreadyConstructed(role)),
        None => Ok(()),
    }
}

impl GraphBuilder {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        Self {
            ctx,
            detector: None,
            physics: None,
            run: None,
            event: None,
            generator: None,
            stacking: None,
            stepping: None,
            tracking: None,
            sealed: false,
        }
    }
    
    /// Marks the run manager as finalized. Every later construction fails.
    pub fn seal(&mut self) {
        self.sealed = true;
    }
    
    fn open_for(&self, role: CollaboratorRole) -> Result<(), SequencingError> {
        if self.sealed {
            return Err(SequencingError::AfterFinalize(role));
        }
        Ok(())
    }
    
    /// Step 1: geometry provider.
    pub fn detector(&mut self, world_radius: f64) -> Result<Arc<DetectorConstruction>, SequencingError> {
        self.open_for(CollaboratorRole::Detector)?;
        vacant(&self.detector, CollaboratorRole::Detector)?;
        let detector = Arc::new(DetectorConstruction::new(world_radius));
        self.detector = Some(detector.clone());
        Ok(detector)
    }
    
    /// Step 2: physics list.
    pub fn physics_list(&mut self, name: &str) -> Result<Arc<PhysicsList>, SequencingError> {
        self.open_for(CollaboratorRole::PhysicsList)?;
        vacant(&self.physics, CollaboratorRole::PhysicsList)?;
        let physics = Arc::new(PhysicsList::new(name));
        self.physics = Some(physics.clone());
        Ok(physics)
    }
    
    /// Step 3: run-level observer.
    pub fn run_observer(&mut self) -> Result<Arc<RunAction>, SequencingError> {
        self.open_for(CollaboratorRole::RunObserver)?;
        vacant(&self.run, CollaboratorRole::RunObserver)?;
        let run = Arc::new(RunAction::new(self.ctx.clone()));
        self.run = Some(run.clone());
        Ok(run)
    }
    
    /// Step 4: event-level observer.
    pub fn event_observer(&mut self) -> Result<Arc<EventAction>, SequencingError> {
        self.open_for(CollaboratorRole::EventObserver)?;
        vacant(&self.event, CollaboratorRole::EventObserver)?;
        let event = Arc::new(EventAction::new(self.ctx.clone()));
        self.event = Some(event.clone());
        Ok(event)
    }
    
    /// Step 5: primary generator (needs detector, run and event observers).
    pub fn primary_generator(&mut self) -> Result<Arc<PrimaryGenerator>, SequencingError> {
        let role = CollaboratorRole::PrimaryGenerator;
        self.open_for(role)?;
        vacant(&self.generator, role)?;
        let detector = require(&self.detector, role, CollaboratorRole::Detector)?;
        let run = require(&self.run, role, CollaboratorRole::RunObserver)?;
        let event = require(&self.event, role, CollaboratorRole::EventObserver)?;
        
        let generator = Arc::new(PrimaryGenerator::new(self.ctx.clone(), &detector, &run, &event));
        self.generator = Some(generator.clone());
        Ok(generator)
    }
    
    /// Step 6: stacking observer.
    pub fn stacking(&mut self) -> Result<Arc<StackingAction>, SequencingError> {
        self.open_for(CollaboratorRole::Stacking)?;
        vacant(&self.stacking, CollaboratorRole::Stacking)?;
        let stacking = Arc::new(StackingAction);
        self.stacking = Some(stacking.clone());
        Ok(stacking)
    }
    
    /// Step 7: stepping observer (needs detector, run and event observers).
    pub fn stepping(&mut self) -> Result<Arc<SteppingAction>, SequencingError> {
        let role = CollaboratorRole::Stepping;
        self.open_for(role)?;
        vacant(&self.stepping, role)?;
        let detector = require(&self.detector, role, CollaboratorRole::Detector)?;
        let run = require(&self.run, role, CollaboratorRole::RunObserver)?;
        let event = require(&self.event, role, CollaboratorRole::EventObserver)?;
        
        let stepping = Arc::new(SteppingAction::new(&detector, &run, &event));
        self.stepping = Some(stepping.clone());
        Ok(stepping)
    }
    
    /// Step 8: tracking observer (needs run and event observers).
    pub fn tracking(&mut self) -> Result<Arc<TrackingAction>, SequencingError> {
        let role = CollaboratorRole::Tracking;
        self.open_for(role)?;
        vacant(&self.tracking, role)?;
        let run = require(&self.run, role, CollaboratorRole::RunObserver)?;
        let event = require(&self.event, role, CollaboratorRole::EventObserver)?;
        
        let tracking = Arc::new(TrackingAction::new(&run, &event));
        self.tracking = Some(tracking.clone());
        Ok(tracking)
    }
    
    /// Completes the graph. Every mandatory role must exist.
    pub fn finish(self) -> Result<CollaboratorGraph, SequencingError> {
        let role = CollaboratorRole::PrimaryGenerator;
        Ok(CollaboratorGraph {
            detector: require(&self.detector, role, CollaboratorRole::Detector)?,
            physics: require(&self.physics, role, CollaboratorRole::PhysicsList)?,
            run: require(&self.run, role, CollaboratorRole::RunObserver)?,
            event: require(&self.event, role, CollaboratorRole::EventObserver)?,
            generator: require(&self.generator, role, CollaboratorRole::PrimaryGenerator)?,
            stacking: self.stacking,
            stepping: self.stepping,
            tracking: self.tracking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputChannel;
    use crate::units::UnitTable;
    
    fn builder() -> GraphBuilder {
        GraphBuilder::new(RunContext::shared(
            UnitTable::campaign().unwrap(),
            Arc::new(OutputChannel::new()),
        ))
    }
    
    #[test]
    fn test_generator_before_dependencies_fails() {
        let mut b = builder();
        assert_eq!(
            b.primary_generator().err(),
            Some(SequencingError::MissingDependency {
                role: CollaboratorRole::PrimaryGenerator,
                missing: CollaboratorRole::Detector,
            })
        );
        
        b.detector(1.0).unwrap();
        assert_eq!(
            b.primary_generator().err(),
            Some(SequencingError::MissingDependency {
                role: CollaboratorRole::PrimaryGenerator,
                missing: CollaboratorRole::RunObserver,
            })
        );
        
        b.run_observer().unwrap();
        assert_eq!(
            b.primary_generator().err(),
            Some(SequencingError::MissingDependency {
                role: CollaboratorRole::PrimaryGenerator,
                missing: CollaboratorRole::EventObserver,
            })
        );
        
        b.event_observer().unwrap();
        assert!(b.primary_generator().is_ok());
    }
    
    #[test]
    fn test_optional_observers_need_dependencies() {
        let mut b = builder();
        assert!(b.stacking().is_ok());
        assert!(matches!(b.stepping(), Err(SequencingError::MissingDependency { .. })));
        assert!(matches!(b.tracking(), Err(SequencingError::MissingDependency { .. })));
        
        b.run_observer().unwrap();
        b.event_observer().unwrap();
        assert!(b.tracking().is_ok());
        assert!(matches!(
            b.stepping(),
            Err(SequencingError::MissingDependency { missing: CollaboratorRole::Detector, .. })
        ));
    }
    
    #[test]
    fn test_role_constructed_once() {
        let mut b = builder();
        b.detector(1.0).unwrap();
        assert_eq!(
            b.detector(2.0).err(),
            Some(SequencingError::AlreadyConstructed(CollaboratorRole::Detector))
        );
    }
    
    #[test]
    fn test_finish_requires_mandatory_roles() {
        let mut b = builder();
        b.detector(1.0).unwrap();
        b.run_observer().unwrap();
        b.event_observer().unwrap();
        b.primary_generator().unwrap();
        assert!(b.finish().is_err());
    }
    
    #[test]
    fn test_full_graph_order() {
        let mut b = builder();
        b.detector(1.0).unwrap();
        b.physics_list("QGSP_BERT_HP").unwrap();
        b.run_observer().unwrap();
        b.event_observer().unwrap();
        b.primary_generator().unwrap();
        b.stacking().unwrap();
        b.stepping().unwrap();
        b.tracking().unwrap();
        let graph = b.finish().unwrap();
        
        let roles: Vec<CollaboratorRole> = graph.collaborators().iter().map(|c| c.role()).collect();
        assert_eq!(
            roles,
            vec![
                CollaboratorRole::Detector,
                CollaboratorRole::PhysicsList,
                CollaboratorRole::RunObserver,
                CollaboratorRole::EventObserver,
                CollaboratorRole::PrimaryGenerator,
                CollaboratorRole::Stacking,
                CollaboratorRole::Stepping,
                CollaboratorRole::Tracking,
            ]
        );
    }
    
    #[test]
    fn test_construction_after_seal_rejected() {
        let mut b = builder();
        b.detector(1.0).unwrap();
        b.run_observer().unwrap();
        b.seal();
        assert_eq!(
            b.event_observer().err(),
            Some(SequencingError::AfterFinalize(CollaboratorRole::EventObserver))
        );
        assert_eq!(
            b.tracking().err(),
            Some(SequencingError::AfterFinalize(CollaboratorRole::Tracking))
        );
    }
}
