//! Concrete simulation-lifecycle collaborators.
//!
//! These are the campaign's participants in the toolkit lifecycle. The
//! transport itself belongs to the toolkit; collaborators only hold their
//! dependencies, draw primaries from the installed engine and write records
//! through the shared output channel.
//!
//! Dependencies are constructor arguments, so a collaborator cannot exist
//! before the handles it needs.

use crate::context::RunContext;
use crate::units::{EARTH_RADIUS, GIGAVOLT};
use ecrs_env::{Collaborator, CollaboratorRole, EnvError, LifecycleEvent};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Geometry provider: a spherical world centred on the Earth.
#[derive(Debug)]
pub struct DetectorConstruction {
    /// World radius in internal length units
    world_radius: f64,
}

impl DetectorConstruction {
    pub fn new(world_radius: f64) -> Self {
        Self { world_radius }
    }
    
    pub fn world_radius(&self) -> f64 {
        self.world_radius
    }
}

impl Collaborator for DetectorConstruction {
    fn role(&self) -> CollaboratorRole {
        CollaboratorRole::Detector
    }
    
    fn label(&self) -> String {
        format!("earth world ({:.1} re)", self.world_radius / EARTH_RADIUS)
    }
}

/// Physics-process list, chosen once per campaign.
#[derive(Debug)]
pub struct PhysicsList {
    name: String,
}

impl PhysicsList {
    /// Processes every list contributes, including the custom transportation.
    pub const PROCESSES: [&'static str; 9] = [
        "Transportation",
        "MYTransportation",
        "msc",
        "eIoni",
        "eBrem",
        "hIoni",
        "hadElastic",
        "protonInelastic",
        "Decay",
    ];
    
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
    
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Collaborator for PhysicsList {
    fn role(&self) -> CollaboratorRole {
        CollaboratorRole::PhysicsList
    }
    
    fn label(&self) -> String {
        self.name.clone()
    }
    
    fn process_names(&self) -> Vec<String> {
        Self::PROCESSES.iter().map(|p| p.to_string()).collect()
    }
}

/// Run-level observer: writes the run header and footer.
pub struct RunAction {
    ctx: Arc<RunContext>,
    
    /// Events completed in the current run
    events: AtomicU64,
    
    /// Primaries handed to tracking in the current run
    tracks: AtomicU64,
    
    /// Primary steps checked against the world in the current run
    steps: AtomicU64,
}

impl RunAction {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        Self {
            ctx,
            events: AtomicU64::new(0),
            tracks: AtomicU64::new(0),
            steps: AtomicU64::new(0),
        }
    }
    
    /// Counts one finished event.
    pub fn count_event(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }
    
    pub fn events_in_run(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }
    
    /// Counts one primary picked up by tracking.
    pub fn count_track(&self) {
        self.tracks.fetch_add(1, Ordering::Relaxed);
    }
    
    pub fn tracks_in_run(&self) -> u64 {
        self.tracks.load(Ordering::Relaxed)
    }
    
    /// Counts one step that stayed inside the world.
    pub fn count_step(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }
    
    pub fn steps_in_run(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }
    
    fn write(&self, line: &str) -> Result<(), EnvError> {
        self.ctx
            .write_line(line)
            .map_err(|e| EnvError::collaborator(self.role(), e))
    }
}

impl Collaborator for RunAction {
    fn role(&self) -> CollaboratorRole {
        CollaboratorRole::RunObserver
    }
    
    fn notify(&self, event: &LifecycleEvent) -> Result<(), EnvError> {
        match *event {
            LifecycleEvent::BeginRun { run, events } => {
                self.events.store(0, Ordering::Relaxed);
                self.tracks.store(0, Ordering::Relaxed);
                self.steps.store(0, Ordering::Relaxed);
                let state = self
                    .ctx
                    .seed_state()
                    .ok_or_else(|| EnvError::collaborator(self.role(), "random engine not installed"))?;
                self.write(&format!(
                    "# run {} id {} seed_index {} seeds {} {} events {}",
                    run,
                    self.ctx.run_id(),
                    state.seed_index,
                    state.seeds[0],
                    state.seeds[1],
                    events
                ))
            }
            LifecycleEvent::EndRun { run, .. } => {
                debug!(
                    "Run {}: {} tracks, {} steps",
                    run,
                    self.tracks_in_run(),
                    self.steps_in_run()
                );
                self.write(&format!("# end run {} events {}", run, self.events_in_run()))
            }
            _ => Ok(()),
        }
    }
}

/// A primary particle drawn by the generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primary {
    /// Cosine of the arrival zenith angle
    pub cos_theta: f64,
    
    /// Arrival azimuth in radians
    pub phi: f64,
    
    /// Rigidity in internal potential units
    pub rigidity: f64,
    
    /// Launch radius in internal length units
    pub radius: f64,
}

/// Event-level observer: one output record per event.
pub struct EventAction {
    ctx: Arc<RunContext>,
    
    /// Primary of the event in flight
    current: Mutex<Option<Primary>>,
}

impl EventAction {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        Self {
            ctx,
            current: Mutex::new(None),
        }
    }
    
    /// Records the primary of the event in flight.
    pub fn record_primary(&self, primary: Primary) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(primary);
    }
    
    /// Primary of the event in flight, if generated.
    pub fn current_primary(&self) -> Option<Primary> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Collaborator for EventAction {
    fn role(&self) -> CollaboratorRole {
        CollaboratorRole::EventObserver
    }
    
    fn notify(&self, event: &LifecycleEvent) -> Result<(), EnvError> {
        let LifecycleEvent::EndEvent { event } = *event else {
            return Ok(());
        };
        let primary = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| EnvError::collaborator(self.role(), format!("event {} has no primary", event)))?;
        
        self.ctx
            .write_line(&format!(
                "{} {:.6} {:.6} {:.6} {:.3}",
                event,
                primary.cos_theta,
                primary.phi,
                primary.rigidity / GIGAVOLT,
                primary.radius / EARTH_RADIUS,
            ))
            .map_err(|e| EnvError::collaborator(self.role(), e))
    }
}

/// Power-law rigidity spectrum between two bounds.
#[derive(Debug, Clone, Copy)]
pub struct RigiditySpectrum {
    pub min: f64,
    pub max: f64,
    pub index: f64,
}

impl Default for RigiditySpectrum {
    fn default() -> Self {
        Self {
            min: 1.0 * GIGAVOLT,
            max: 100.0 * GIGAVOLT,
            index: 2.7,
        }
    }
}

impl RigiditySpectrum {
    /// Inverse-CDF sample for a uniform `u` in (0, 1).
    pub fn sample(&self, u: f64) -> f64 {
        let k = 1.0 - self.index;
        let lo = self.min.powf(k);
        let hi = self.max.powf(k);
        (lo + u * (hi - lo)).powf(1.0 / k)
    }
}

/// Primary-event generator.
///
/// Launches primaries from the world boundary with isotropic inward
/// directions, drawing exclusively from the installed engine.
pub struct PrimaryGenerator {
    ctx: Arc<RunContext>,
    detector: Arc<DetectorConstruction>,
    run: Arc<RunAction>,
    event: Arc<EventAction>,
    spectrum: RigiditySpectrum,
}

impl PrimaryGenerator {
    pub fn new(
        ctx: Arc<RunContext>,
        detector: &Arc<DetectorConstruction>,
        run: &Arc<RunAction>,
        event: &Arc<EventAction>,
    ) -> Self {
        Self {
            ctx,
            detector: Arc::clone(detector),
            run: Arc::clone(run),
            event: Arc::clone(event),
            spectrum: RigiditySpectrum::default(),
        }
    }
    
    /// Draws one primary.
    pub fn generate(&self) -> Result<Primary, EnvError> {
        let draws = self
            .ctx
            .with_engine(|e| [e.flat(), e.flat(), e.flat()])
            .map_err(|e| EnvError::collaborator(self.role(), e))?;
        
        Ok(Primary {
            // cos-weighted inward flux through the boundary
            cos_theta: draws[0].sqrt(),
            phi: 2.0 * PI * draws[1],
            rigidity: self.spectrum.sample(draws[2]),
            radius: self.detector.world_radius(),
        })
    }
}

impl Collaborator for PrimaryGenerator {
    fn role(&self) -> CollaboratorRole {
        CollaboratorRole::PrimaryGenerator
    }
    
    fn notify(&self, event: &LifecycleEvent) -> Result<(), EnvError> {
        if let LifecycleEvent::GeneratePrimaries { event } = *event {
            let primary = self.generate()?;
            debug!("Event {}: rigidity {:.3} GV", event, primary.rigidity / GIGAVOLT);
            self.event.record_primary(primary);
            self.run.count_event();
        }
        Ok(())
    }
}

/// Stacking-policy observer. Keeps the toolkit's default policy.
#[derive(Debug, Default)]
pub struct StackingAction;

impl Collaborator for StackingAction {
    fn role(&self) -> CollaboratorRole {
        CollaboratorRole::Stacking
    }
}

/// Stepping observer.
///
/// Checks that each primary starts inside the world before the toolkit
/// steps it.
pub struct SteppingAction {
    detector: Arc<DetectorConstruction>,
    run: Arc<RunAction>,
    event: Arc<EventAction>,
}

impl SteppingAction {
    pub fn new(
        detector: &Arc<DetectorConstruction>,
        run: &Arc<RunAction>,
        event: &Arc<EventAction>,
    ) -> Self {
        Self {
            detector: Arc::clone(detector),
            run: Arc::clone(run),
            event: Arc::clone(event),
        }
    }
    
    /// True if a point at `radius` lies outside the world.
    pub fn escaped(&self, radius: f64) -> bool {
        radius > self.detector.world_radius()
    }
}

impl Collaborator for SteppingAction {
    fn role(&self) -> CollaboratorRole {
        CollaboratorRole::Stepping
    }
    
    fn notify(&self, event: &LifecycleEvent) -> Result<(), EnvError> {
        let LifecycleEvent::BeginEvent { event } = *event else {
            return Ok(());
        };
        let Some(primary) = self.event.current_primary() else {
            return Ok(());
        };
        if self.escaped(primary.radius) {
            return Err(EnvError::collaborator(
                self.role(),
                format!("event {} starts outside the world", event),
            ));
        }
        self.run.count_step();
        Ok(())
    }
}

/// Tracking observer.
pub struct TrackingAction {
    run: Arc<RunAction>,
    event: Arc<EventAction>,
}

impl TrackingAction {
    pub fn new(run: &Arc<RunAction>, event: &Arc<EventAction>) -> Self {
        Self {
            run: Arc::clone(run),
            event: Arc::clone(event),
        }
    }
    
    /// Primary of the track being followed.
    pub fn primary(&self) -> Option<Primary> {
        self.event.current_primary()
    }
}

impl Collaborator for TrackingAction {
    fn role(&self) -> CollaboratorRole {
        CollaboratorRole::Tracking
    }
    
    fn notify(&self, event: &LifecycleEvent) -> Result<(), EnvError> {
        if let LifecycleEvent::BeginEvent { event } = *event {
            let primary = self
                .primary()
                .ok_or_else(|| EnvError::collaborator(self.role(), format!("event {} has no primary", event)))?;
            debug!("Tracking event {}: cos theta {:.3}", event, primary.cos_theta);
            self.run.count_track();
        }
        Ok(())
    }
}
