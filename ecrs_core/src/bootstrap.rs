//! Bootstrap orchestration.
//!
//! # Sequence
//!
//! ```text
//! units ─► seed index ─► output.open ─► engine ─► run manager
//!   ─► collaborators (dependency order, registered as built)
//!   ─► finalize ─► process toggles ─► session ─► startup commands
//!   ─► Interactive: session.start   |   Batch: /control/execute <macro>
//!   ─► teardown: session, run manager, output.close
//! ```
//!
//! The launch plan is parsed before `run` is called, so usage errors never
//! reach this module. Once the output is open, teardown runs on every path.

use crate::allocator::{EngineSeedState, SeedSelection, StreamAllocator};
use crate::config::BootstrapConfig;
use crate::context::RunContext;
use crate::engine::EngineStatus;
use crate::error::BootstrapError;
use crate::graph::{CollaboratorGraph, GraphBuilder};
use crate::launch::{ExecutionMode, LaunchPlan, EXECUTE_PREFIX};
use crate::output::OutputChannel;
use crate::units::UnitTable;
use ecrs_env::{CollaboratorRole, CommandInterface, EntropySource, EnvError, RunId, RunManager, UiSession};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Factory for the toolkit-side resources.
///
/// The run manager is created only after the engine is installed; the
/// session only after the run manager is finalized.
pub trait Toolkit {
    type Manager: RunManager + CommandInterface;
    type Session: UiSession;
    
    /// Creates the run-management authority.
    fn create_run_manager(&mut self, ctx: &Arc<RunContext>) -> Result<Self::Manager, EnvError>;
    
    /// Creates the operator session.
    fn create_session(&mut self) -> Result<Self::Session, EnvError>;
}

/// What a completed bootstrap did.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapOutcome {
    pub run_id: RunId,
    pub seed_selection: SeedSelection,
    pub seed_state: EngineSeedState,
    pub engine: EngineStatus,
    pub mode: ExecutionMode,
    pub physics_list: String,
    pub collaborators: Vec<CollaboratorRole>,
    /// Commands submitted by the bootstrap itself, in order
    pub commands: Vec<String>,
    pub session_started: bool,
}

/// The orchestrator.
pub struct Bootstrap {
    config: BootstrapConfig,
    output: Arc<OutputChannel>,
}

impl Bootstrap {
    /// Creates an orchestrator writing through `output`.
    pub fn new(config: BootstrapConfig, output: Arc<OutputChannel>) -> Self {
        Self { config, output }
    }
    
    /// Creates an orchestrator on the process-wide output channel.
    pub fn with_global_output(config: BootstrapConfig) -> Self {
        Self::new(config, OutputChannel::instance())
    }
    
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }
    
    /// Runs the whole bootstrap for one process.
    pub fn run<T: Toolkit>(
        &self,
        plan: &LaunchPlan,
        toolkit: &mut T,
        entropy: &mut dyn EntropySource,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        self.config.validate()?;
        let units = UnitTable::campaign()?;
        
        let allocator = StreamAllocator::new(&self.config.seed_table_path);
        let seed_index = allocator.select_seed_index(&plan.seed, entropy)?;
        
        self.output.open(&self.config.output_path, self.config.output_append)?;
        let ctx = RunContext::shared(units, Arc::clone(&self.output));
        info!("Bootstrap {} ({} mode)", ctx.run_id(), plan.mode.name());
        
        let prepared = allocator
            .install_engine(&ctx, seed_index, entropy)
            .and_then(|state| {
                let manager = toolkit.create_run_manager(&ctx)?;
                info!("Run manager is created ...");
                Ok((state, manager))
            });
        let (seed_state, mut manager) = match prepared {
            Ok(v) => v,
            Err(e) => {
                self.close_output();
                return Err(e);
            }
        };
        
        let mut session: Option<T::Session> = None;
        let result = self.drive(&ctx, plan, toolkit, &mut manager, &mut session);
        
        // Teardown in reverse order of acquisition
        if let Some(s) = session.take() {
            drop(s);
            info!("Session released.");
        }
        drop(manager);
        info!("RunManager deleted.");
        let closed = self.output.close();
        
        let (graph, commands, session_started) = result?;
        closed?;
        
        Ok(BootstrapOutcome {
            run_id: ctx.run_id(),
            seed_selection: plan.seed,
            seed_state,
            engine: ctx.engine_status()?,
            mode: plan.mode.clone(),
            physics_list: graph.physics.name().to_string(),
            collaborators: graph.collaborators().iter().map(|c| c.role()).collect(),
            commands,
            session_started,
        })
    }
    
    fn drive<T: Toolkit>(
        &self,
        ctx: &Arc<RunContext>,
        plan: &LaunchPlan,
        toolkit: &mut T,
        manager: &mut T::Manager,
        session: &mut Option<T::Session>,
    ) -> Result<(CollaboratorGraph, Vec<String>, bool), BootstrapError> {
        let mut builder = self.build_and_register(ctx, manager)?;
        
        manager.finalize()?;
        builder.seal();
        let graph = builder.finish()?;
        info!("Run manager initialized");
        
        for toggle in &self.config.process_toggles {
            manager.set_process_activation(&toggle.name, toggle.enabled)?;
            debug!("Process {} -> {}", toggle.name, if toggle.enabled { "on" } else { "off" });
        }
        
        let session = session.insert(toolkit.create_session()?);
        
        let mut commands = Vec::new();
        for command in &self.config.startup_commands {
            manager.apply_command(command)?;
            commands.push(command.clone());
        }
        
        let mut session_started = false;
        match &plan.mode {
            ExecutionMode::Interactive => {
                info!("Starting interactive session");
                session.start(manager)?;
                session_started = true;
            }
            ExecutionMode::BatchScript(path) => {
                let command = format!("{}{}", EXECUTE_PREFIX, path.display());
                info!("Executing macro {}", path.display());
                commands.push(command.clone());
                if let Err(e) = manager.apply_command(&command) {
                    error!("Macro {} failed: {}", path.display(), e);
                    return Err(e.into());
                }
                if self.config.keep_session_in_batch {
                    session.start(manager)?;
                    session_started = true;
                }
            }
        }
        
        Ok((graph, commands, session_started))
    }
    
    /// Builds every collaborator in dependency order, registering each as
    /// soon as it exists.
    fn build_and_register<M: RunManager>(
        &self,
        ctx: &Arc<RunContext>,
        manager: &mut M,
    ) -> Result<GraphBuilder, BootstrapError> {
        let mut builder = GraphBuilder::new(Arc::clone(ctx));
        
        info!("Construct the detector ...");
        let radius = self.config.world_radius_re * ctx.units().value_of("re")?;
        let detector = builder.detector(radius)?;
        manager.register_mandatory(CollaboratorRole::Detector, detector)?;
        
        let physics = builder.physics_list(&self.config.physics_list)?;
        manager.register_mandatory(CollaboratorRole::PhysicsList, physics)?;
        
        let run = builder.run_observer()?;
        manager.register_mandatory(CollaboratorRole::RunObserver, run)?;
        
        let event = builder.event_observer()?;
        manager.register_mandatory(CollaboratorRole::EventObserver, event)?;
        
        let generator = builder.primary_generator()?;
        manager.register_mandatory(CollaboratorRole::PrimaryGenerator, generator)?;
        
        if self.config.optional_observers {
            manager.register_optional(builder.stacking()?)?;
            manager.register_optional(builder.stepping()?)?;
            manager.register_optional(builder.tracking()?)?;
        }
        
        Ok(builder)
    }
    
    fn close_output(&self) {
        if let Err(e) = self.output.close() {
            error!("Failed to close output: {}", e);
        }
    }
}
