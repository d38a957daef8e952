//! Stand-in transport toolkit.
//!
//! An in-process implementation of the run-management contract. It enforces
//! the lifecycle (registration → finalize → process activation), interprets
//! the command set the campaign macros use, and drives collaborators through
//! run/event notifications on `/run/beamOn`. No particle transport happens.

use crate::session::TerminalSession;
use ecrs_core::units::{ELECTRIC_POTENTIAL, LENGTH, MAGNETIC_FLUX_DENSITY, TIME};
use ecrs_core::{RunContext, Toolkit};
use ecrs_env::{Collaborator, CollaboratorRole, CommandInterface, EnvError, LifecycleEvent, RunManager};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Nesting limit for `/control/execute`.
pub const MAX_MACRO_DEPTH: usize = 8;

/// Lifecycle state of the run manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Accepting registrations
    PreInit,
    
    /// Finalized; process table built
    Idle,
}

/// Run manager and command interpreter of the stand-in toolkit.
pub struct ToolkitRunManager {
    ctx: Arc<RunContext>,
    
    state: ManagerState,
    
    /// Mandatory roles already registered
    mandatory: HashSet<CollaboratorRole>,
    
    /// All collaborators in registration order
    collaborators: Vec<Arc<dyn Collaborator>>,
    
    /// Process name → active
    processes: BTreeMap<String, bool>,
    
    tracking_verbose: u32,
    
    /// Runs started so far
    runs: u64,
    
    /// Every command applied, including macro contents
    history: Vec<String>,
    
    macro_depth: usize,
}

impl ToolkitRunManager {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        Self {
            ctx,
            state: ManagerState::PreInit,
            mandatory: HashSet::new(),
            collaborators: Vec::new(),
            processes: BTreeMap::new(),
            tracking_verbose: 1,
            runs: 0,
            history: Vec::new(),
            macro_depth: 0,
        }
    }
    
    pub fn state(&self) -> ManagerState {
        self.state
    }
    
    pub fn history(&self) -> &[String] {
        &self.history
    }
    
    pub fn tracking_verbose(&self) -> u32 {
        self.tracking_verbose
    }
    
    pub fn runs(&self) -> u64 {
        self.runs
    }
    
    /// Activation flag of a process, once the table exists.
    pub fn process_active(&self, name: &str) -> Option<bool> {
        self.processes.get(name).copied()
    }
    
    fn notify_all(&self, event: LifecycleEvent) -> Result<(), EnvError> {
        for collaborator in &self.collaborators {
            collaborator.notify(&event)?;
        }
        Ok(())
    }
    
    fn beam_on(&mut self, events: u64) -> Result<(), EnvError> {
        if self.state != ManagerState::Idle {
            return Err(EnvError::state("beamOn before initialization"));
        }
        let run = self.runs;
        self.runs += 1;
        
        info!("Run {} starting: {} events", run, events);
        self.notify_all(LifecycleEvent::BeginRun { run, events })?;
        for event in 0..events {
            self.notify_all(LifecycleEvent::GeneratePrimaries { event })?;
            self.notify_all(LifecycleEvent::BeginEvent { event })?;
            self.notify_all(LifecycleEvent::EndEvent { event })?;
        }
        self.notify_all(LifecycleEvent::EndRun { run, events })?;
        info!("Run {} terminated", run);
        Ok(())
    }
    
    fn execute_macro(&mut self, command: &str, path: &str) -> Result<(), EnvError> {
        if self.macro_depth >= MAX_MACRO_DEPTH {
            return Err(EnvError::command_failed(command, "macro nesting too deep"));
        }
        let text = std::fs::read_to_string(Path::new(path)).map_err(|e| EnvError::MacroUnreadable {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        
        self.macro_depth += 1;
        let result = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .try_for_each(|line| self.apply_command(line));
        self.macro_depth -= 1;
        result
    }
    
    fn list_units(&self) {
        let units = self.ctx.units();
        for category in [LENGTH, TIME, MAGNETIC_FLUX_DENSITY, ELECTRIC_POTENTIAL] {
            let symbols: Vec<String> = units.category(category).iter().map(|u| u.symbol.clone()).collect();
            info!("{}: {}", category, symbols.join(" "));
        }
    }
    
    fn convert_units(&self, command: &str, args: &str) -> Result<(), EnvError> {
        let units = self.ctx.units();
        let value = units
            .parse_quantity(args)
            .map_err(|e| EnvError::command_failed(command, e))?;
        let category = args
            .split_whitespace()
            .nth(1)
            .and_then(|symbol| units.get(symbol))
            .map(|u| u.category.clone())
            .unwrap_or_default();
        match units.best_unit(value, &category) {
            Some((scaled, unit)) => info!("{} = {} {}", args, scaled, unit.symbol),
            None => info!("{} = {}", args, value),
        }
        Ok(())
    }
}

impl RunManager for ToolkitRunManager {
    fn register_mandatory(
        &mut self,
        role: CollaboratorRole,
        collaborator: Arc<dyn Collaborator>,
    ) -> Result<(), EnvError> {
        if self.state != ManagerState::PreInit {
            return Err(EnvError::state(format!("{} registered after initialization", role)));
        }
        if !role.is_mandatory() || collaborator.role() != role {
            return Err(EnvError::state(format!(
                "{} cannot be registered as mandatory {}",
                collaborator.role(),
                role
            )));
        }
        if !self.mandatory.insert(role) {
            return Err(EnvError::state(format!("{} registered twice", role)));
        }
        
        info!("Registered {} ({})", role, collaborator.label());
        self.collaborators.push(collaborator);
        Ok(())
    }
    
    fn register_optional(&mut self, collaborator: Arc<dyn Collaborator>) -> Result<(), EnvError> {
        let role = collaborator.role();
        if role.is_mandatory() {
            return Err(EnvError::state(format!("{} is mandatory, not optional", role)));
        }
        debug!("Registered optional {}", role);
        self.collaborators.push(collaborator);
        Ok(())
    }
    
    fn finalize(&mut self) -> Result<(), EnvError> {
        if self.state != ManagerState::PreInit {
            return Err(EnvError::state("already initialized"));
        }
        if let Some(missing) = CollaboratorRole::mandatory()
            .into_iter()
            .find(|r| !self.mandatory.contains(r))
        {
            return Err(EnvError::state(format!("mandatory {} missing", missing)));
        }
        
        self.processes = self
            .collaborators
            .iter()
            .flat_map(|c| c.process_names())
            .map(|name| (name, true))
            .collect();
        self.state = ManagerState::Idle;
        info!("Toolkit initialized with {} processes", self.processes.len());
        Ok(())
    }
    
    fn set_process_activation(&mut self, name: &str, enabled: bool) -> Result<(), EnvError> {
        if self.state != ManagerState::Idle {
            return Err(EnvError::state("process table not built yet"));
        }
        let active = self
            .processes
            .get_mut(name)
            .ok_or_else(|| EnvError::UnknownProcess(name.to_string()))?;
        *active = enabled;
        info!("Process {} {}", name, if enabled { "activated" } else { "inactivated" });
        Ok(())
    }
}

impl CommandInterface for ToolkitRunManager {
    fn apply_command(&mut self, command: &str) -> Result<(), EnvError> {
        let command = command.trim();
        self.history.push(command.to_string());
        
        let (path, args) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
        let args = args.trim();
        
        match path {
            "/control/execute" => {
                if args.is_empty() {
                    return Err(EnvError::command_failed(command, "macro path missing"));
                }
                self.execute_macro(command, args)
            }
            "/control/echo" => {
                info!("{}", args);
                Ok(())
            }
            "/tracking/verbose" => {
                self.tracking_verbose = args
                    .parse()
                    .map_err(|_| EnvError::command_failed(command, "expected a non-negative integer"))?;
                Ok(())
            }
            "/run/beamOn" => {
                let events = if args.is_empty() {
                    1
                } else {
                    args.parse()
                        .map_err(|_| EnvError::command_failed(command, "expected an event count"))?
                };
                self.beam_on(events)
            }
            "/random/status" => {
                let status = self
                    .ctx
                    .engine_status()
                    .map_err(|e| EnvError::command_failed(command, e))?;
                info!("{}", status);
                Ok(())
            }
            "/units/list" => {
                self.list_units();
                Ok(())
            }
            "/units/convert" => self.convert_units(command, args),
            _ => {
                warn!("command <{}> not found", command);
                Err(EnvError::UnknownCommand(command.to_string()))
            }
        }
    }
}

impl Drop for ToolkitRunManager {
    fn drop(&mut self) {
        debug!("Releasing {} collaborators", self.collaborators.len());
    }
}

/// Toolkit factory used by the launcher.
pub struct StandInToolkit {
    /// Commands fed to the session instead of stdin, if set
    scripted_session: Option<Vec<String>>,
}

impl StandInToolkit {
    /// Sessions read from the terminal.
    pub fn stdio() -> Self {
        Self { scripted_session: None }
    }
    
    /// Sessions replay `lines` and then end.
    pub fn scripted(lines: Vec<String>) -> Self {
        Self {
            scripted_session: Some(lines),
        }
    }
}

impl Toolkit for StandInToolkit {
    type Manager = ToolkitRunManager;
    type Session = TerminalSession;
    
    fn create_run_manager(&mut self, ctx: &Arc<RunContext>) -> Result<ToolkitRunManager, EnvError> {
        Ok(ToolkitRunManager::new(Arc::clone(ctx)))
    }
    
    fn create_session(&mut self) -> Result<TerminalSession, EnvError> {
        Ok(match self.scripted_session.take() {
            Some(lines) => TerminalSession::scripted(lines),
            None => TerminalSession::stdio(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecrs_core::collaborators::{DetectorConstruction, StackingAction};
    use ecrs_core::{EngineSeedState, GraphBuilder, OutputChannel, UnitTable};
    
    fn context() -> Arc<RunContext> {
        let ctx = RunContext::shared(UnitTable::campaign().unwrap(), Arc::new(OutputChannel::new()));
        ctx.install_engine(EngineSeedState { seeds: [1234, 5678], seed_index: 9 }).unwrap();
        ctx
    }
    
    fn initialized(ctx: &Arc<RunContext>) -> ToolkitRunManager {
        let mut manager = ToolkitRunManager::new(ctx.clone());
        let mut b = GraphBuilder::new(ctx.clone());
        manager.register_mandatory(CollaboratorRole::Detector, b.detector(1.0).unwrap()).unwrap();
        manager.register_mandatory(CollaboratorRole::PhysicsList, b.physics_list("QGSP_BERT_HP").unwrap()).unwrap();
        manager.register_mandatory(CollaboratorRole::RunObserver, b.run_observer().unwrap()).unwrap();
        manager.register_mandatory(CollaboratorRole::EventObserver, b.event_observer().unwrap()).unwrap();
        manager.register_mandatory(CollaboratorRole::PrimaryGenerator, b.primary_generator().unwrap()).unwrap();
        manager.finalize().unwrap();
        manager
    }
    
    fn temp_file(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("ecrs-macro-{}.mac", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }
    
    #[test]
    fn test_finalize_requires_mandatory_roles() {
        let ctx = context();
        let mut manager = ToolkitRunManager::new(ctx);
        manager
            .register_mandatory(CollaboratorRole::Detector, Arc::new(DetectorConstruction::new(1.0)))
            .unwrap();
        assert!(matches!(manager.finalize(), Err(EnvError::RunManagerState(_))));
        assert_eq!(manager.state(), ManagerState::PreInit);
    }
    
    #[test]
    fn test_mandatory_after_finalize_rejected() {
        let ctx = context();
        let mut manager = initialized(&ctx);
        let err = manager
            .register_mandatory(CollaboratorRole::Detector, Arc::new(DetectorConstruction::new(2.0)))
            .unwrap_err();
        assert!(matches!(err, EnvError::RunManagerState(_)));
    }
    
    #[test]
    fn test_role_mismatch_rejected() {
        let ctx = context();
        let mut manager = ToolkitRunManager::new(ctx);
        assert!(manager
            .register_mandatory(CollaboratorRole::PhysicsList, Arc::new(DetectorConstruction::new(1.0)))
            .is_err());
        assert!(manager
            .register_mandatory(CollaboratorRole::Stacking, Arc::new(StackingAction))
            .is_err());
        assert!(manager.register_optional(Arc::new(DetectorConstruction::new(1.0))).is_err());
        assert!(manager.register_optional(Arc::new(StackingAction)).is_ok());
    }
    
    #[test]
    fn test_process_activation_lifecycle() {
        let ctx = context();
        let mut before = ToolkitRunManager::new(ctx.clone());
        assert!(before.set_process_activation("Transportation", true).is_err());
        
        let mut manager = initialized(&ctx);
        manager.set_process_activation("MYTransportation", false).unwrap();
        manager.set_process_activation("Transportation", true).unwrap();
        assert_eq!(manager.process_active("MYTransportation"), Some(false));
        assert_eq!(manager.process_active("Transportation"), Some(true));
        assert!(matches!(
            manager.set_process_activation("Warp", true),
            Err(EnvError::UnknownProcess(_))
        ));
    }
    
    #[test]
    fn test_commands() {
        let ctx = context();
        let mut manager = initialized(&ctx);
        
        manager.apply_command("/tracking/verbose 0").unwrap();
        assert_eq!(manager.tracking_verbose(), 0);
        assert!(manager.apply_command("/tracking/verbose x").is_err());
        
        manager.apply_command("/random/status").unwrap();
        manager.apply_command("/units/list").unwrap();
        manager.apply_command("/units/convert 20000 km").unwrap();
        assert!(manager.apply_command("/units/convert 3 furlong").is_err());
        
        assert!(matches!(
            manager.apply_command("/gun/particle proton"),
            Err(EnvError::UnknownCommand(_))
        ));
    }
    
    #[test]
    fn test_beam_on_needs_initialization() {
        let ctx = context();
        let mut manager = ToolkitRunManager::new(ctx);
        assert!(manager.apply_command("/run/beamOn 1").is_err());
    }
    
    #[test]
    fn test_macro_execution_and_output() {
        let ctx = context();
        let path = std::env::temp_dir().join(format!("ecrs-run-{}.dat", uuid::Uuid::new_v4()));
        ctx.output().open(&path, false).unwrap();
        
        let mut manager = initialized(&ctx);
        let script = temp_file("# campaign macro\n\n/tracking/verbose 0\n/run/beamOn 3\n/control/echo done\n");
        manager
            .apply_command(&format!("/control/execute {}", script.display()))
            .unwrap();
        ctx.output().close().unwrap();
        
        assert_eq!(manager.runs(), 1);
        assert_eq!(
            &manager.history()[1..],
            &["/tracking/verbose 0", "/run/beamOn 3", "/control/echo done"]
        );
        
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 5);
        assert!(contents.ends_with("# end run 0 events 3\n"));
        
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(script);
    }
    
    #[test]
    fn test_macro_stops_at_first_failure() {
        let ctx = context();
        let mut manager = initialized(&ctx);
        let script = temp_file("/tracking/verbose 2\n/no/such/command\n/tracking/verbose 0\n");
        
        assert!(manager
            .apply_command(&format!("/control/execute {}", script.display()))
            .is_err());
        assert_eq!(manager.tracking_verbose(), 2);
        let _ = std::fs::remove_file(script);
    }
    
    #[test]
    fn test_missing_macro() {
        let ctx = context();
        let mut manager = initialized(&ctx);
        assert!(matches!(
            manager.apply_command("/control/execute /nonexistent/run.mac"),
            Err(EnvError::MacroUnreadable { .. })
        ));
    }
    
    #[test]
    fn test_recursive_macro_bounded() {
        let ctx = context();
        let mut manager = initialized(&ctx);
        let path = std::env::temp_dir().join(format!("ecrs-loop-{}.mac", uuid::Uuid::new_v4()));
        std::fs::write(&path, format!("/control/execute {}\n", path.display())).unwrap();
        
        assert!(manager
            .apply_command(&format!("/control/execute {}", path.display()))
            .is_err());
        let _ = std::fs::remove_file(path);
    }
    
    #[test]
    fn test_end_to_end_job_seven() {
        use crate::entropy::SeededEntropy;
        use ecrs_core::{Bootstrap, BootstrapConfig, LaunchPlan};
        
        let table_text = (0..10_000i64)
            .map(|i| if i == 7 { 482913 } else { 1_000 + i })
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let table = temp_file(&table_text);
        let script = temp_file("/control/echo shower\n/run/beamOn 4\n");
        let plan = LaunchPlan::from_positional(&["7".to_string(), script.display().to_string()]).unwrap();
        
        let mut outcomes = Vec::new();
        for entropy_seed in [1, 2] {
            let output_path = std::env::temp_dir().join(format!("ecrs-e2e-{}.dat", uuid::Uuid::new_v4()));
            let config = BootstrapConfig {
                seed_table_path: table.clone(),
                output_path: output_path.clone(),
                ..Default::default()
            };
            let bootstrap = Bootstrap::new(config, Arc::new(OutputChannel::new()));
            // Batch mode never starts the session
            let mut toolkit = StandInToolkit::scripted(vec!["/run/beamOn 1000000".to_string()]);
            
            let outcome = bootstrap
                .run(&plan, &mut toolkit, &mut SeededEntropy::new(entropy_seed))
                .unwrap();
            
            let contents = std::fs::read_to_string(&output_path).unwrap();
            assert_eq!(contents.lines().count(), 6);
            assert!(contents.lines().next().unwrap().contains("seed_index 482913"));
            outcomes.push(outcome);
            let _ = std::fs::remove_file(output_path);
        }
        
        assert_eq!(outcomes[0].seed_state.seed_index, 482913);
        assert_eq!(outcomes[1].seed_state.seed_index, 482913);
        assert_ne!(outcomes[0].seed_state.seeds, outcomes[1].seed_state.seeds);
        assert!(!outcomes[0].session_started);
        assert_eq!(
            outcomes[0].commands.iter().filter(|c| c.contains(&script.display().to_string())).count(),
            1
        );
        
        let _ = std::fs::remove_file(table);
        let _ = std::fs::remove_file(script);
    }
}
