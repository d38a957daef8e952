//! Run context shared by every collaborator.
//!
//! Holds the process-wide resources the bootstrap sets up: the built unit
//! table, the output channel and the random engine. Collaborators receive an
//! `Arc<RunContext>` at construction instead of reaching for globals.

use crate::allocator::EngineSeedState;
use crate::engine::{EngineStatus, RanecuEngine};
use crate::error::{OutputError, SequencingError};
use crate::output::OutputChannel;
use crate::units::UnitTable;
use ecrs_env::RunId;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::info;

struct InstalledEngine {
    state: EngineSeedState,
    engine: Mutex<RanecuEngine>,
}

/// Context for one bootstrap invocation.
pub struct RunContext {
    /// Identifier written into every output header
    run_id: RunId,
    
    /// Built unit table
    units: Arc<UnitTable>,
    
    /// The single output channel
    output: Arc<OutputChannel>,
    
    /// Random engine, installed exactly once
    engine: OnceLock<InstalledEngine>,
}

impl RunContext {
    /// Creates a context with no engine installed.
    pub fn new(units: UnitTable, output: Arc<OutputChannel>) -> Self {
        Self {
            run_id: RunId::new(),
            units: Arc::new(units),
            output,
            engine: OnceLock::new(),
        }
    }
    
    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(units: UnitTable, output: Arc<OutputChannel>) -> Arc<Self> {
        Arc::new(Self::new(units, output))
    }
    
    pub fn run_id(&self) -> RunId {
        self.run_id
    }
    
    pub fn units(&self) -> &UnitTable {
        &self.units
    }
    
    pub fn output(&self) -> &Arc<OutputChannel> {
        &self.output
    }
    
    /// Installs the random engine with its one-time seed state.
    ///
    /// A second install is rejected; the first engine keeps running.
    pub fn install_engine(&self, state: EngineSeedState) -> Result<EngineStatus, SequencingError> {
        let mut engine = RanecuEngine::new();
        engine.set_seeds(state.seeds, state.seed_index);
        let status = engine.status();
        
        self.engine
            .set(InstalledEngine {
                state,
                engine: Mutex::new(engine),
            })
            .map_err(|_| SequencingError::EngineAlreadyInstalled)?;
        
        info!("Random engine installed: {}", status);
        Ok(status)
    }
    
    /// Seed state of the installed engine.
    pub fn seed_state(&self) -> Option<EngineSeedState> {
        self.engine.get().map(|e| e.state)
    }
    
    /// True once the engine is installed.
    pub fn engine_installed(&self) -> bool {
        self.engine.get().is_some()
    }
    
    /// Runs `f` with exclusive access to the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut RanecuEngine) -> R) -> Result<R, SequencingError> {
        let installed = self.engine.get().ok_or(SequencingError::EngineNotInstalled)?;
        let mut engine = installed.engine.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut engine))
    }
    
    /// Draws a uniform double in (0, 1) from the engine.
    pub fn flat(&self) -> Result<f64, SequencingError> {
        self.with_engine(|e| e.flat())
    }
    
    /// Current engine status.
    pub fn engine_status(&self) -> Result<EngineStatus, SequencingError> {
        self.with_engine(|e| e.status())
    }
    
    /// Writes one line through the output channel.
    pub fn write_line(&self, line: &str) -> Result<(), OutputError> {
        self.output.write_line(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    fn context() -> RunContext {
        RunContext::new(UnitTable::campaign().unwrap(), Arc::new(OutputChannel::new()))
    }
    
    #[test]
    fn test_engine_not_installed() {
        let ctx = context();
        assert!(!ctx.engine_installed());
        assert_eq!(ctx.flat(), Err(SequencingError::EngineNotInstalled));
    }
    
    #[test]
    fn test_second_install_rejected() {
        let ctx = context();
        let first = EngineSeedState { seeds: [11, 22], seed_index: 5 };
        let second = EngineSeedState { seeds: [33, 44], seed_index: 6 };
        
        ctx.install_engine(first).unwrap();
        let draw_before = ctx.with_engine(|e| e.clone().flat()).unwrap();
        
        assert_eq!(ctx.install_engine(second), Err(SequencingError::EngineAlreadyInstalled));
        
        // Original stream untouched
        assert_eq!(ctx.seed_state(), Some(first));
        assert_eq!(ctx.flat().unwrap(), draw_before);
    }
    
    #[test]
    fn test_draws_match_standalone_engine() {
        let ctx = context();
        let state = EngineSeedState { seeds: [123, 456], seed_index: 482913 };
        ctx.install_engine(state).unwrap();
        
        let mut reference = RanecuEngine::new();
        reference.set_seeds(state.seeds, state.seed_index);
        for _ in 0..10 {
            assert_eq!(ctx.flat().unwrap(), reference.flat());
        }
    }
    
    #[test]
    fn test_write_through_unopened_output() {
        let ctx = context();
        assert!(ctx.write_line("x").is_err());
    }
}
