//! ECRS Core - campaign bootstrap for cosmic-ray transport jobs
//!
//! Every batch job of a campaign runs this bootstrap before the transport
//! toolkit takes over. It solves two problems:
//! 1. **Correlated streams**: thousands of concurrently launched jobs must
//!    not share random sequences. A seed table gives each job index a
//!    reproducible subsequence; fresh entropy words keep reruns distinct.
//! 2. **Initialization order**: units, output, engine and the collaborator
//!    graph depend on each other. The orchestrator enforces one fixed order
//!    and tears everything down in reverse.

pub mod units;
pub mod seed_table;
pub mod engine;
pub mod allocator;
pub mod output;
pub mod context;
pub mod collaborators;
pub mod graph;
pub mod launch;
pub mod config;
pub mod bootstrap;
pub mod error;

// Re-export key types for convenience
pub use allocator::{EngineSeedState, JobIndex, SeedSelection, StreamAllocator};
pub use bootstrap::{Bootstrap, BootstrapOutcome, Toolkit};
pub use config::{BootstrapConfig, ProcessToggle};
pub use context::RunContext;
pub use engine::{EngineStatus, RanecuEngine};
pub use error::{BootstrapError, OutputError, SequencingError};
pub use graph::{CollaboratorGraph, GraphBuilder};
pub use launch::{ExecutionMode, LaunchPlan};
pub use output::{ChannelState, OutputChannel};
pub use seed_table::{SeedTable, SeedTableError};
pub use units::{UnitRegistry, UnitTable};
