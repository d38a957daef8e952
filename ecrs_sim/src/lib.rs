//! ECRS launcher harness
//!
//! Provides the pieces the `ecrs-sim` binary wires around the core
//! bootstrap:
//! - **Toolkit**: an in-process run manager and command interpreter
//! - **Session**: a line-oriented operator session
//! - **Entropy**: a seeded source for replayable launches
//! - **Report**: a JSON summary of each launch
//!
//! # Usage
//!
//! ```ignore
//! use ecrs_core::{Bootstrap, BootstrapConfig, LaunchPlan};
//! use ecrs_sim::{SeededEntropy, StandInToolkit};
//!
//! let plan = LaunchPlan::from_named(Some(7), Some("run.mac".into()))?;
//! let bootstrap = Bootstrap::with_global_output(BootstrapConfig::default());
//! let outcome = bootstrap.run(&plan, &mut StandInToolkit::stdio(), &mut SeededEntropy::new(42))?;
//! ```

mod toolkit;
mod session;
mod entropy;
mod report;

pub use toolkit::{ManagerState, StandInToolkit, ToolkitRunManager, MAX_MACRO_DEPTH};
pub use session::{TerminalSession, PROMPT};
pub use entropy::SeededEntropy;
pub use report::{BootstrapReport, StreamReport};
