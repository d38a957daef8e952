//! ECRS Environment Abstraction Layer
//!
//! This crate defines the boundary between the campaign bootstrap and the
//! external transport toolkit. The bootstrap never talks to the toolkit
//! directly; it only sees:
//! - Randomness (`EntropySource`)
//! - Run management (`RunManager`, `CommandInterface`)
//! - Operator interaction (`UiSession`)
//! - Lifecycle participants (`Collaborator`)
//!
//! Production and stand-in toolkits implement these traits, so the same
//! bootstrap code runs against either.
//!
//! # Example
//!
//! ```ignore
//! use ecrs_env::{ClockEntropy, EntropySource};
//!
//! let mut entropy = ClockEntropy::new();
//! let word = entropy.next_word();
//! assert!(word <= ecrs_env::MAX_ENTROPY_WORD);
//! ```

mod context;
mod toolkit;
mod types;
mod error;
mod clock_impl;

pub use context::{EntropySource, MAX_ENTROPY_WORD};
pub use toolkit::{Collaborator, CommandInterface, RunManager, UiSession};
pub use types::{CollaboratorRole, LifecycleEvent, RunId};
pub use error::EnvError;
pub use clock_impl::ClockEntropy;
