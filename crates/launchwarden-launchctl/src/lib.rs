//! # LaunchWarden launchctl bridge
//!
//! Everything that talks to the service manager goes through this crate:
//!
//! - [`ControlBridge`] runs `launchctl` queries and mutations as argument
//!   vectors and parses their loosely structured output
//! - [`CommandPlan`] describes the two-step enable/disable sequences
//! - [`OsascriptElevator`] runs a plan with administrator privileges
//!
//! Subprocesses go through the [`CommandRunner`] trait so the parsing and
//! planning logic can be driven by scripted output in tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use launchwarden_launchctl::{ControlBridge, SystemRunner};
//!
//! let bridge = ControlBridge::new(Arc::new(SystemRunner::new()), "/bin/launchctl");
//! let status = bridge.list_status().await?;
//! ```

pub mod action;
pub mod bridge;
pub mod error;
pub mod escalator;
pub mod parse;
pub mod quoting;
pub mod runner;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use action::{CommandPlan, ControlStep, ControlVerb};
pub use bridge::ControlBridge;
pub use error::{ControlError, ElevationError};
pub use escalator::{Elevator, OsascriptElevator};
pub use parse::DomainServices;
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
