//! # LaunchWarden Monitor
//!
//! Service reconciliation and command coordination.
//!
//! ## Features
//!
//! - Concurrent reconciliation passes (directory scans plus `launchctl` queries)
//! - Single-writer actor owning the published [`Snapshot`]
//! - Coalesced refreshes and a per-service single-flight guard for commands
//! - Debounced watching of domain directories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use launchwarden_config::Config;
//! use launchwarden_monitor::Monitor;
//!
//! let monitor = Monitor::from_config(&Config::default())?;
//! let handle = monitor.handle();
//! let snapshot = handle.refresh().await?;
//! for record in &snapshot.records {
//!     println!("{} {}", record.label, record.state);
//! }
//! ```

pub mod actor;
pub mod error;
pub mod handle;
pub mod merge;
pub mod monitor;
pub mod pass;
pub mod snapshot;
pub mod watcher;

pub use actor::{MonitorOptions, ServiceAction};
pub use error::{CommandError, CommandOutcome, WatchError};
pub use handle::MonitorHandle;
pub use merge::LiveView;
pub use monitor::{registry_from_config, Monitor};
pub use pass::PassContext;
pub use snapshot::{PassStage, Snapshot};
pub use watcher::{ChangeWatcher, WatchEvent};
