//! Live status reported by the service manager and the projected per-record
//! state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One row of `launchctl list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
}

impl ListEntry {
    pub fn new(pid: Option<u32>, exit_code: Option<i32>) -> Self {
        Self { pid, exit_code }
    }

    /// Collapse the row into a tagged status. Without a pid, only a non-zero
    /// exit code counts as a failure.
    pub fn live_status(&self) -> LiveStatus {
        match (self.pid, self.exit_code) {
            (Some(pid), _) => LiveStatus::Running { pid },
            (None, Some(code)) if code != 0 => LiveStatus::ExitedNonZero { code },
            _ => LiveStatus::LoadedNoPid,
        }
    }
}

/// What the service manager knows about a loaded label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LiveStatus {
    Running { pid: u32 },
    ExitedNonZero { code: i32 },
    LoadedNoPid,
}

/// The state shown for a service record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ServiceState {
    /// Loaded with a live process.
    Running(u32),
    /// Loaded and idle. Reconciliation reports idle services as
    /// [`Loaded`](Self::Loaded) and never produces this state.
    Stopped,
    /// Loaded with no process and no failed last exit.
    Loaded,
    /// Not known to the service manager.
    Unloaded,
    /// Loaded, last run exited with a non-zero code.
    Failed(i32),
    /// Explicitly disabled in the descriptor or the manager's override table.
    Disabled,
    /// The service manager could not be queried.
    Unknown,
}

impl ServiceState {
    pub fn display_text(&self) -> String {
        match self {
            ServiceState::Running(pid) => format!("Running (PID: {})", pid),
            ServiceState::Stopped => "Stopped".to_string(),
            ServiceState::Loaded => "Loaded".to_string(),
            ServiceState::Unloaded => "Not Loaded".to_string(),
            ServiceState::Failed(code) => format!("Failed (Exit: {})", code),
            ServiceState::Disabled => "Disabled".to_string(),
            ServiceState::Unknown => "Unknown".to_string(),
        }
    }

    /// Fixed-width friendly single word.
    pub fn short_text(&self) -> &'static str {
        match self {
            ServiceState::Running(_) => "running",
            ServiceState::Stopped => "stopped",
            ServiceState::Loaded => "loaded",
            ServiceState::Unloaded => "unloaded",
            ServiceState::Failed(_) => "failed",
            ServiceState::Disabled => "disabled",
            ServiceState::Unknown => "unknown",
        }
    }

    /// Whether the service manager currently has the service loaded.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ServiceState::Running(_) | ServiceState::Stopped | ServiceState::Loaded | ServiceState::Failed(_)
        )
    }

    pub fn has_error(&self) -> bool {
        matches!(self, ServiceState::Failed(_))
    }

    pub fn pid(&self) -> Option<u32> {
        match self {
            ServiceState::Running(pid) => Some(*pid),
            _ => None,
        }
    }
}

impl From<LiveStatus> for ServiceState {
    fn from(status: LiveStatus) -> Self {
        match status {
            LiveStatus::Running { pid } => ServiceState::Running(pid),
            LiveStatus::ExitedNonZero { code } => ServiceState::Failed(code),
            LiveStatus::LoadedNoPid => ServiceState::Loaded,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}
