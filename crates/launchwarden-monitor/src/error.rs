//! Command results and monitor errors.

use serde::Serialize;
use thiserror::Error;

use launchwarden_core::{ServiceDomain, ServiceKey};
use launchwarden_launchctl::{ControlError, ElevationError};

/// How a command that was not rejected ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    Completed,
    /// The user dismissed the authorization prompt. Nothing changed.
    Cancelled,
}

/// Errors returned by service commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The control utility reported a real failure.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Services in {0} are read-only")]
    ReadOnlyDomain(ServiceDomain),

    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceKey),

    /// Loading requires a descriptor file and the record has none.
    #[error("Service {0} has no descriptor file")]
    MissingDescriptor(ServiceKey),

    /// Another command for the same service is still running.
    #[error("A command for {0} is already in progress")]
    Busy(ServiceKey),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Monitor is not running")]
    MonitorStopped,
}

impl From<ControlError> for CommandError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::InvalidLabel(_) | ControlError::InvalidPath(_) => CommandError::InvalidInput(err.to_string()),
            ControlError::CommandFailed(msg) => CommandError::CommandFailed(msg),
            ControlError::Unavailable(msg) => CommandError::CommandFailed(msg),
        }
    }
}

/// Map an elevation result. Cancellation is an outcome, not an error.
pub(crate) fn elevation_outcome(result: Result<(), ElevationError>) -> Result<CommandOutcome, CommandError> {
    match result {
        Ok(()) => Ok(CommandOutcome::Completed),
        Err(ElevationError::Cancelled) => Ok(CommandOutcome::Cancelled),
        Err(ElevationError::Failed(msg)) => Err(CommandError::CommandFailed(msg)),
        Err(ElevationError::InvalidCommand(msg)) => Err(CommandError::InvalidInput(msg)),
    }
}

/// Errors starting the directory watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}
