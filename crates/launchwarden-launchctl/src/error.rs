//! Control and elevation errors.

use thiserror::Error;

/// Errors raised by the control bridge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// The control utility could not be launched or answered with nothing usable.
    #[error("launchctl unavailable: {0}")]
    Unavailable(String),

    /// A mutation reported an error that is not an idempotent no-op.
    #[error("launchctl command failed: {0}")]
    CommandFailed(String),

    /// Label contains characters outside the accepted set.
    #[error("Invalid service label: {0:?}")]
    InvalidLabel(String),

    /// Path is not safe to pass to the control utility.
    #[error("Invalid descriptor path: {0:?}")]
    InvalidPath(String),
}

/// Errors raised while running a plan with administrator privileges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElevationError {
    /// The user dismissed the authorization prompt.
    #[error("Authorization cancelled by user")]
    Cancelled,

    /// The privileged script ran and failed, or could not be started.
    #[error("Privileged command failed: {0}")]
    Failed(String),

    /// The plan could not be turned into a script.
    #[error("Invalid privileged command: {0}")]
    InvalidCommand(String),
}

impl From<ControlError> for ElevationError {
    fn from(err: ControlError) -> Self {
        ElevationError::InvalidCommand(err.to_string())
    }
}
