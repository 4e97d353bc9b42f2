//! Command plans: the argument vectors behind enable and disable.

use std::fmt;
use std::path::Path;

use crate::error::ControlError;
use crate::parse::{DEREGISTRATION_MARKERS, REGISTRATION_MARKERS};
use crate::quoting::{validate_label, validate_path};

/// A `launchctl` mutation subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlVerb {
    Enable,
    Disable,
    Bootstrap,
    Bootout,
}

impl ControlVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlVerb::Enable => "enable",
            ControlVerb::Disable => "disable",
            ControlVerb::Bootstrap => "bootstrap",
            ControlVerb::Bootout => "bootout",
        }
    }

    /// Output fragments meaning the command had nothing to do.
    pub fn idempotent_markers(&self) -> &'static [&'static str] {
        match self {
            ControlVerb::Enable | ControlVerb::Bootstrap => REGISTRATION_MARKERS,
            ControlVerb::Disable | ControlVerb::Bootout => DEREGISTRATION_MARKERS,
        }
    }
}

impl fmt::Display for ControlVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated `launchctl` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlStep {
    pub verb: ControlVerb,
    /// Arguments after the program name, verb first.
    pub args: Vec<String>,
    /// Failure of this step does not abort the plan.
    pub tolerant: bool,
}

impl ControlStep {
    pub fn enable(target: &str, label: &str) -> Result<Self, ControlError> {
        Ok(Self::service(ControlVerb::Enable, target, validate_label(label)?))
    }

    pub fn disable(target: &str, label: &str) -> Result<Self, ControlError> {
        Ok(Self::service(ControlVerb::Disable, target, validate_label(label)?))
    }

    pub fn bootout(target: &str, label: &str) -> Result<Self, ControlError> {
        Ok(Self::service(ControlVerb::Bootout, target, validate_label(label)?))
    }

    pub fn bootstrap(target: &str, path: &Path) -> Result<Self, ControlError> {
        let path = validate_path(path)?;
        Ok(Self {
            verb: ControlVerb::Bootstrap,
            args: vec![ControlVerb::Bootstrap.as_str().to_string(), target.to_string(), path.to_string()],
            tolerant: false,
        })
    }

    pub fn tolerant(mut self) -> Self {
        self.tolerant = true;
        self
    }

    fn service(verb: ControlVerb, target: &str, label: &str) -> Self {
        Self {
            verb,
            args: vec![verb.as_str().to_string(), format!("{}/{}", target, label)],
            tolerant: false,
        }
    }
}

/// Ordered steps that change one service, all against one control target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    pub target: String,
    pub label: String,
    pub steps: Vec<ControlStep>,
}

impl CommandPlan {
    /// `enable` then `bootstrap`.
    pub fn activate(target: &str, label: &str, descriptor_path: &Path) -> Result<Self, ControlError> {
        Ok(Self {
            target: target.to_string(),
            label: label.to_string(),
            steps: vec![
                ControlStep::enable(target, label)?,
                ControlStep::bootstrap(target, descriptor_path)?,
            ],
        })
    }

    /// `bootout` (allowed to fail) then `disable`.
    pub fn deactivate(target: &str, label: &str) -> Result<Self, ControlError> {
        Ok(Self {
            target: target.to_string(),
            label: label.to_string(),
            steps: vec![
                ControlStep::bootout(target, label)?.tolerant(),
                ControlStep::disable(target, label)?,
            ],
        })
    }

    /// The uid of a `gui/<uid>` target.
    pub fn gui_uid(&self) -> Option<u32> {
        self.target.strip_prefix("gui/")?.parse().ok()
    }
}
