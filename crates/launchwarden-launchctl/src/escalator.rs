//! Running command plans with administrator privileges.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::action::CommandPlan;
use crate::bridge::DEFAULT_LAUNCHCTL;
use crate::error::ElevationError;
use crate::parse::indicates_failure;
use crate::quoting::{applescript_escape, shell_quote};
use crate::runner::CommandRunner;

/// Default location of the AppleScript runner.
pub const DEFAULT_OSASCRIPT: &str = "/usr/bin/osascript";

/// AppleScript error number for a dismissed authorization dialog.
const USER_CANCELED_CODE: &str = "(-128)";
const USER_CANCELED_TEXT: &str = "User canceled";

/// Runs a plan as root, prompting for credentials.
#[async_trait]
pub trait Elevator: Send + Sync {
    async fn run_elevated(&self, plan: &CommandPlan) -> Result<(), ElevationError>;
}

/// Elevation through `osascript` and `do shell script ... with administrator privileges`.
#[derive(Clone)]
pub struct OsascriptElevator {
    runner: Arc<dyn CommandRunner>,
    osascript: String,
    launchctl: String,
}

impl OsascriptElevator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            osascript: DEFAULT_OSASCRIPT.to_string(),
            launchctl: DEFAULT_LAUNCHCTL.to_string(),
        }
    }

    pub fn with_paths(mut self, osascript: impl Into<String>, launchctl: impl Into<String>) -> Self {
        self.osascript = osascript.into();
        self.launchctl = launchctl.into();
        self
    }
}

#[async_trait]
impl Elevator for OsascriptElevator {
    async fn run_elevated(&self, plan: &CommandPlan) -> Result<(), ElevationError> {
        let script = build_shell_script(plan, &self.launchctl)?;
        let applescript = build_applescript(&script);
        debug!("Elevated script: {}", script);

        let args = vec!["-e".to_string(), applescript];
        let output = self.runner.run(&self.osascript, &args).await;

        if !output.launched {
            return Err(ElevationError::Failed(format!("could not run {}", self.osascript)));
        }
        if output.text.contains(USER_CANCELED_CODE) || output.text.contains(USER_CANCELED_TEXT) {
            info!("Authorization cancelled for {}", plan.label);
            return Err(ElevationError::Cancelled);
        }

        let markers: Vec<&str> = plan
            .steps
            .iter()
            .flat_map(|step| step.verb.idempotent_markers().iter().copied())
            .collect();
        if indicates_failure(output.exit_code, &output.text, &markers) {
            let message = output.text.trim().to_string();
            warn!("Privileged plan for {} failed: {}", plan.label, message);
            return Err(ElevationError::Failed(message));
        }
        if !output.success() {
            debug!(
                "Privileged plan for {} exited with {:?}, treated as no-op: {}",
                plan.label,
                output.exit_code,
                output.text.trim()
            );
        }

        info!("Privileged plan completed for {}/{}", plan.target, plan.label);
        Ok(())
    }
}

/// Join a plan into one `sh` script chained with `&&`, so a failing step
/// stops the rest. Every argument is single-quoted. Tolerant steps discard
/// stderr and never break the chain. `gui/<uid>` targets run through
/// `launchctl asuser <uid>`.
pub fn build_shell_script(plan: &CommandPlan, launchctl: &str) -> Result<String, ElevationError> {
    if plan.steps.is_empty() {
        return Err(ElevationError::InvalidCommand("empty plan".to_string()));
    }

    let launchctl = shell_quote(launchctl);
    let prefix = match plan.gui_uid() {
        Some(uid) => format!("{} asuser {} {}", launchctl, uid, launchctl),
        None => launchctl,
    };

    let commands: Vec<String> = plan
        .steps
        .iter()
        .map(|step| {
            let args = step.args.iter().map(|a| shell_quote(a)).collect::<Vec<_>>().join(" ");
            let command = format!("{} {}", prefix, args);
            if step.tolerant {
                format!("{{ {} 2>/dev/null || true; }}", command)
            } else {
                command
            }
        })
        .collect();

    Ok(commands.join(" && "))
}

/// Wrap a shell script in the AppleScript that asks for administrator rights.
pub fn build_applescript(shell_script: &str) -> String {
    format!(
        "do shell script \"{}\" with administrator privileges",
        applescript_escape(shell_script)
    )
}

#[cfg(test)]
#[path = "escalator_tests.rs"]
mod tests;
