//! The control bridge: typed access to `launchctl`.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use launchwarden_core::ListEntry;

use crate::action::{CommandPlan, ControlStep};
use crate::error::ControlError;
use crate::parse::{indicates_failure, parse_disabled, parse_list, parse_print_services, DomainServices};
use crate::quoting::validate_label;
use crate::runner::{CommandOutput, CommandRunner};

/// Default location of the control utility.
pub const DEFAULT_LAUNCHCTL: &str = "/bin/launchctl";

/// Runs `launchctl` with argument vectors and parses what it prints.
#[derive(Clone)]
pub struct ControlBridge {
    runner: Arc<dyn CommandRunner>,
    launchctl: String,
}

impl ControlBridge {
    pub fn new(runner: Arc<dyn CommandRunner>, launchctl_path: impl Into<String>) -> Self {
        Self {
            runner,
            launchctl: launchctl_path.into(),
        }
    }

    pub fn launchctl_path(&self) -> &str {
        &self.launchctl
    }

    async fn invoke(&self, args: Vec<String>) -> CommandOutput {
        debug!("launchctl {}", args.join(" "));
        self.runner.run(&self.launchctl, &args).await
    }

    /// `launchctl list`: every label loaded in the caller's user domain.
    pub async fn list_status(&self) -> Result<HashMap<String, ListEntry>, ControlError> {
        let output = self.invoke(vec!["list".to_string()]).await;
        if !output.launched {
            return Err(ControlError::Unavailable(format!("could not run {}", self.launchctl)));
        }
        if !output.success() {
            return Err(ControlError::Unavailable(output.text.trim().to_string()));
        }

        let entries = parse_list(&output.text);
        debug!("launchctl list: {} entries", entries.len());
        Ok(entries)
    }

    /// `launchctl print <target>`. Empty when the query fails.
    pub async fn query_detailed(&self, target: &str) -> DomainServices {
        let output = self.invoke(vec!["print".to_string(), target.to_string()]).await;
        if !output.launched {
            warn!("launchctl print {} could not run", target);
            return DomainServices::default();
        }

        let services = parse_print_services(&output.text);
        debug!("launchctl print {}: {} services", target, services.len());
        services
    }

    /// `launchctl print-disabled <target>`. Empty when the query fails.
    pub async fn query_disabled(&self, target: &str) -> HashSet<String> {
        let output = self
            .invoke(vec!["print-disabled".to_string(), target.to_string()])
            .await;
        if !output.launched {
            warn!("launchctl print-disabled {} could not run", target);
            return HashSet::new();
        }
        parse_disabled(&output.text)
    }

    pub async fn enable(&self, target: &str, label: &str) -> Result<(), ControlError> {
        self.run_step(&ControlStep::enable(target, label)?).await
    }

    pub async fn disable(&self, target: &str, label: &str) -> Result<(), ControlError> {
        self.run_step(&ControlStep::disable(target, label)?).await
    }

    pub async fn bootstrap(&self, target: &str, descriptor_path: &Path) -> Result<(), ControlError> {
        self.run_step(&ControlStep::bootstrap(target, descriptor_path)?).await
    }

    pub async fn bootout(&self, target: &str, label: &str) -> Result<(), ControlError> {
        self.run_step(&ControlStep::bootout(target, label)?).await
    }

    /// Run one step and judge its output.
    pub async fn run_step(&self, step: &ControlStep) -> Result<(), ControlError> {
        let output = self.invoke(step.args.clone()).await;
        if !output.launched {
            return Err(ControlError::Unavailable(format!("could not run {}", self.launchctl)));
        }

        if indicates_failure(output.exit_code, &output.text, step.verb.idempotent_markers()) {
            return Err(ControlError::CommandFailed(output.text.trim().to_string()));
        }

        if !output.success() {
            debug!(
                "launchctl {} exited with {:?}, treated as no-op: {}",
                step.verb,
                output.exit_code,
                output.text.trim()
            );
        }
        Ok(())
    }

    /// Run every step of a plan in order, without elevation.
    pub async fn run_plan(&self, plan: &CommandPlan) -> Result<(), ControlError> {
        for step in &plan.steps {
            match self.run_step(step).await {
                Ok(()) => {}
                Err(e) if step.tolerant => {
                    debug!("Ignoring failed {} for {}: {}", step.verb, plan.label, e);
                }
                Err(e) => return Err(e),
            }
        }
        info!("launchctl plan completed for {}/{}", plan.target, plan.label);
        Ok(())
    }

    /// `launchctl blame <target>/<label>`: why the service was last started.
    pub async fn blame(&self, target: &str, label: &str) -> Result<Option<String>, ControlError> {
        let label = validate_label(label)?;
        let output = self
            .invoke(vec!["blame".to_string(), format!("{}/{}", target, label)])
            .await;
        if !output.launched {
            return Err(ControlError::Unavailable(format!("could not run {}", self.launchctl)));
        }

        let text = output.text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

impl std::fmt::Debug for ControlBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlBridge")
            .field("launchctl", &self.launchctl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
