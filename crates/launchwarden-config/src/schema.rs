//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub launchctl: LaunchctlConfig,

    #[serde(default)]
    pub domains: DomainsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reconciliation and watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Include the read-only system domains in every pass.
    #[serde(default)]
    pub show_system_services: bool,

    /// Trailing debounce window for filesystem change bursts.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Delay between a finished command and the follow-up refresh.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Watch the domain directories for changes.
    #[serde(default = "default_watch")]
    pub watch: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            show_system_services: false,
            debounce_ms: default_debounce_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            watch: default_watch(),
        }
    }
}

impl MonitorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_watch() -> bool {
    true
}

/// Control utility and elevation helper locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchctlConfig {
    #[serde(default = "default_launchctl_path")]
    pub path: PathBuf,

    #[serde(default = "default_osascript_path")]
    pub osascript_path: PathBuf,

    /// Timeout for read-only queries (`list`, `print`, `print-disabled`).
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for LaunchctlConfig {
    fn default() -> Self {
        Self {
            path: default_launchctl_path(),
            osascript_path: default_osascript_path(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl LaunchctlConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn default_launchctl_path() -> PathBuf {
    PathBuf::from("/bin/launchctl")
}

fn default_osascript_path() -> PathBuf {
    PathBuf::from("/usr/bin/osascript")
}

fn default_command_timeout() -> u64 {
    30
}

/// Optional per-domain directory overrides.
///
/// Unset entries keep the compiled-in locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainsConfig {
    #[serde(default)]
    pub user_agents: Option<PathBuf>,

    #[serde(default)]
    pub global_agents: Option<PathBuf>,

    #[serde(default)]
    pub global_daemons: Option<PathBuf>,

    #[serde(default)]
    pub system_agents: Option<PathBuf>,

    #[serde(default)]
    pub system_daemons: Option<PathBuf>,
}

impl DomainsConfig {
    /// Iterate over the overrides that are set, keyed by domain identifier.
    pub fn overrides(&self) -> impl Iterator<Item = (&'static str, &PathBuf)> {
        [
            ("user-agents", self.user_agents.as_ref()),
            ("global-agents", self.global_agents.as_ref()),
            ("global-daemons", self.global_daemons.as_ref()),
            ("system-agents", self.system_agents.as_ref()),
            ("system-daemons", self.system_daemons.as_ref()),
        ]
        .into_iter()
        .filter_map(|(id, path)| path.map(|p| (id, p)))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for the rolling log file.
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    home_config_dir().join("logs")
}

/// `~/.launchwarden`, or a temp location when no home directory exists.
pub fn home_config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".launchwarden"))
        .unwrap_or_else(|| std::env::temp_dir().join("launchwarden"))
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    home_config_dir().join("config.toml")
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
