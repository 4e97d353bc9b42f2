//! Service domains and the registry that maps them to directories and
//! control-utility targets.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A partition of the launchd namespace with its own directory and access rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceDomain {
    /// Per-user agents in `~/Library/LaunchAgents`.
    UserAgents,
    /// Machine-wide agents in `/Library/LaunchAgents`.
    GlobalAgents,
    /// Machine-wide daemons in `/Library/LaunchDaemons`.
    GlobalDaemons,
    /// Apple agents in `/System/Library/LaunchAgents`.
    SystemAgents,
    /// Apple daemons in `/System/Library/LaunchDaemons`.
    SystemDaemons,
}

impl ServiceDomain {
    /// Every domain, in registry order.
    pub const ALL: [ServiceDomain; 5] = [
        ServiceDomain::UserAgents,
        ServiceDomain::GlobalAgents,
        ServiceDomain::GlobalDaemons,
        ServiceDomain::SystemAgents,
        ServiceDomain::SystemDaemons,
    ];

    /// Domains scanned when system services are hidden.
    pub const DEFAULT_SCAN: [ServiceDomain; 3] = [
        ServiceDomain::UserAgents,
        ServiceDomain::GlobalAgents,
        ServiceDomain::GlobalDaemons,
    ];

    /// Stable kebab-case identifier used by configuration and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceDomain::UserAgents => "user-agents",
            ServiceDomain::GlobalAgents => "global-agents",
            ServiceDomain::GlobalDaemons => "global-daemons",
            ServiceDomain::SystemAgents => "system-agents",
            ServiceDomain::SystemDaemons => "system-daemons",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceDomain::UserAgents => "User Agents",
            ServiceDomain::GlobalAgents => "Global Agents",
            ServiceDomain::GlobalDaemons => "Global Daemons",
            ServiceDomain::SystemAgents => "System Agents",
            ServiceDomain::SystemDaemons => "System Daemons",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ServiceDomain::UserAgents => "Per-user background services",
            ServiceDomain::GlobalAgents => "System-wide user services",
            ServiceDomain::GlobalDaemons => "System-wide background daemons",
            ServiceDomain::SystemAgents => "Apple system agents (read-only)",
            ServiceDomain::SystemDaemons => "Apple system daemons (read-only)",
        }
    }

    /// Whether mutating services in this domain needs administrator rights.
    pub fn requires_elevation(&self) -> bool {
        !matches!(self, ServiceDomain::UserAgents)
    }

    /// Whether the domain is protected by System Integrity Protection.
    pub fn is_read_only(&self) -> bool {
        self.is_system()
    }

    /// Whether the domain holds Apple-shipped services.
    pub fn is_system(&self) -> bool {
        matches!(self, ServiceDomain::SystemAgents | ServiceDomain::SystemDaemons)
    }

    /// Whether the domain is served by the system-wide launchd target.
    pub fn uses_system_target(&self) -> bool {
        matches!(self, ServiceDomain::GlobalDaemons | ServiceDomain::SystemDaemons)
    }

    fn index(&self) -> usize {
        *self as usize
    }

    fn default_directory(&self, home: Option<&Path>) -> PathBuf {
        match self {
            ServiceDomain::UserAgents => home
                .map(|h| h.join("Library").join("LaunchAgents"))
                .unwrap_or_else(|| PathBuf::from("/var/empty/Library/LaunchAgents")),
            ServiceDomain::GlobalAgents => PathBuf::from("/Library/LaunchAgents"),
            ServiceDomain::GlobalDaemons => PathBuf::from("/Library/LaunchDaemons"),
            ServiceDomain::SystemAgents => PathBuf::from("/System/Library/LaunchAgents"),
            ServiceDomain::SystemDaemons => PathBuf::from("/System/Library/LaunchDaemons"),
        }
    }
}

impl fmt::Display for ServiceDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ServiceDomain::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown domain '{}', expected one of: {}",
                    s,
                    ServiceDomain::ALL.map(|d| d.as_str()).join(", ")
                )
            })
    }
}

/// One row of the registry table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEntry {
    pub domain: ServiceDomain,
    pub directory: PathBuf,
    pub control_target: String,
}

/// Static lookup table from domain to directory and control target.
#[derive(Debug, Clone)]
pub struct DomainRegistry {
    uid: u32,
    entries: Vec<DomainEntry>,
}

impl DomainRegistry {
    /// Build the table for a user id and home directory.
    pub fn new(uid: u32, home: Option<&Path>) -> Self {
        let user_target = format!("gui/{}", uid);
        let entries = ServiceDomain::ALL
            .into_iter()
            .map(|domain| DomainEntry {
                domain,
                directory: domain.default_directory(home),
                control_target: if domain.uses_system_target() {
                    "system".to_string()
                } else {
                    user_target.clone()
                },
            })
            .collect();
        Self { uid, entries }
    }

    /// The table for the current process user.
    pub fn system() -> Self {
        Self::new(current_uid(), dirs::home_dir().as_deref())
    }

    /// Replace the directory scanned for a domain.
    pub fn with_directory(mut self, domain: ServiceDomain, directory: impl Into<PathBuf>) -> Self {
        self.entries[domain.index()].directory = directory.into();
        self
    }

    pub fn all_domains(&self) -> &'static [ServiceDomain] {
        &ServiceDomain::ALL
    }

    pub fn entry(&self, domain: ServiceDomain) -> &DomainEntry {
        &self.entries[domain.index()]
    }

    pub fn entries(&self) -> &[DomainEntry] {
        &self.entries
    }

    pub fn directory(&self, domain: ServiceDomain) -> &Path {
        &self.entry(domain).directory
    }

    pub fn control_target(&self, domain: ServiceDomain) -> &str {
        &self.entry(domain).control_target
    }

    pub fn requires_elevation(&self, domain: ServiceDomain) -> bool {
        domain.requires_elevation()
    }

    pub fn is_read_only(&self, domain: ServiceDomain) -> bool {
        domain.is_read_only()
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// The per-user GUI target, the one `launchctl list` reports on.
    pub fn user_target(&self) -> String {
        format!("gui/{}", self.uid)
    }
}

/// Real user id of the current process.
pub fn current_uid() -> u32 {
    #[cfg(unix)]
    {
        unsafe { libc::getuid() }
    }
    #[cfg(not(unix))]
    {
        0
    }
}

#[cfg(test)]
#[path = "domain_tests.rs"]
mod tests;
