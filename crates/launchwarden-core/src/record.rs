//! The canonical per-service record produced by reconciliation.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptor::ServiceDescriptor;
use crate::domain::ServiceDomain;
use crate::status::ServiceState;

const SYSTEM_PREFIX: &str = "com.apple.";

/// Label prefixes stripped for display, longest first.
const VENDOR_PREFIXES: [&str; 5] = ["com.apple.", "com.", "org.", "io.", "net."];

/// Identity of a record across passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceKey {
    pub label: String,
    pub domain: ServiceDomain,
}

impl ServiceKey {
    pub fn new(label: impl Into<String>, domain: ServiceDomain) -> Self {
        Self {
            label: label.into(),
            domain,
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.label)
    }
}

/// A descriptor (when one exists) plus the state projected from live status.
///
/// Equality and hashing use only the [`ServiceKey`].
#[derive(Debug, Clone, Serialize)]
pub struct ServiceRecord {
    pub label: String,
    pub domain: ServiceDomain,
    pub descriptor: Option<ServiceDescriptor>,
    pub state: ServiceState,
}

impl ServiceRecord {
    pub fn from_descriptor(descriptor: ServiceDescriptor, state: ServiceState) -> Self {
        Self {
            label: descriptor.label.clone(),
            domain: descriptor.domain,
            descriptor: Some(descriptor),
            state,
        }
    }

    /// A record for a label the service manager knows but no file declares.
    pub fn without_descriptor(label: impl Into<String>, domain: ServiceDomain, state: ServiceState) -> Self {
        Self {
            label: label.into(),
            domain,
            descriptor: None,
            state,
        }
    }

    pub fn key(&self) -> ServiceKey {
        ServiceKey::new(self.label.clone(), self.domain)
    }

    /// Whether this record has the given identity.
    pub fn matches(&self, key: &ServiceKey) -> bool {
        self.domain == key.domain && self.label == key.label
    }

    /// Label without a common reverse-DNS vendor prefix.
    pub fn display_name(&self) -> &str {
        VENDOR_PREFIXES
            .iter()
            .find_map(|prefix| self.label.strip_prefix(prefix))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(&self.label)
    }

    /// First two dot components of the label, e.g. `com.docker`.
    pub fn vendor(&self) -> Option<String> {
        let mut parts = self.label.split('.');
        match (parts.next(), parts.next()) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => Some(format!("{}.{}", a, b)),
            _ => None,
        }
    }

    pub fn is_editable(&self) -> bool {
        !self.domain.is_read_only()
    }

    pub fn is_system_service(&self) -> bool {
        self.label.starts_with(SYSTEM_PREFIX)
    }

    pub fn executable(&self) -> Option<&str> {
        self.descriptor.as_ref()?.executable()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.descriptor.as_ref().map(|d| d.source_path.as_path())
    }

    /// Case-insensitive match against label, display name and vendor.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.label.to_lowercase().contains(&needle)
            || self.display_name().to_lowercase().contains(&needle)
            || self
                .vendor()
                .map(|v| v.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }
}

impl PartialEq for ServiceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.domain == other.domain
    }
}

impl Eq for ServiceRecord {}

impl Hash for ServiceRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
        self.domain.hash(state);
    }
}
