//! The published record set.

use chrono::{DateTime, Utc};
use serde::Serialize;

use launchwarden_core::{ServiceDomain, ServiceKey, ServiceRecord};

/// Stage of the reconciliation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStage {
    /// No pass has run yet.
    Idle,
    /// Descriptors and live status are being gathered.
    Scanning,
    /// Gathered data is being merged into records.
    Merging,
    Published,
}

/// One complete, immutable result of a reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Sorted by label, then domain. Keys are unique.
    pub records: Vec<ServiceRecord>,
    /// Incremented on every publication; 0 before the first pass.
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Whether `launchctl list` answered during the pass.
    pub control_available: bool,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            generation: 0,
            refreshed_at: None,
            control_available: false,
        }
    }

    pub fn find(&self, key: &ServiceKey) -> Option<&ServiceRecord> {
        self.records.iter().find(|r| r.matches(key))
    }

    /// Records in `domain` (all when `None`) matching `search` (all when empty).
    pub fn filter(&self, domain: Option<ServiceDomain>, search: Option<&str>) -> Vec<ServiceRecord> {
        self.records
            .iter()
            .filter(|r| domain.is_none_or(|d| r.domain == d))
            .filter(|r| search.is_none_or(|s| r.matches_search(s)))
            .cloned()
            .collect()
    }

    /// Records with the given label, in any domain.
    pub fn by_label(&self, label: &str) -> Vec<&ServiceRecord> {
        self.records.iter().filter(|r| r.label == label).collect()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
