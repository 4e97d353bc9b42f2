//! Merging scanned descriptors with live status into records.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use launchwarden_core::{
    DomainRegistry, ListEntry, ServiceDescriptor, ServiceDomain, ServiceKey, ServiceRecord, ServiceState,
};
use launchwarden_launchctl::DomainServices;

const SYSTEM_PREFIX: &str = "com.apple.";

/// What the service manager reported during one pass.
#[derive(Debug, Clone, Default)]
pub struct LiveView {
    /// `launchctl list`; `None` when the utility was unreachable.
    pub list: Option<HashMap<String, ListEntry>>,
    /// `launchctl print <target>` for targets `list` does not cover.
    pub detailed: HashMap<String, DomainServices>,
    /// `launchctl print-disabled <target>` per target.
    pub disabled: HashMap<String, HashSet<String>>,
}

impl LiveView {
    pub fn is_available(&self) -> bool {
        self.list.is_some()
    }

    fn is_disabled(&self, target: &str, label: &str) -> bool {
        self.disabled.get(target).is_some_and(|set| set.contains(label))
    }
}

/// Project the state of one descriptor.
pub fn project_state(descriptor: &ServiceDescriptor, target: &str, live: &LiveView) -> ServiceState {
    let Some(list) = live.list.as_ref() else {
        return ServiceState::Unknown;
    };

    if let Some(entry) = list.get(&descriptor.label) {
        return entry.live_status().into();
    }

    let detailed = live
        .detailed
        .get(target)
        .and_then(|services| services.live_status(&descriptor.label));
    if let Some(status) = detailed {
        return status.into();
    }

    if descriptor.disabled || live.is_disabled(target, &descriptor.label) {
        ServiceState::Disabled
    } else {
        ServiceState::Unloaded
    }
}

/// Build the full, sorted record set.
///
/// Descriptors sharing a key keep the first by source path. Labels that only
/// the service manager knows get descriptor-less records when system
/// services are included.
pub fn reconcile(
    descriptors: Vec<ServiceDescriptor>,
    live: &LiveView,
    registry: &DomainRegistry,
    include_system: bool,
) -> Vec<ServiceRecord> {
    let mut by_key: BTreeMap<ServiceKey, ServiceRecord> = BTreeMap::new();
    let mut known_labels: HashSet<String> = HashSet::new();

    let mut descriptors = descriptors;
    descriptors.sort_by(|a, b| a.source_path.cmp(&b.source_path));

    for descriptor in descriptors {
        let key = ServiceKey::new(descriptor.label.clone(), descriptor.domain);
        if by_key.contains_key(&key) {
            debug!("Duplicate descriptor for {}: {:?}", key, descriptor.source_path);
            continue;
        }
        let target = registry.control_target(descriptor.domain);
        let state = project_state(&descriptor, target, live);
        known_labels.insert(descriptor.label.clone());
        by_key.insert(key, ServiceRecord::from_descriptor(descriptor, state));
    }

    if include_system {
        for record in orphan_records(live, registry, &known_labels) {
            by_key.entry(record.key()).or_insert(record);
        }
    }

    by_key.into_values().collect()
}

fn orphan_records(live: &LiveView, registry: &DomainRegistry, known: &HashSet<String>) -> Vec<ServiceRecord> {
    let mut records = Vec::new();

    if let Some(list) = live.list.as_ref() {
        for (label, entry) in list.iter().filter(|(label, _)| !known.contains(*label)) {
            let domain = guess_domain(label, false);
            records.push(ServiceRecord::without_descriptor(label, domain, entry.live_status().into()));
        }
    }

    let user_target = registry.user_target();
    for (target, services) in live.detailed.iter().filter(|(t, _)| **t != user_target) {
        for label in services.labels().filter(|label| !known.contains(*label)) {
            if live.list.as_ref().is_some_and(|list| list.contains_key(label)) {
                continue;
            }
            let domain = guess_domain(label, true);
            let state = services
                .live_status(label)
                .map_or(ServiceState::Unknown, ServiceState::from);
            debug!("Live-only service {} in {} ({})", label, target, domain);
            records.push(ServiceRecord::without_descriptor(label, domain, state));
        }
    }

    records
}

/// Domain for a label with no descriptor.
fn guess_domain(label: &str, system_target: bool) -> ServiceDomain {
    match (label.starts_with(SYSTEM_PREFIX), system_target) {
        (true, false) => ServiceDomain::SystemAgents,
        (true, true) => ServiceDomain::SystemDaemons,
        (false, false) => ServiceDomain::UserAgents,
        (false, true) => ServiceDomain::GlobalDaemons,
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
