//! Parsers for `launchctl` text output.
//!
//! The formats are not stable interfaces. Every parser is lenient: lines it
//! does not understand are skipped.

use std::collections::{HashMap, HashSet};

use launchwarden_core::{ListEntry, LiveStatus};

/// Error marker looked for in mutation output, matched case-insensitively.
const ERROR_MARKER: &str = "error";

/// Output of a registering command that means "nothing to do".
pub const REGISTRATION_MARKERS: &[&str] = &["already bootstrapped", "already loaded", "service already loaded"];

/// Output of a deregistering command that means "nothing to do".
pub const DEREGISTRATION_MARKERS: &[&str] = &["not found", "could not find", "no such process", "not loaded"];

/// Parse `launchctl list`.
///
/// ```text
/// PID	Status	Label
/// 42	0	com.a.b
/// -	78	com.c.d
/// ```
pub fn parse_list(output: &str) -> HashMap<String, ListEntry> {
    let mut entries = HashMap::new();

    for line in output.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            continue;
        }
        if fields[0].trim() == "PID" {
            continue;
        }

        let label = fields[2].trim();
        if label.is_empty() {
            continue;
        }

        let entry = ListEntry::new(optional_field(fields[0]), optional_field(fields[1]));
        entries.insert(label.to_string(), entry);
    }

    entries
}

/// `-` and unparsable values are absent.
fn optional_field<T: std::str::FromStr>(field: &str) -> Option<T> {
    match field.trim() {
        "-" | "" => None,
        value => value.parse().ok(),
    }
}

/// Services reported by `launchctl print <target>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainServices {
    services: HashMap<String, Option<u32>>,
}

impl DomainServices {
    pub fn contains(&self, label: &str) -> bool {
        self.services.contains_key(label)
    }

    /// Tagged status of a listed service; `None` when the label is absent.
    pub fn live_status(&self, label: &str) -> Option<LiveStatus> {
        self.services.get(label).map(|pid| match pid {
            Some(pid) => LiveStatus::Running { pid: *pid },
            None => LiveStatus::LoadedNoPid,
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn insert(&mut self, label: impl Into<String>, pid: Option<u32>) {
        self.services.insert(label.into(), pid);
    }
}

/// Parse the `services = { ... }` block of `launchctl print <target>`.
///
/// Each line is `<pid> <status> <label>`; the label is the last token and a
/// leading pid greater than zero marks the service running.
pub fn parse_print_services(output: &str) -> DomainServices {
    let mut result = DomainServices::default();
    let mut in_services = false;

    for line in output.lines() {
        if !in_services {
            if line.contains("services = {") {
                in_services = true;
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.starts_with('}') {
            break;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let Some(label) = tokens.last() else {
            continue;
        };
        if label.starts_with("0x") {
            continue;
        }

        let pid = tokens
            .first()
            .filter(|_| tokens.len() > 1)
            .and_then(|t| t.parse::<u32>().ok())
            .filter(|pid| *pid > 0);
        result.insert(*label, pid);
    }

    result
}

/// Parse `launchctl print-disabled <target>`.
///
/// ```text
/// disabled services = {
///     "com.a.b" => disabled
///     "com.c.d" => enabled
/// }
/// ```
pub fn parse_disabled(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| {
            let (left, right) = line.split_once("=>")?;
            let state = right.trim();
            if state != "disabled" && state != "true" {
                return None;
            }
            let left = left.trim();
            let start = left.find('"')?;
            let rest = &left[start + 1..];
            let end = rest.find('"')?;
            let label = &rest[..end];
            (!label.is_empty()).then(|| label.to_string())
        })
        .collect()
}

/// Whether a mutation's output means it failed.
///
/// Exit status 0 always succeeds. Otherwise the output must carry an error
/// marker and none of the command's idempotency markers.
pub fn indicates_failure(exit_code: Option<i32>, text: &str, idempotent_markers: &[&str]) -> bool {
    if exit_code == Some(0) {
        return false;
    }
    let lower = text.to_lowercase();
    if !lower.contains(ERROR_MARKER) {
        return false;
    }
    !idempotent_markers.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
