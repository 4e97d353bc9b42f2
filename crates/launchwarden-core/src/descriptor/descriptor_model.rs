//! Descriptor model and key extraction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use plist::{Dictionary, Value};
use serde::{Deserialize, Serialize};

use crate::domain::ServiceDomain;
use crate::error::DescriptorError;

pub(super) const KEY_LABEL: &str = "Label";
pub(super) const KEY_PROGRAM: &str = "Program";
pub(super) const KEY_PROGRAM_ARGUMENTS: &str = "ProgramArguments";
pub(super) const KEY_RUN_AT_LOAD: &str = "RunAtLoad";
pub(super) const KEY_KEEP_ALIVE: &str = "KeepAlive";
pub(super) const KEY_START_INTERVAL: &str = "StartInterval";
pub(super) const KEY_ENVIRONMENT: &str = "EnvironmentVariables";
pub(super) const KEY_WORKING_DIRECTORY: &str = "WorkingDirectory";
pub(super) const KEY_STDOUT: &str = "StandardOutPath";
pub(super) const KEY_STDERR: &str = "StandardErrorPath";
pub(super) const KEY_USER: &str = "UserName";
pub(super) const KEY_GROUP: &str = "GroupName";
pub(super) const KEY_DISABLED: &str = "Disabled";

/// A service declaration parsed from one descriptor file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Unique key within a domain. Never empty.
    pub label: String,
    pub domain: ServiceDomain,
    pub source_path: PathBuf,
    pub program: Option<String>,
    pub program_arguments: Option<Vec<String>>,
    pub run_at_load: bool,
    /// True for `KeepAlive = true` or a non-empty condition map.
    pub keep_alive: bool,
    pub start_interval: Option<u64>,
    pub environment_variables: BTreeMap<String, String>,
    pub working_directory: Option<String>,
    pub stdout_path: Option<String>,
    pub stderr_path: Option<String>,
    pub user: Option<String>,
    pub group: Option<String>,
    /// Explicit `Disabled` opt-out in the file.
    pub disabled: bool,
}

impl ServiceDescriptor {
    /// The program that launchd runs: `Program`, else the first argument.
    pub fn executable(&self) -> Option<&str> {
        self.program
            .as_deref()
            .or_else(|| self.program_arguments.as_ref()?.first().map(String::as_str))
    }

    /// Build a descriptor from a parsed top-level dictionary.
    pub fn from_dictionary(
        dict: &Dictionary,
        source_path: &Path,
        domain: ServiceDomain,
    ) -> Result<Self, DescriptorError> {
        let label = string_value(dict, KEY_LABEL)
            .filter(|l| !l.trim().is_empty())
            .or_else(|| label_from_path(source_path))
            .ok_or_else(|| DescriptorError::InvalidFormat {
                path: source_path.to_path_buf(),
                reason: "no Label key and no usable file name".to_string(),
            })?;

        Ok(Self {
            label,
            domain,
            source_path: source_path.to_path_buf(),
            program: string_value(dict, KEY_PROGRAM),
            program_arguments: string_array(dict.get(KEY_PROGRAM_ARGUMENTS)),
            run_at_load: bool_value(dict, KEY_RUN_AT_LOAD),
            keep_alive: keep_alive_flag(dict.get(KEY_KEEP_ALIVE)),
            start_interval: dict.get(KEY_START_INTERVAL).and_then(integer_value),
            environment_variables: string_map(dict.get(KEY_ENVIRONMENT)),
            working_directory: string_value(dict, KEY_WORKING_DIRECTORY),
            stdout_path: string_value(dict, KEY_STDOUT),
            stderr_path: string_value(dict, KEY_STDERR),
            user: string_value(dict, KEY_USER),
            group: string_value(dict, KEY_GROUP),
            disabled: bool_value(dict, KEY_DISABLED),
        })
    }
}

/// Parse one descriptor file (XML or binary property list).
pub fn parse_descriptor(path: &Path, domain: ServiceDomain) -> Result<ServiceDescriptor, DescriptorError> {
    let dict = read_dictionary(path)?;
    ServiceDescriptor::from_dictionary(&dict, path, domain)
}

pub(super) fn read_dictionary(path: &Path) -> Result<Dictionary, DescriptorError> {
    if !path.exists() {
        return Err(DescriptorError::NotFound(path.to_path_buf()));
    }

    let value = Value::from_file(path).map_err(|e| DescriptorError::InvalidFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    value.into_dictionary().ok_or_else(|| DescriptorError::InvalidFormat {
        path: path.to_path_buf(),
        reason: "top-level value is not a dictionary".to_string(),
    })
}

/// `com.foo.bar.plist` -> `com.foo.bar`.
pub(super) fn label_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}

/// `KeepAlive` is either a boolean or a map of conditions. The conditions
/// themselves are not modeled; any non-empty map counts as keep-alive.
pub(super) fn keep_alive_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Boolean(b)) => *b,
        Some(Value::Dictionary(conditions)) => !conditions.is_empty(),
        _ => false,
    }
}

fn string_value(dict: &Dictionary, key: &str) -> Option<String> {
    dict.get(key).and_then(Value::as_string).map(str::to_string)
}

fn bool_value(dict: &Dictionary, key: &str) -> bool {
    dict.get(key).and_then(Value::as_boolean).unwrap_or(false)
}

fn integer_value(value: &Value) -> Option<u64> {
    value
        .as_unsigned_integer()
        .or_else(|| value.as_signed_integer().and_then(|i| u64::try_from(i).ok()))
}

/// All elements must be strings, otherwise the key is treated as absent.
fn string_array(value: Option<&Value>) -> Option<Vec<String>> {
    value?
        .as_array()?
        .iter()
        .map(|v| v.as_string().map(str::to_string))
        .collect()
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_dictionary)
        .map(|dict| {
            dict.iter()
                .filter_map(|(k, v)| v.as_string().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
