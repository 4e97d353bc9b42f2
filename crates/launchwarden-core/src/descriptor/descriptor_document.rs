//! Editable descriptor documents.

use std::path::{Path, PathBuf};

use plist::{Dictionary, Value};
use tracing::info;

use super::descriptor_model::*;
use crate::domain::ServiceDomain;
use crate::error::DescriptorError;

/// The full top-level dictionary of a descriptor file.
///
/// Unlike [`ServiceDescriptor`], a document keeps every key, including ones
/// this crate does not model, so saving it back loses nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorDocument {
    path: PathBuf,
    domain: ServiceDomain,
    root: Dictionary,
}

impl DescriptorDocument {
    /// Read a descriptor file as a document.
    pub fn load(path: impl Into<PathBuf>, domain: ServiceDomain) -> Result<Self, DescriptorError> {
        let path = path.into();
        let root = read_dictionary(&path)?;
        Ok(Self { path, domain, root })
    }

    /// Build a document holding the recognized keys of a descriptor.
    pub fn from_descriptor(descriptor: &ServiceDescriptor) -> Self {
        let mut root = Dictionary::new();
        root.insert(KEY_LABEL.to_string(), Value::from(descriptor.label.as_str()));

        if let Some(ref program) = descriptor.program {
            root.insert(KEY_PROGRAM.to_string(), Value::from(program.as_str()));
        }
        if let Some(ref args) = descriptor.program_arguments {
            let array = args.iter().map(|a| Value::from(a.as_str())).collect::<Vec<_>>();
            root.insert(KEY_PROGRAM_ARGUMENTS.to_string(), Value::Array(array));
        }

        root.insert(KEY_RUN_AT_LOAD.to_string(), Value::Boolean(descriptor.run_at_load));
        root.insert(KEY_KEEP_ALIVE.to_string(), Value::Boolean(descriptor.keep_alive));

        if let Some(interval) = descriptor.start_interval {
            root.insert(KEY_START_INTERVAL.to_string(), Value::from(interval));
        }
        if !descriptor.environment_variables.is_empty() {
            let mut env = Dictionary::new();
            for (key, value) in &descriptor.environment_variables {
                env.insert(key.clone(), Value::from(value.as_str()));
            }
            root.insert(KEY_ENVIRONMENT.to_string(), Value::Dictionary(env));
        }

        for (key, value) in [
            (KEY_WORKING_DIRECTORY, &descriptor.working_directory),
            (KEY_STDOUT, &descriptor.stdout_path),
            (KEY_STDERR, &descriptor.stderr_path),
            (KEY_USER, &descriptor.user),
            (KEY_GROUP, &descriptor.group),
        ] {
            if let Some(v) = value {
                root.insert(key.to_string(), Value::from(v.as_str()));
            }
        }

        if descriptor.disabled {
            root.insert(KEY_DISABLED.to_string(), Value::Boolean(true));
        }

        Self {
            path: descriptor.source_path.clone(),
            domain: descriptor.domain,
            root,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn domain(&self) -> ServiceDomain {
        self.domain
    }

    pub fn root(&self) -> &Dictionary {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.root.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.root.remove(key)
    }

    pub fn label(&self) -> Option<&str> {
        self.root.get(KEY_LABEL).and_then(Value::as_string)
    }

    /// Set or clear the explicit `Disabled` opt-out.
    pub fn set_disabled(&mut self, disabled: bool) {
        if disabled {
            self.set(KEY_DISABLED, true);
        } else {
            self.remove(KEY_DISABLED);
        }
    }

    pub fn set_run_at_load(&mut self, run_at_load: bool) {
        self.set(KEY_RUN_AT_LOAD, run_at_load);
    }

    /// Re-derive the modeled view of this document.
    pub fn to_descriptor(&self) -> Result<ServiceDescriptor, DescriptorError> {
        ServiceDescriptor::from_dictionary(&self.root, &self.path, self.domain)
    }

    /// Render the document as an XML property list.
    pub fn to_xml_string(&self) -> Result<String, DescriptorError> {
        let mut buf = Vec::new();
        Value::Dictionary(self.root.clone()).to_writer_xml(&mut buf)?;
        String::from_utf8(buf).map_err(|e| self.write_error(e))
    }

    /// Write the document back to its path as an XML property list.
    ///
    /// Documents of read-only domains are rejected before the file is touched.
    pub fn save(&self) -> Result<(), DescriptorError> {
        if self.domain.is_read_only() {
            return Err(DescriptorError::ReadOnlyDomain(self.domain));
        }

        Value::Dictionary(self.root.clone())
            .to_file_xml(&self.path)
            .map_err(|e| self.write_error(e))?;

        info!("Saved descriptor: {}", self.path.display());
        Ok(())
    }

    fn write_error(&self, e: impl std::fmt::Display) -> DescriptorError {
        DescriptorError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}
