//! Directory scanning.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use super::descriptor_model::{parse_descriptor, ServiceDescriptor};
use super::DESCRIPTOR_EXTENSION;
use crate::domain::ServiceDomain;

/// Parse every descriptor file in `directory`.
///
/// A missing or unreadable directory yields nothing. Files that fail to
/// parse are skipped; one bad file never aborts the scan. Order is
/// unspecified.
pub fn scan_directory(directory: &Path, domain: ServiceDomain) -> Vec<ServiceDescriptor> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Descriptor directory does not exist: {:?}", directory);
            return Vec::new();
        }
        Err(e) => {
            warn!("Failed to read descriptor directory {:?}: {}", directory, e);
            return Vec::new();
        }
    };

    let mut descriptors = Vec::new();
    let mut skipped = 0usize;

    for entry in entries.flatten() {
        let path = entry.path();
        if !is_descriptor_file(&path) {
            continue;
        }

        match parse_descriptor(&path, domain) {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(e) => {
                skipped += 1;
                debug!("Skipping descriptor {:?}: {}", path, e);
            }
        }
    }

    debug!(
        "Scanned {:?} ({}): {} descriptors, {} skipped",
        directory,
        domain,
        descriptors.len(),
        skipped
    );
    descriptors
}

fn is_descriptor_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(true);
    if hidden {
        return false;
    }

    let has_extension = path
        .extension()
        .map(|ext| ext == DESCRIPTOR_EXTENSION)
        .unwrap_or(false);

    has_extension && path.is_file()
}
