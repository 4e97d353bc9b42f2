//! Service descriptor files (launchd property lists).
//!
//! Scanning is read-only and lossy: only the recognized keys are modeled.
//! [`DescriptorDocument`] keeps the whole dictionary for editing.

mod descriptor_document;
mod descriptor_model;
mod descriptor_scan;

pub use descriptor_document::DescriptorDocument;
pub use descriptor_model::{parse_descriptor, ServiceDescriptor};
pub use descriptor_scan::scan_directory;

/// File extension of descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "plist";

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
