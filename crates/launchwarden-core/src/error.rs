//! Descriptor errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ServiceDomain;

/// Errors raised while reading or writing a service descriptor.
///
/// Scanning never surfaces these: a file that fails to parse is skipped.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Descriptor file does not exist.
    #[error("Descriptor file not found: {0}")]
    NotFound(PathBuf),

    /// File is not a property list with a top-level dictionary.
    #[error("Invalid descriptor format in {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    /// Attempted write into a domain protected by System Integrity Protection.
    #[error("Domain {0} is read-only")]
    ReadOnlyDomain(ServiceDomain),

    /// Serializing the descriptor back to disk failed.
    #[error("Failed to write descriptor {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    /// Property list encoding error.
    #[error("Property list error: {0}")]
    Plist(#[from] plist::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
