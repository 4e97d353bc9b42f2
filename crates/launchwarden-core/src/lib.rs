//! # LaunchWarden Core
//!
//! The data side of service reconciliation: where descriptors live, how they
//! parse, and what a reconciled service record looks like.
//!
//! ## Features
//!
//! - Domain registry (directory, control target, elevation and read-only flags)
//! - Descriptor scanning that tolerates malformed files
//! - Descriptor documents that round-trip through the XML property list format
//! - Tagged live status and reconciled service state
//!
//! ## Usage
//!
//! ```rust,ignore
//! use launchwarden_core::{scan_directory, DomainRegistry, ServiceDomain};
//!
//! let registry = DomainRegistry::system();
//! let dir = registry.directory(ServiceDomain::UserAgents);
//! let descriptors = scan_directory(dir, ServiceDomain::UserAgents);
//! ```

pub mod descriptor;
pub mod domain;
pub mod error;
pub mod record;
pub mod status;

pub use descriptor::{
    parse_descriptor, scan_directory, DescriptorDocument, ServiceDescriptor, DESCRIPTOR_EXTENSION,
};
pub use domain::{current_uid, DomainEntry, DomainRegistry, ServiceDomain};
pub use error::DescriptorError;
pub use record::{ServiceKey, ServiceRecord};
pub use status::{ListEntry, LiveStatus, ServiceState};
