//! Argopack Core - Package model for the Argo Workflows package manager
//!
//! This crate provides the cluster-independent pieces:
//! - `PackageDescriptor`: The `package.json` manifest
//! - `codec`: Label-safe encoding of package names, parents and registries
//! - `Provenance`: Labels and annotations stamped on every installed object
//! - `Arguments`: Workflow parameters for package runs
//! - `Settings`: Persistent user defaults

pub mod codec;
pub mod config;
pub mod error;
pub mod package;
pub mod provenance;
pub mod workflow;

pub use codec::{decode, encode, sanitize_name, special_encode};
pub use config::Settings;
pub use error::{CoreError, Result};
pub use package::{LoadedPackage, PackageConfig, PackageDescriptor};
pub use provenance::{Provenance, annotations_for_package, labels_for_package};
pub use workflow::{Arguments, Parameter, RunOptions, parse_arguments};
