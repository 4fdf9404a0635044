//! Argopack Kube - cluster reconciliation for Argo Workflows packages
//!
//! This crate provides:
//! - **Kind table**: API group, scope, update policy and spec rewrites per managed kind
//! - **Update decisions**: version-guarded create / patch / recreate / skip
//! - **Reconciliation**: concurrent per-category installs with aggregated failures
//! - **Queries**: list and delete managed objects by label selector
//! - **Installed packages**: list, info, uninstall and run packages found in the cluster
//! - **Cluster API**: a `kube`-backed implementation and an in-memory mock for tests

pub mod cluster;
pub mod decision;
pub mod error;
pub mod executor;
pub mod kind;
pub mod manifest;
pub mod options;
pub mod package;
pub mod query;
pub mod reconciler;
pub mod resource;

pub use cluster::{ApiTarget, ClusterApi, KubeClusterApi, MockCluster, OperationCounts, Verb};
pub use decision::UpdateDecision;
pub use error::{KubeError, Result};
pub use executor::{CategoryReport, ReconcileExecutor, ResourceOutcome};
pub use kind::{Category, PatchKind, ResourceKind, ResourceScope, UpdatePolicy};
pub use manifest::ManagedResource;
pub use options::{CategoryFilters, InstallOptions, UninstallOptions};
pub use package::{CronSummary, InstalledPackage, PackageDetails, TemplateInfo, UninstallReport};
pub use query::{delete_by_label_selector, list_by_label_selector};
pub use reconciler::{InstallReport, PackageReconciler};
pub use resource::VersionedResource;
