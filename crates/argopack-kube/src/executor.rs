//! Per-category reconciliation
//!
//! For one resource directory of a package: parse every manifest, stamp
//! provenance, list what the cluster already holds for the package, decide
//! per object, and issue the matching verb. Files are handled concurrently
//! and every failure is collected rather than stopping at the first.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use argopack_core::package::PackageDescriptor;
use argopack_core::provenance::Provenance;
use futures::future::join_all;
use semver::Version;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cluster::{ApiTarget, ClusterApi};
use crate::decision::UpdateDecision;
use crate::error::{KubeError, Result};
use crate::kind::{Category, ResourceKind};
use crate::manifest::ManagedResource;
use crate::options::InstallOptions;
use crate::resource::VersionedResource;

/// What happened to one declared resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceOutcome {
    pub name: String,
    pub kind: ResourceKind,
    pub decision: UpdateDecision,
    /// Version found in the cluster, if the object existed
    pub previous_version: Option<Version>,
    pub version: Version,
}

/// Outcomes of one category directory
#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub category: Category,
    pub outcomes: Vec<ResourceOutcome>,
}

impl CategoryReport {
    pub fn empty(category: Category) -> Self {
        Self {
            category,
            outcomes: Vec::new(),
        }
    }

    /// Resources processed, skips included
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    /// Resources that ended with a given decision
    pub fn count(&self, decision: UpdateDecision) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.decision == decision)
            .count()
    }
}

/// Reconciles one category directory at a time against a cluster
#[derive(Clone)]
pub struct ReconcileExecutor {
    api: Arc<dyn ClusterApi>,
}

impl ReconcileExecutor {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self { api }
    }

    /// Reconcile every manifest in `dir`
    ///
    /// A missing directory is not an error. With `filter`, only resources
    /// whose effective name is listed are processed. In dry-run mode the
    /// create half of a recreate is sent under a generated name, since the
    /// object it replaces is still present.
    pub async fn reconcile_directory(
        &self,
        dir: &Path,
        category: Category,
        package: &PackageDescriptor,
        provenance: &Provenance,
        filter: Option<&[String]>,
        options: &InstallOptions,
    ) -> Result<CategoryReport> {
        if !dir.is_dir() {
            debug!("No {} directory in package {}", category, package.name);
            return Ok(CategoryReport::empty(category));
        }

        let scope = format!("{} of {}", category, provenance.qualified_name());
        let mut failures = Vec::new();

        let loaded = join_all(
            manifest_files(dir)?
                .into_iter()
                .map(|path| load_manifest(path, category, options.cluster)),
        )
        .await;

        let mut resources = Vec::with_capacity(loaded.len());
        for result in loaded {
            match result {
                Ok(Some(resource)) => resources.push(resource),
                Ok(None) => {}
                Err(e) => failures.push(e),
            }
        }

        for resource in &mut resources {
            resource.decorate(package, provenance, category, options);
        }

        if let Some(names) = filter {
            resources.retain(|r| names.iter().any(|n| n == r.name()));
        }

        if resources.is_empty() {
            KubeError::aggregate(scope, failures)?;
            return Ok(CategoryReport::empty(category));
        }

        let target = ApiTarget::new(category.kind(options.cluster), &options.namespace);
        let selector = provenance.package_selector();
        let existing: Vec<VersionedResource> = match self.api.list(&target, &selector).await {
            Ok(objects) => objects
                .into_iter()
                .map(VersionedResource::from_object)
                .collect(),
            Err(e) => {
                failures.push(target.context("list", &selector, e));
                return Err(KubeError::reconcile_failed(scope, failures));
            }
        };

        let results = join_all(resources.iter().map(|resource| {
            let current = find_existing(&existing, resource.name());
            self.reconcile_resource(&target, resource, current, &package.version, options)
        }))
        .await;

        let mut outcomes = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => failures.push(e),
            }
        }

        KubeError::aggregate(scope, failures)?;
        Ok(CategoryReport { category, outcomes })
    }

    async fn reconcile_resource(
        &self,
        target: &ApiTarget,
        resource: &ManagedResource,
        existing: Option<&VersionedResource>,
        version: &Version,
        options: &InstallOptions,
    ) -> Result<ResourceOutcome> {
        let name = resource.name();
        let kind = resource.kind;
        let suffix = options.dry_run_suffix();
        let decision =
            UpdateDecision::decide(existing, version, options.force, kind.update_policy());
        let previous_version = existing.map(|e| e.version.clone());
        let old = previous_version
            .as_ref()
            .map(Version::to_string)
            .unwrap_or_default();

        match decision {
            UpdateDecision::Create => {
                info!(
                    "{} {} not present in the cluster. Installing v{}{}",
                    name, kind, version, suffix
                );
                self.api
                    .create(target, &resource.object, options.dry_run)
                    .await
                    .map_err(|e| target.context("create", name, e))?;
            }
            UpdateDecision::PatchUpdate => {
                info!(
                    "{} {} already present in the cluster. v{} will be patch updated to v{}{}",
                    name, kind, old, version, suffix
                );
                let body = resource.patch_body(existing.and_then(|e| e.resource_version.as_deref()));
                self.api
                    .patch(target, name, &body, kind.patch_kind(), options.dry_run)
                    .await
                    .map_err(|e| target.context("patch", name, e))?;
            }
            UpdateDecision::RecreateUpdate => {
                info!(
                    "{} {} already present in the cluster. v{} will be deleted and replaced with v{}{}",
                    name, kind, old, version, suffix
                );
                self.api
                    .delete(target, name, options.dry_run)
                    .await
                    .map_err(|e| target.context("delete", name, e))?;
                let body = if options.dry_run {
                    resource.validation_body()
                } else {
                    resource.object.clone()
                };
                self.api
                    .create(target, &body, options.dry_run)
                    .await
                    .map_err(|e| target.context("create", name, e))?;
            }
            UpdateDecision::SkipNewer => {
                debug!(
                    "{} {} already present in the cluster. v{} installed is newer than v{}. Skipping update.{}",
                    name, kind, old, version, suffix
                );
            }
            UpdateDecision::SkipUpToDate => {
                debug!(
                    "{} {} already present in the cluster. v{} is already latest version (candidate v{}). Skipping update.{}",
                    name, kind, old, version, suffix
                );
            }
        }

        Ok(ResourceOutcome {
            name: name.to_string(),
            kind,
            decision,
            previous_version,
            version: version.clone(),
        })
    }
}

fn find_existing<'a>(existing: &'a [VersionedResource], name: &str) -> Option<&'a VersionedResource> {
    let mut matches = existing.iter().filter(|e| e.name == name);
    let first = matches.next();
    if matches.next().is_some() {
        warn!(
            "More than one object named {} carries this package's labels, using the first",
            name
        );
    }
    first
}

/// YAML files directly inside `dir`, sorted by name
fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if is_yaml && path.is_file() {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

async fn load_manifest(
    path: PathBuf,
    category: Category,
    cluster: bool,
) -> Result<Option<ManagedResource>> {
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| KubeError::ManifestParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    ManagedResource::parse(&path, &content, category, cluster)
}
