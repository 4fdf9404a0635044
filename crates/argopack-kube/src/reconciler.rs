//! Package-level install orchestration
//!
//! Loads a package directory, then reconciles its five resource categories
//! concurrently. Dependency trees install every package of the tree
//! concurrently, all stamped with the root package as parent.

use std::path::Path;
use std::sync::Arc;

use argopack_core::package::LoadedPackage;
use argopack_core::provenance::Provenance;
use futures::future::{join, join_all};
use tracing::info;

use crate::cluster::ClusterApi;
use crate::decision::UpdateDecision;
use crate::error::{KubeError, Result};
use crate::executor::{CategoryReport, ReconcileExecutor, ResourceOutcome};
use crate::kind::Category;
use crate::options::{CategoryFilters, InstallOptions, dry_run_suffix};

/// Result of installing one package
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// `name@version` of the installed package
    pub package: String,
    /// `name@version` recorded as parent
    pub parent: String,
    pub dry_run: bool,
    pub categories: Vec<CategoryReport>,
}

impl InstallReport {
    /// Resources processed across every category, skips included
    pub fn total(&self) -> usize {
        self.categories.iter().map(CategoryReport::processed).sum()
    }

    /// Resources that ended with a given decision
    pub fn count(&self, decision: UpdateDecision) -> usize {
        self.categories.iter().map(|c| c.count(decision)).sum()
    }

    /// Every per-resource outcome, category by category
    pub fn outcomes(&self) -> impl Iterator<Item = &ResourceOutcome> {
        self.categories.iter().flat_map(|c| c.outcomes.iter())
    }

    /// Report for one category
    pub fn category(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Installs packages into a cluster
#[derive(Clone)]
pub struct PackageReconciler {
    executor: ReconcileExecutor,
}

impl PackageReconciler {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self {
            executor: ReconcileExecutor::new(api),
        }
    }

    /// Install the package at `path`
    ///
    /// Running this twice with the same inputs leaves every resource at
    /// `SkipUpToDate` on the second run.
    pub async fn install(&self, path: &Path, options: &InstallOptions) -> Result<InstallReport> {
        let package = LoadedPackage::load(path)?;
        self.install_package(&package, options).await
    }

    /// Install the package at `root` and every dependency under its `node_modules`
    ///
    /// Category filters only apply to the root package. The root report
    /// comes first, followed by dependencies in directory order.
    pub async fn install_tree(
        &self,
        root: &Path,
        options: &InstallOptions,
    ) -> Result<Vec<InstallReport>> {
        let package = LoadedPackage::load(root)?;
        let parent = options
            .parent
            .clone()
            .unwrap_or_else(|| package.descriptor.qualified_name());

        let root_options = options.clone().with_parent(parent.clone());
        let dependency_options = InstallOptions {
            filters: CategoryFilters::new(),
            ..root_options.clone()
        };
        let dependency_options = &dependency_options;

        let dependencies = package.dependency_dirs()?;
        info!(
            "Installing {} with {} dependenc(ies){}",
            parent,
            dependencies.len(),
            options.dry_run_suffix()
        );

        let (root_result, dependency_results) = join(
            self.install_package(&package, &root_options),
            join_all(dependencies.iter().map(|dir| async move {
                let dependency = LoadedPackage::load(dir)?;
                self.install_package(&dependency, dependency_options).await
            })),
        )
        .await;

        let mut reports = Vec::with_capacity(dependency_results.len() + 1);
        let mut failures = Vec::new();
        for result in std::iter::once(root_result).chain(dependency_results) {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => failures.push(e),
            }
        }

        KubeError::aggregate(format!("dependency tree of {}", parent), failures)?;
        Ok(reports)
    }

    async fn install_package(
        &self,
        package: &LoadedPackage,
        options: &InstallOptions,
    ) -> Result<InstallReport> {
        let descriptor = &package.descriptor;
        let parent = options
            .parent
            .clone()
            .unwrap_or_else(|| descriptor.qualified_name());
        let provenance = Provenance::new(descriptor, parent.clone(), options.registry.clone());
        let provenance = &provenance;

        let results = join_all(Category::ALL.iter().map(|&category| {
            let dir = package.category_dir(category.dir_name());
            async move {
                self.executor
                    .reconcile_directory(
                        &dir,
                        category,
                        descriptor,
                        provenance,
                        options.filter_for(category),
                        options,
                    )
                    .await
            }
        }))
        .await;

        let mut categories = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(report) => categories.push(report),
                Err(e) => failures.push(e),
            }
        }
        KubeError::aggregate(provenance.qualified_name(), failures)?;

        let report = InstallReport {
            package: provenance.qualified_name(),
            parent,
            dry_run: options.dry_run,
            categories,
        };
        info!(
            "Installed {} resource(s) for {}{}",
            report.total(),
            report.package,
            dry_run_suffix(options.dry_run)
        );
        Ok(report)
    }
}
