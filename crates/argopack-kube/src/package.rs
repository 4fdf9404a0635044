//! Installed packages
//!
//! An installed package is represented in the cluster by its
//! (Cluster)WorkflowTemplate. Everything else it owns is found through its
//! provenance labels.

use std::collections::BTreeSet;

use argopack_core::provenance::{Provenance, installer_selector, package_selector};
use argopack_core::workflow::{Arguments, RunOptions, package_workflow, template_workflow};
use futures::future::{BoxFuture, FutureExt, join_all};
use futures::try_join;
use kube::api::DynamicObject;
use serde_json::Value;
use tracing::info;

use crate::cluster::{ApiTarget, ClusterApi};
use crate::error::{KubeError, Result};
use crate::kind::ResourceKind;
use crate::options::{UninstallOptions, dry_run_suffix};
use crate::query::{delete_by_label_selector, list_by_label_selector};
use crate::resource::VersionedResource;

/// Kinds removed on uninstall besides the package's own template kind
const OWNED_KINDS: [ResourceKind; 4] = [
    ResourceKind::ConfigMap,
    ResourceKind::Secret,
    ResourceKind::Pipeline,
    ResourceKind::CronWorkflow,
];

/// A template of an installed package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInfo {
    pub name: String,
    pub inputs: Arguments,
}

/// A package as found in the cluster
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub resource: VersionedResource,
    /// WorkflowTemplate or ClusterWorkflowTemplate
    pub kind: ResourceKind,
    pub provenance: Provenance,
    pub entrypoint: Option<String>,
    pub arguments: Arguments,
    pub templates: Vec<TemplateInfo>,
}

/// A CronWorkflow of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSummary {
    pub name: String,
    pub schedule: Option<String>,
    pub timezone: Option<String>,
}

/// Objects owned by a package, by category
#[derive(Debug, Clone, Default)]
pub struct PackageDetails {
    pub pipelines: Vec<String>,
    pub config_maps: Vec<String>,
    pub secrets: Vec<String>,
    pub cron_workflows: Vec<CronSummary>,
}

/// Result of uninstalling a package
#[derive(Debug, Clone)]
pub struct UninstallReport {
    /// `name@version`
    pub package: String,
    pub dry_run: bool,
    pub dependencies: Vec<UninstallReport>,
    pub deleted: Vec<VersionedResource>,
}

impl UninstallReport {
    /// Objects deleted, dependencies included
    pub fn total_deleted(&self) -> usize {
        self.deleted.len()
            + self
                .dependencies
                .iter()
                .map(UninstallReport::total_deleted)
                .sum::<usize>()
    }
}

impl InstalledPackage {
    /// Read a package from its template object
    pub fn from_object(kind: ResourceKind, object: DynamicObject) -> Result<Self> {
        let resource = VersionedResource::from_object(object);
        let provenance = resource.provenance()?;

        let spec = resource.raw.data.get("spec");
        let entrypoint = spec
            .and_then(|s| s.get("entrypoint"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let arguments = Arguments::from_value(spec.and_then(|s| s.get("arguments")));
        let templates = spec
            .and_then(|s| s.get("templates"))
            .and_then(Value::as_array)
            .map(|templates| {
                templates
                    .iter()
                    .filter_map(|t| {
                        Some(TemplateInfo {
                            name: t.get("name")?.as_str()?.to_string(),
                            inputs: Arguments::from_value(t.get("inputs")),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            resource,
            kind,
            provenance,
            entrypoint,
            arguments,
            templates,
        })
    }

    /// Name of the template object
    pub fn name(&self) -> &str {
        &self.resource.name
    }

    /// A package can be run when its template declares an entrypoint
    pub fn is_executable(&self) -> bool {
        self.entrypoint.is_some()
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.kind == ResourceKind::ClusterWorkflowTemplate
    }

    /// Look up one of the package's templates
    pub fn template(&self, name: &str) -> Result<&TemplateInfo> {
        self.templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| KubeError::TemplateNotFound {
                package: self.provenance.name.clone(),
                template: name.to_string(),
            })
    }

    /// Every package installed in a namespace, or at cluster scope
    pub async fn list(api: &dyn ClusterApi, namespace: &str, cluster: bool) -> Result<Vec<Self>> {
        let kind = template_kind(cluster);
        let target = ApiTarget::new(kind, namespace);
        list_by_label_selector(api, &target, &installer_selector())
            .await?
            .into_iter()
            .map(|resource| Self::from_object(kind, resource.raw))
            .collect()
    }

    /// The single installed package with this name
    pub async fn find(
        api: &dyn ClusterApi,
        namespace: &str,
        name: &str,
        cluster: bool,
    ) -> Result<Self> {
        let kind = template_kind(cluster);
        let target = ApiTarget::new(kind, namespace);
        let mut found = list_by_label_selector(api, &target, &package_selector(name)).await?;

        if found.len() != 1 {
            return Err(KubeError::PackageNotFound {
                name: name.to_string(),
                scope: target.scope(),
                found: found.len(),
            });
        }
        let resource = found.remove(0);
        Self::from_object(kind, resource.raw)
    }

    /// Packages installed with this one as parent, one entry per package
    pub async fn dependencies(&self, api: &dyn ClusterApi) -> Result<Vec<Self>> {
        let target = ApiTarget {
            kind: self.kind,
            namespace: self.resource.namespace.clone(),
        };
        let found =
            list_by_label_selector(api, &target, &self.provenance.dependency_selector()).await?;

        let mut seen = BTreeSet::new();
        let mut dependencies = Vec::new();
        for resource in found {
            let dependency = Self::from_object(self.kind, resource.raw)?;
            if dependency.provenance.name == self.provenance.name {
                continue;
            }
            if seen.insert(dependency.provenance.name.clone()) {
                dependencies.push(dependency);
            }
        }
        Ok(dependencies)
    }

    /// Pipelines, config maps, secrets and cron workflows of this package
    pub async fn details(&self, api: &dyn ClusterApi, namespace: &str) -> Result<PackageDetails> {
        let selector = self.provenance.package_selector();
        let names = |resources: Vec<VersionedResource>| -> Vec<String> {
            resources.into_iter().map(|r| r.name).collect()
        };

        let pipeline_target = ApiTarget::new(ResourceKind::Pipeline, namespace);
        let config_map_target = ApiTarget::new(ResourceKind::ConfigMap, namespace);
        let secret_target = ApiTarget::new(ResourceKind::Secret, namespace);
        let cron_target = ApiTarget::new(ResourceKind::CronWorkflow, namespace);

        let (pipelines, config_maps, secrets, cron_workflows) = try_join!(
            list_by_label_selector(api, &pipeline_target, &selector),
            list_by_label_selector(api, &config_map_target, &selector),
            list_by_label_selector(api, &secret_target, &selector),
            list_by_label_selector(api, &cron_target, &selector),
        )?;

        let cron_workflows = cron_workflows
            .into_iter()
            .map(|cron| {
                let spec = cron.raw.data.get("spec");
                let field = |key: &str| {
                    spec.and_then(|s| s.get(key))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                };
                CronSummary {
                    schedule: field("schedule"),
                    timezone: field("timezone"),
                    name: cron.name,
                }
            })
            .collect();

        Ok(PackageDetails {
            pipelines: names(pipelines),
            config_maps: names(config_maps),
            secrets: names(secrets),
            cron_workflows,
        })
    }

    /// Remove this package and everything installed with it as parent
    ///
    /// Dependencies go first. If any of them fails, this package is left in
    /// place so a retry can find its dependencies again.
    pub fn uninstall<'a>(
        &'a self,
        api: &'a dyn ClusterApi,
        options: &'a UninstallOptions,
    ) -> BoxFuture<'a, Result<UninstallReport>> {
        async move {
            let package = self.provenance.qualified_name();
            let suffix = dry_run_suffix(options.dry_run);

            let dependencies = self.dependencies(api).await?;
            let results = join_all(dependencies.iter().map(|dependency| {
                info!(
                    "Deleting dependent package {}{}",
                    dependency.provenance.name, suffix
                );
                dependency.uninstall(api, options)
            }))
            .await;

            let mut dependency_reports = Vec::with_capacity(results.len());
            let mut failures = Vec::new();
            for result in results {
                match result {
                    Ok(report) => dependency_reports.push(report),
                    Err(e) => failures.push(e),
                }
            }
            KubeError::aggregate(format!("uninstall dependencies of {}", package), failures)?;

            info!("Deleting resources of package {}{}", package, suffix);
            let selector = self.provenance.package_selector();
            let kinds = OWNED_KINDS.iter().copied().chain(std::iter::once(self.kind));
            let results = join_all(kinds.map(|kind| {
                let target = ApiTarget::new(kind, &options.namespace);
                let selector = &selector;
                async move { delete_by_label_selector(api, &target, selector, options.dry_run).await }
            }))
            .await;

            let mut deleted = Vec::new();
            let mut failures = Vec::new();
            for result in results {
                match result {
                    Ok(resources) => deleted.extend(resources),
                    Err(e) => failures.push(e),
                }
            }
            KubeError::aggregate(format!("uninstall {}", package), failures)?;

            Ok(UninstallReport {
                package,
                dry_run: options.dry_run,
                dependencies: dependency_reports,
                deleted,
            })
        }
        .boxed()
    }

    /// Submit a Workflow running the package's entrypoint
    pub async fn run(
        &self,
        api: &dyn ClusterApi,
        namespace: &str,
        args: &Arguments,
        options: &RunOptions,
    ) -> Result<DynamicObject> {
        if !self.is_executable() {
            return Err(KubeError::NotRunnable {
                name: self.provenance.name.clone(),
            });
        }
        self.arguments.check_required(args)?;

        let options = self.run_options(options);
        let workflow = package_workflow(self.name(), args, &options);
        submit(api, namespace, workflow).await
    }

    /// Submit a Workflow calling a single template of the package
    pub async fn run_template(
        &self,
        api: &dyn ClusterApi,
        namespace: &str,
        template: &str,
        args: &Arguments,
        options: &RunOptions,
    ) -> Result<DynamicObject> {
        let template = self.template(template)?;
        template.inputs.check_required(args)?;

        let options = self.run_options(options);
        let workflow = template_workflow(self.name(), &template.name, args, &options);
        submit(api, namespace, workflow).await
    }

    /// Template references follow the scope the package was installed at
    fn run_options(&self, options: &RunOptions) -> RunOptions {
        RunOptions {
            cluster: self.is_cluster_scoped(),
            ..options.clone()
        }
    }
}

fn template_kind(cluster: bool) -> ResourceKind {
    ResourceKind::WorkflowTemplate.for_install(cluster)
}

async fn submit(api: &dyn ClusterApi, namespace: &str, workflow: Value) -> Result<DynamicObject> {
    let object: DynamicObject = serde_json::from_value(workflow)?;
    let target = ApiTarget::new(ResourceKind::Workflow, namespace);
    let prefix = object.metadata.generate_name.clone().unwrap_or_default();

    let created = api
        .create(&target, &object, false)
        .await
        .map_err(|e| target.context("create", &prefix, e))?;

    info!(
        "Submitted workflow {} in namespace {}",
        created.metadata.name.as_deref().unwrap_or(&prefix),
        namespace
    );
    Ok(created)
}
