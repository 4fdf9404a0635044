//! Resource kind table
//!
//! Every kind argopack manages is a row here: REST plural, API group and
//! version, scope, update policy, patch flavour, plus the spec rewrites a
//! kind needs during installation. Adding a managed kind means adding a
//! variant, not touching the executor.

use std::collections::BTreeMap;
use std::fmt;

use argopack_core::provenance::POD_LABEL_KEYS;
use kube::api::ApiResource;
use kube::core::GroupVersionKind;
use serde_json::{Map, Value};

/// Argo Workflows API group
pub const WORKFLOW_GROUP: &str = "argoproj.io";
/// Argo Dataflow API group
pub const DATAFLOW_GROUP: &str = "dataflow.argoproj.io";
/// Version shared by every Argo custom resource
pub const ARGO_VERSION: &str = "v1alpha1";

/// Whether instances live inside a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceScope {
    Namespaced,
    Cluster,
}

/// How an outdated object is brought to the new version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Patch in place
    Patch,
    /// Delete, then create; the controller cannot replace the spec in place
    Recreate,
}

/// Patch content type used for in-place updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    /// `application/strategic-merge-patch+json` (core API objects)
    Strategic,
    /// `application/merge-patch+json` (custom resources)
    Merge,
}

/// A kind of object argopack installs or submits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    ConfigMap,
    Secret,
    WorkflowTemplate,
    ClusterWorkflowTemplate,
    CronWorkflow,
    Pipeline,
    Workflow,
}

impl ResourceKind {
    /// Kubernetes `kind` string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
            Self::WorkflowTemplate => "WorkflowTemplate",
            Self::ClusterWorkflowTemplate => "ClusterWorkflowTemplate",
            Self::CronWorkflow => "CronWorkflow",
            Self::Pipeline => "Pipeline",
            Self::Workflow => "Workflow",
        }
    }

    /// Look up a kind by its `kind` string
    pub fn from_kind(kind: &str) -> Option<Self> {
        [
            Self::ConfigMap,
            Self::Secret,
            Self::WorkflowTemplate,
            Self::ClusterWorkflowTemplate,
            Self::CronWorkflow,
            Self::Pipeline,
            Self::Workflow,
        ]
        .into_iter()
        .find(|k| k.as_str() == kind)
    }

    /// REST plural: kind lowercased plus `s`
    pub fn plural(&self) -> String {
        format!("{}s", self.as_str().to_lowercase())
    }

    pub fn group(&self) -> &'static str {
        match self {
            Self::ConfigMap | Self::Secret => "",
            Self::Pipeline => DATAFLOW_GROUP,
            _ => WORKFLOW_GROUP,
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            Self::ConfigMap | Self::Secret => "v1",
            _ => ARGO_VERSION,
        }
    }

    /// `apiVersion` string (`v1` or `group/version`)
    pub fn api_version(&self) -> String {
        match self.group() {
            "" => self.version().to_string(),
            group => format!("{}/{}", group, self.version()),
        }
    }

    pub fn scope(&self) -> ResourceScope {
        match self {
            Self::ClusterWorkflowTemplate => ResourceScope::Cluster,
            _ => ResourceScope::Namespaced,
        }
    }

    pub fn update_policy(&self) -> UpdatePolicy {
        match self {
            Self::Pipeline => UpdatePolicy::Recreate,
            _ => UpdatePolicy::Patch,
        }
    }

    pub fn patch_kind(&self) -> PatchKind {
        match self {
            Self::ConfigMap | Self::Secret => PatchKind::Strategic,
            _ => PatchKind::Merge,
        }
    }

    /// Kind actually installed; only WorkflowTemplate is promoted at cluster scope
    pub fn for_install(self, cluster: bool) -> Self {
        match self {
            Self::WorkflowTemplate if cluster => Self::ClusterWorkflowTemplate,
            other => other,
        }
    }

    /// Dynamic API resource descriptor for the kube client
    pub fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(self.group(), self.version(), self.as_str());
        ApiResource::from_gvk_with_plural(&gvk, &self.plural())
    }

    /// Mark template references as cluster scoped
    ///
    /// `data` is the object body without metadata (the `spec` lives under
    /// `data["spec"]`). Only template-bearing kinds are touched.
    pub fn apply_cluster_scope(&self, data: &mut Value) {
        match self {
            Self::WorkflowTemplate | Self::ClusterWorkflowTemplate => {
                if let Some(spec) = data.get_mut("spec") {
                    mark_template_refs(spec);
                }
            }
            Self::CronWorkflow => {
                if let Some(workflow_spec) = data.pointer_mut("/spec/workflowSpec") {
                    if let Some(reference) = workflow_spec
                        .get_mut("workflowTemplateRef")
                        .and_then(Value::as_object_mut)
                    {
                        reference.insert("clusterScope".to_string(), Value::Bool(true));
                    }
                    mark_template_refs(workflow_spec);
                }
            }
            _ => {}
        }
    }

    /// Copy package identity labels onto the pod metadata of workflow-bearing kinds
    pub fn copy_pod_labels(&self, data: &mut Value, labels: &BTreeMap<String, String>) {
        let pointer = match self {
            Self::WorkflowTemplate | Self::ClusterWorkflowTemplate => "/spec",
            Self::CronWorkflow => "/spec/workflowSpec",
            _ => return,
        };

        let Some(spec) = data.pointer_mut(pointer).and_then(Value::as_object_mut) else {
            return;
        };

        let pod_labels = object_entry(object_entry(spec, "podMetadata"), "labels");
        for key in POD_LABEL_KEYS {
            if let Some(value) = labels.get(key) {
                pod_labels.insert(key.to_string(), Value::String(value.clone()));
            }
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set `templateRef.clusterScope` on every DAG task and step of a workflow spec
fn mark_template_refs(spec: &mut Value) {
    let Some(templates) = spec.get_mut("templates").and_then(Value::as_array_mut) else {
        return;
    };

    for template in templates {
        if let Some(tasks) = template
            .pointer_mut("/dag/tasks")
            .and_then(Value::as_array_mut)
        {
            tasks.iter_mut().for_each(mark_reference);
        }

        if let Some(groups) = template.get_mut("steps").and_then(Value::as_array_mut) {
            for group in groups {
                match group {
                    Value::Array(steps) => steps.iter_mut().for_each(mark_reference),
                    step => mark_reference(step),
                }
            }
        }
    }
}

fn mark_reference(task: &mut Value) {
    if let Some(reference) = task.get_mut("templateRef").and_then(Value::as_object_mut) {
        reference.insert("clusterScope".to_string(), Value::Bool(true));
    }
}

/// Get or create a nested object, replacing non-object values
fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(inner) => inner,
        _ => unreachable!("entry was just made an object"),
    }
}

/// A resource directory inside a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    ConfigMaps,
    Secrets,
    Pipelines,
    Templates,
    CronWorkflows,
}

impl Category {
    /// All categories, in the order they are reported
    pub const ALL: [Category; 5] = [
        Category::ConfigMaps,
        Category::Secrets,
        Category::Pipelines,
        Category::Templates,
        Category::CronWorkflows,
    ];

    /// Directory name inside the package
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::ConfigMaps => "configmaps",
            Self::Secrets => "secrets",
            Self::Pipelines => "pipelines",
            Self::Templates => "templates",
            Self::CronWorkflows => "cronworkflows",
        }
    }

    /// Kind declared by files in this directory
    pub fn base_kind(&self) -> ResourceKind {
        match self {
            Self::ConfigMaps => ResourceKind::ConfigMap,
            Self::Secrets => ResourceKind::Secret,
            Self::Pipelines => ResourceKind::Pipeline,
            Self::Templates => ResourceKind::WorkflowTemplate,
            Self::CronWorkflows => ResourceKind::CronWorkflow,
        }
    }

    /// Kind installed for this directory
    pub fn kind(&self, cluster: bool) -> ResourceKind {
        self.base_kind().for_install(cluster)
    }

    /// Whether a cluster install rewrites template references in this category
    pub fn rewrites_for_cluster(&self) -> bool {
        matches!(self, Self::Templates | Self::CronWorkflows)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.dir_name() == s)
            .ok_or_else(|| format!("unknown resource category '{}'", s))
    }
}
