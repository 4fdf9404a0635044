//! Declared resources read from a package directory

use std::path::{Path, PathBuf};

use argopack_core::codec::sanitize_name;
use argopack_core::package::PackageDescriptor;
use argopack_core::provenance::{
    PROVENANCE_LABEL_KEYS, Provenance, annotations_for_package, is_provenance_annotation,
    labels_for_package,
};
use kube::api::DynamicObject;
use serde_json::{Value, json};

use crate::error::{KubeError, Result};
use crate::kind::{Category, ResourceKind, ResourceScope};
use crate::options::InstallOptions;

/// A resource manifest ready to be sent to the cluster
#[derive(Debug, Clone)]
pub struct ManagedResource {
    /// Kind the object is installed as
    pub kind: ResourceKind,
    pub object: DynamicObject,
    /// File the manifest was read from
    pub path: PathBuf,
}

impl ManagedResource {
    /// Parse a manifest file of a category directory
    ///
    /// Returns `Ok(None)` for an empty document. The object's `apiVersion`
    /// and `kind` are set to the kind installed for the category, which
    /// promotes WorkflowTemplates at cluster scope.
    pub fn parse(path: &Path, content: &str, category: Category, cluster: bool) -> Result<Option<Self>> {
        let parse_error = |message: String| KubeError::ManifestParse {
            path: path.display().to_string(),
            message,
        };

        let mut value: Value = serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
        if value.is_null() {
            return Ok(None);
        }

        let kind = category.kind(cluster);
        let Some(map) = value.as_object_mut() else {
            return Err(parse_error("expected a mapping at the document root".to_string()));
        };

        if let Some(declared) = map.get("kind").and_then(Value::as_str) {
            let base = category.base_kind();
            if declared != base.as_str() && declared != kind.as_str() {
                return Err(KubeError::InvalidManifest(format!(
                    "{}: {} found in {}/, expected {}",
                    path.display(),
                    declared,
                    category,
                    base
                )));
            }
        }

        map.insert("apiVersion".to_string(), json!(kind.api_version()));
        map.insert("kind".to_string(), json!(kind.as_str()));
        if !map.get("metadata").is_some_and(Value::is_object) {
            map.insert("metadata".to_string(), json!({}));
        }

        let object: DynamicObject =
            serde_json::from_value(value).map_err(|e| parse_error(e.to_string()))?;

        Ok(Some(Self {
            kind,
            object,
            path: path.to_path_buf(),
        }))
    }

    /// `metadata.name`, empty until [`decorate`](Self::decorate) assigns a default
    pub fn name(&self) -> &str {
        self.object.metadata.name.as_deref().unwrap_or_default()
    }

    /// Stamp provenance and apply kind-specific rewrites
    ///
    /// Author-declared labels and annotations survive, except the
    /// installer-owned provenance keys which are always overwritten.
    pub fn decorate(
        &mut self,
        package: &PackageDescriptor,
        provenance: &Provenance,
        category: Category,
        options: &InstallOptions,
    ) {
        if self.name().is_empty() {
            self.object.metadata.name = Some(default_name(&package.name, &self.path));
        }

        self.object.metadata.namespace = match self.kind.scope() {
            ResourceScope::Namespaced => Some(options.namespace.clone()),
            ResourceScope::Cluster => None,
        };

        let labels = self.object.metadata.labels.get_or_insert_with(Default::default);
        for (key, value) in labels_for_package(package, provenance) {
            if PROVENANCE_LABEL_KEYS.contains(&key.as_str()) || !labels.contains_key(&key) {
                labels.insert(key, value);
            }
        }

        let annotations = self
            .object
            .metadata
            .annotations
            .get_or_insert_with(Default::default);
        for (key, value) in annotations_for_package(package, provenance) {
            if is_provenance_annotation(&key) || !annotations.contains_key(&key) {
                annotations.insert(key, value);
            }
        }

        if self.kind == ResourceKind::CronWorkflow {
            self.apply_cron_overrides(
                options.cron_schedule.as_deref(),
                options.time_zone.as_deref(),
            );
        }

        if options.cluster && category.rewrites_for_cluster() {
            self.kind.apply_cluster_scope(&mut self.object.data);
        }

        let labels = self.object.metadata.labels.clone().unwrap_or_default();
        self.kind.copy_pod_labels(&mut self.object.data, &labels);
    }

    fn apply_cron_overrides(&mut self, schedule: Option<&str>, time_zone: Option<&str>) {
        if schedule.is_none() && time_zone.is_none() {
            return;
        }

        let Some(spec) = self.object.data.as_object_mut().map(|data| {
            data.entry("spec".to_string())
                .or_insert_with(|| json!({}))
        }) else {
            return;
        };
        let Some(spec) = spec.as_object_mut() else {
            return;
        };

        if let Some(schedule) = schedule {
            spec.insert("schedule".to_string(), json!(schedule));
        }
        if let Some(time_zone) = time_zone {
            spec.insert("timezone".to_string(), json!(time_zone));
        }
    }

    /// Object body for a patch, pinned to the live object's resourceVersion
    pub fn patch_body(&self, resource_version: Option<&str>) -> DynamicObject {
        let mut object = self.object.clone();
        object.metadata.resource_version = resource_version.map(str::to_string);
        object
    }

    /// Object body for a dry-run create next to the live object
    ///
    /// The name becomes a `generateName` prefix so the server validates
    /// the new body without an AlreadyExists conflict.
    pub fn validation_body(&self) -> DynamicObject {
        let mut object = self.object.clone();
        object.metadata.generate_name = object.metadata.name.take().map(|name| format!("{}-", name));
        object
    }
}

/// `<package>-<folder>-<file stem>`, as a valid object name
fn default_name(package_name: &str, path: &Path) -> String {
    let folder = path
        .parent()
        .and_then(Path::file_name)
        .map(|f| f.to_string_lossy().into_owned());
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned());

    let name = match (folder, stem) {
        (Some(folder), Some(stem)) => format!("{}-{}-{}", package_name, folder, stem),
        _ => package_name.to_string(),
    };
    name_fragment(&name)
}

/// Lowercase, with every character outside `[a-z0-9.-]` replaced by `-`
fn name_fragment(value: &str) -> String {
    sanitize_name(value)
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '.' | '-') => c,
            _ => '-',
        })
        .collect::<String>()
        .trim_matches(|c| c == '-' || c == '.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use argopack_core::provenance::keys;

    fn package() -> PackageDescriptor {
        PackageDescriptor::from_json(
            r#"{
                "name": "@atlan/demo",
                "version": "1.0.0",
                "config": {"labels": {"team": "data"}, "annotations": {"owner": "ops"}}
            }"#,
        )
        .unwrap()
    }

    fn decorate(yaml: &str, category: Category, options: &InstallOptions) -> ManagedResource {
        let pkg = package();
        let prov = Provenance::new(&pkg, "@atlan/demo@1.0.0", "local");
        let path = PathBuf::from(format!("/pkg/{}/main.yaml", category.dir_name()));
        let mut res = ManagedResource::parse(&path, yaml, category, options.cluster)
            .unwrap()
            .unwrap();
        res.decorate(&pkg, &prov, category, options);
        res
    }

    #[test]
    fn test_empty_document() {
        let res = ManagedResource::parse(Path::new("x.yaml"), "", Category::ConfigMaps, false);
        assert!(res.unwrap().is_none());
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = ManagedResource::parse(
            Path::new("configmaps/bad.yaml"),
            "kind: [unclosed",
            Category::ConfigMaps,
            false,
        )
        .unwrap_err();
        assert!(matches!(&err, KubeError::ManifestParse { path, .. } if path == "configmaps/bad.yaml"));
    }

    #[test]
    fn test_rejects_foreign_kind() {
        let err = ManagedResource::parse(
            Path::new("configmaps/secret.yaml"),
            "apiVersion: v1\nkind: Secret\nmetadata:\n  name: s\n",
            Category::ConfigMaps,
            false,
        );
        assert!(matches!(err, Err(KubeError::InvalidManifest(_))));
    }

    #[test]
    fn test_default_name_and_labels() {
        let res = decorate(
            "apiVersion: v1\nkind: ConfigMap\ndata:\n  key: value\n",
            Category::ConfigMaps,
            &InstallOptions::new("argo"),
        );

        assert_eq!(res.name(), "atlan-demo-configmaps-main");
        assert_eq!(res.object.metadata.namespace.as_deref(), Some("argo"));
        let labels = res.object.metadata.labels.as_ref().unwrap();
        assert_eq!(labels[keys::INSTALLER], "argopm");
        assert_eq!(labels[keys::VERSION], "1.0.0");
        assert_eq!(labels["team"], "data");
        assert_eq!(res.object.data["data"]["key"], "value");
    }

    #[test]
    fn test_default_name_is_a_valid_object_name() {
        assert_eq!(
            default_name("@atlan/demo", Path::new("/pkg/configmaps/My_Config.yaml")),
            "atlan-demo-configmaps-my-config"
        );
        assert_eq!(
            default_name("demo", Path::new("/pkg/templates/v1 Main.yml")),
            "demo-templates-v1-main"
        );
    }

    #[test]
    fn test_validation_body_uses_generated_name() {
        let res = decorate(
            "kind: ConfigMap\nmetadata: {name: cfg}\n",
            Category::ConfigMaps,
            &InstallOptions::default(),
        );
        let body = res.validation_body();
        assert!(body.metadata.name.is_none());
        assert_eq!(body.metadata.generate_name.as_deref(), Some("cfg-"));
        assert_eq!(res.name(), "cfg");
    }

    #[test]
    fn test_author_labels_survive_but_provenance_wins() {
        let res = decorate(
            r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: cfg
  labels:
    team: platform
    argopm.atlan.com/version: "0.0.1"
  annotations:
    owner: me
    argopm.atlan.com/name: spoofed
"#,
            Category::ConfigMaps,
            &InstallOptions::default(),
        );

        let labels = res.object.metadata.labels.as_ref().unwrap();
        assert_eq!(labels["team"], "platform");
        assert_eq!(labels[keys::VERSION], "1.0.0");

        let annotations = res.object.metadata.annotations.as_ref().unwrap();
        assert_eq!(annotations["owner"], "me");
        assert_eq!(annotations[keys::NAME], "@atlan/demo");
    }

    #[test]
    fn test_cluster_template_is_promoted_and_rewritten() {
        let res = decorate(
            r#"
apiVersion: argoproj.io/v1alpha1
kind: WorkflowTemplate
metadata:
  name: wf
  namespace: somewhere
spec:
  templates:
    - name: main
      dag:
        tasks:
          - name: call
            templateRef: {name: lib, template: x}
"#,
            Category::Templates,
            &InstallOptions::default().cluster(),
        );

        assert_eq!(res.kind, ResourceKind::ClusterWorkflowTemplate);
        assert_eq!(
            res.object.types.as_ref().unwrap().kind,
            "ClusterWorkflowTemplate"
        );
        assert!(res.object.metadata.namespace.is_none());
        assert_eq!(
            res.object.data["spec"]["templates"][0]["dag"]["tasks"][0]["templateRef"]["clusterScope"],
            true
        );
        assert_eq!(
            res.object.data["spec"]["podMetadata"]["labels"][keys::NAME],
            "a-t-ratlans-l-a-s-hdemo"
        );
    }

    #[test]
    fn test_namespaced_install_leaves_refs_alone() {
        let res = decorate(
            r#"
kind: WorkflowTemplate
metadata: {name: wf}
spec:
  templates:
    - name: main
      dag:
        tasks:
          - name: call
            templateRef: {name: lib, template: x}
"#,
            Category::Templates,
            &InstallOptions::default(),
        );

        assert_eq!(res.kind, ResourceKind::WorkflowTemplate);
        assert!(
            res.object.data["spec"]["templates"][0]["dag"]["tasks"][0]["templateRef"]
                .get("clusterScope")
                .is_none()
        );
    }

    #[test]
    fn test_cron_overrides() {
        let res = decorate(
            r#"
kind: CronWorkflow
metadata: {name: nightly}
spec:
  schedule: "0 0 * * *"
  workflowSpec:
    workflowTemplateRef: {name: wf}
"#,
            Category::CronWorkflows,
            &InstallOptions::default()
                .cluster()
                .with_cron_schedule("*/5 * * * *")
                .with_time_zone("Asia/Kolkata"),
        );

        assert_eq!(res.kind, ResourceKind::CronWorkflow);
        assert_eq!(res.object.metadata.namespace.as_deref(), Some("default"));
        let spec = &res.object.data["spec"];
        assert_eq!(spec["schedule"], "*/5 * * * *");
        assert_eq!(spec["timezone"], "Asia/Kolkata");
        assert_eq!(spec["workflowSpec"]["workflowTemplateRef"]["clusterScope"], true);
    }

    #[test]
    fn test_patch_body_carries_resource_version() {
        let res = decorate(
            "kind: ConfigMap\nmetadata: {name: cfg}\n",
            Category::ConfigMaps,
            &InstallOptions::default(),
        );
        let body = res.patch_body(Some("42"));
        assert_eq!(body.metadata.resource_version.as_deref(), Some("42"));
        assert!(res.object.metadata.resource_version.is_none());
    }
}
