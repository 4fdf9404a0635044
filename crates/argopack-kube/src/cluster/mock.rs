//! In-memory cluster for testing
//!
//! Stores objects per kind and namespace, records every call, and can be
//! told to fail specific calls. Dry-run calls are validated and recorded
//! but never change the store.

use async_trait::async_trait;
use kube::api::DynamicObject;
use kube::core::ErrorResponse;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ApiTarget, ClusterApi};
use crate::error::{KubeError, Result};
use crate::kind::{PatchKind, ResourceKind, ResourceScope};

type StoreKey = (ResourceKind, Option<String>);
type Store = HashMap<StoreKey, BTreeMap<String, DynamicObject>>;

/// API verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    List,
    Get,
    Create,
    Patch,
    Delete,
}

/// One call made against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub verb: Verb,
    pub kind: ResourceKind,
    pub namespace: Option<String>,
    /// Object name, or the selector for lists
    pub name: String,
    pub dry_run: bool,
    pub patch: Option<PatchKind>,
}

/// A failure to return for matching calls
#[derive(Debug, Clone)]
pub struct InjectedFailure {
    pub verb: Verb,
    /// Only fail calls for this object name
    pub name: Option<String>,
    pub code: u16,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub lists: usize,
    pub gets: usize,
    pub creates: usize,
    pub patches: usize,
    pub deletes: usize,
}

/// In-memory [`ClusterApi`]
#[derive(Clone, Default)]
pub struct MockCluster {
    store: Arc<RwLock<Store>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    failures: Arc<RwLock<Vec<InjectedFailure>>>,
    revision: Arc<AtomicU64>,
}

impl MockCluster {
    /// Create a new empty cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_object(self, kind: ResourceKind, object: DynamicObject) -> Self {
        self.insert(kind, object);
        self
    }

    /// Seed an object without recording a call
    pub fn insert(&self, kind: ResourceKind, mut object: DynamicObject) {
        let namespace = match kind.scope() {
            ResourceScope::Namespaced => object.metadata.namespace.clone(),
            ResourceScope::Cluster => None,
        };
        let name = object.metadata.name.clone().unwrap_or_default();
        object.metadata.resource_version = Some(self.next_revision());

        self.store_mut()
            .entry((kind, namespace))
            .or_default()
            .insert(name, object);
    }

    /// Make calls with this verb (and optionally this name) fail with an HTTP status
    pub fn fail_on(&self, verb: Verb, name: Option<&str>, code: u16) {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(InjectedFailure {
                verb,
                name: name.map(str::to_string),
                code,
            });
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Create, patch and delete calls, in order
    pub fn mutations(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c.verb, Verb::Create | Verb::Patch | Verb::Delete))
            .collect()
    }

    /// Forget recorded calls
    pub fn reset_calls(&self) {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        let mut counts = OperationCounts::default();
        for call in self.calls() {
            match call.verb {
                Verb::List => counts.lists += 1,
                Verb::Get => counts.gets += 1,
                Verb::Create => counts.creates += 1,
                Verb::Patch => counts.patches += 1,
                Verb::Delete => counts.deletes += 1,
            }
        }
        counts
    }

    /// Look up a stored object
    pub fn object(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<DynamicObject> {
        self.store()
            .get(&(kind, namespace.map(str::to_string)))
            .and_then(|objects| objects.get(name))
            .cloned()
    }

    /// All stored objects of a kind, across namespaces
    pub fn objects(&self, kind: ResourceKind) -> Vec<DynamicObject> {
        self.store()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .flat_map(|(_, objects)| objects.values().cloned())
            .collect()
    }

    /// Count of stored objects of every kind
    pub fn object_count(&self) -> usize {
        self.store().values().map(BTreeMap::len).sum()
    }

    fn store(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_mut(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_revision(&self) -> String {
        (self.revision.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn record(
        &self,
        verb: Verb,
        target: &ApiTarget,
        name: &str,
        dry_run: bool,
        patch: Option<PatchKind>,
    ) -> Result<()> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                verb,
                kind: target.kind,
                namespace: target.namespace.clone(),
                name: name.to_string(),
                dry_run,
                patch,
            });

        let failure = self
            .failures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|f| f.verb == verb && f.name.as_deref().is_none_or(|n| n == name))
            .cloned();

        match failure {
            Some(f) => Err(api_error(
                f.code,
                "Injected",
                format!("injected failure for {:?} {}", verb, name),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn list(&self, target: &ApiTarget, selector: &str) -> Result<Vec<DynamicObject>> {
        self.record(Verb::List, target, selector, false, None)?;

        let store = self.store();
        let items = store
            .iter()
            .filter(|((kind, ns), _)| {
                *kind == target.kind
                    && (target.namespace.is_none() || target.namespace == *ns)
            })
            .flat_map(|(_, objects)| objects.values())
            .filter(|obj| matches_selector(obj, selector))
            .cloned()
            .collect();

        Ok(items)
    }

    async fn get(&self, target: &ApiTarget, name: &str) -> Result<Option<DynamicObject>> {
        self.record(Verb::Get, target, name, false, None)?;
        Ok(self.object(target.kind, target.namespace.as_deref(), name))
    }

    async fn create(
        &self,
        target: &ApiTarget,
        object: &DynamicObject,
        dry_run: bool,
    ) -> Result<DynamicObject> {
        let mut object = object.clone();
        if object.metadata.name.is_none() {
            if let Some(prefix) = &object.metadata.generate_name {
                let suffix = self.revision.load(Ordering::SeqCst) + 1;
                object.metadata.name = Some(format!("{}{:05}", prefix, suffix));
            }
        }
        let name = object.metadata.name.clone().ok_or_else(|| {
            api_error(422, "Invalid", "name or generateName is required".to_string())
        })?;

        self.record(Verb::Create, target, &name, dry_run, None)?;

        let key = (target.kind, target.namespace.clone());
        let mut store = self.store_mut();
        if store.get(&key).is_some_and(|objects| objects.contains_key(&name)) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("{} \"{}\" already exists", target.kind.plural(), name),
            ));
        }

        object.metadata.namespace = target.namespace.clone();
        if dry_run {
            return Ok(object);
        }

        object.metadata.resource_version = Some(self.next_revision());
        store.entry(key).or_default().insert(name, object.clone());
        Ok(object)
    }

    async fn patch(
        &self,
        target: &ApiTarget,
        name: &str,
        object: &DynamicObject,
        patch: PatchKind,
        dry_run: bool,
    ) -> Result<DynamicObject> {
        self.record(Verb::Patch, target, name, dry_run, Some(patch))?;

        let key = (target.kind, target.namespace.clone());
        let mut store = self.store_mut();
        let Some(current) = store.get(&key).and_then(|objects| objects.get(name)) else {
            return Err(not_found(target, name));
        };

        if let Some(expected) = &object.metadata.resource_version {
            if current.metadata.resource_version.as_ref() != Some(expected) {
                return Err(api_error(
                    409,
                    "Conflict",
                    format!(
                        "Operation cannot be fulfilled on {} \"{}\": the object has been modified",
                        target.kind.plural(),
                        name
                    ),
                ));
            }
        }

        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, serde_json::to_value(object)?);
        let mut merged: DynamicObject = serde_json::from_value(merged)?;
        if dry_run {
            return Ok(merged);
        }

        merged.metadata.resource_version = Some(self.next_revision());
        store
            .entry(key)
            .or_default()
            .insert(name.to_string(), merged.clone());
        Ok(merged)
    }

    async fn delete(&self, target: &ApiTarget, name: &str, dry_run: bool) -> Result<()> {
        self.record(Verb::Delete, target, name, dry_run, None)?;

        let key = (target.kind, target.namespace.clone());
        let mut store = self.store_mut();
        let exists = store
            .get(&key)
            .is_some_and(|objects| objects.contains_key(name));
        if !exists {
            return Err(not_found(target, name));
        }

        if !dry_run {
            if let Some(objects) = store.get_mut(&key) {
                objects.remove(name);
            }
        }
        Ok(())
    }
}

fn api_error(code: u16, reason: &str, message: String) -> KubeError {
    KubeError::Api(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    }))
}

fn not_found(target: &ApiTarget, name: &str) -> KubeError {
    api_error(
        404,
        "NotFound",
        format!("{} \"{}\" not found", target.kind.plural(), name),
    )
}

/// Equality-based selector (`k=v`, `k==v`, `k!=v`, comma separated)
fn matches_selector(object: &DynamicObject, selector: &str) -> bool {
    let empty = BTreeMap::new();
    let labels = object.metadata.labels.as_ref().unwrap_or(&empty);

    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| {
            if let Some((key, value)) = term.split_once("!=") {
                labels.get(key.trim()).map(String::as_str) != Some(value.trim())
            } else if let Some((key, value)) = term.split_once('=') {
                let value = value.trim_start_matches('=').trim();
                labels.get(key.trim()).map(String::as_str) == Some(value)
            } else {
                labels.contains_key(term)
            }
        })
}

/// JSON merge patch (RFC 7386)
fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(&key);
                } else {
                    merge_json(target.entry(key).or_insert(Value::Null), value);
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;
    use serde_json::json;

    fn config_map(name: &str, labels: &[(&str, &str)]) -> DynamicObject {
        DynamicObject {
            types: None,
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                ..Default::default()
            },
            data: json!({"data": {"key": "v1"}}),
        }
    }

    fn target() -> ApiTarget {
        ApiTarget::new(ResourceKind::ConfigMap, "default")
    }

    #[tokio::test]
    async fn test_create_and_list_by_selector() {
        let cluster = MockCluster::new();
        cluster
            .create(&target(), &config_map("a", &[("app", "x")]), false)
            .await
            .unwrap();
        cluster
            .create(&target(), &config_map("b", &[("app", "y")]), false)
            .await
            .unwrap();

        let found = cluster.list(&target(), "app=x").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].metadata.name.as_deref(), Some("a"));

        let counts = cluster.operation_counts();
        assert_eq!(counts.creates, 2);
        assert_eq!(counts.lists, 1);
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let cluster = MockCluster::new().with_object(ResourceKind::ConfigMap, config_map("a", &[]));
        let err = cluster
            .create(&target(), &config_map("a", &[]), false)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_mutate() {
        let cluster = MockCluster::new().with_object(ResourceKind::ConfigMap, config_map("a", &[]));

        cluster
            .create(&target(), &config_map("b", &[]), true)
            .await
            .unwrap();
        cluster.delete(&target(), "a", true).await.unwrap();

        assert_eq!(cluster.object_count(), 1);
        assert!(cluster.object(ResourceKind::ConfigMap, Some("default"), "a").is_some());
        assert!(cluster.mutations().iter().all(|c| c.dry_run));
    }

    #[tokio::test]
    async fn test_patch_merges_and_checks_resource_version() {
        let cluster = MockCluster::new().with_object(ResourceKind::ConfigMap, config_map("a", &[]));
        let current = cluster
            .object(ResourceKind::ConfigMap, Some("default"), "a")
            .unwrap();

        let mut body = config_map("a", &[("app", "x")]);
        body.data = json!({"data": {"key": "v2"}});
        body.metadata.resource_version = current.metadata.resource_version.clone();

        let patched = cluster
            .patch(&target(), "a", &body, PatchKind::Strategic, false)
            .await
            .unwrap();
        assert_eq!(patched.data["data"]["key"], "v2");
        assert_eq!(patched.metadata.labels.unwrap()["app"], "x");

        let err = cluster
            .patch(&target(), "a", &body, PatchKind::Strategic, false)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let cluster = MockCluster::new();
        let err = cluster.delete(&target(), "ghost", false).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_generate_name() {
        let cluster = MockCluster::new();
        let mut workflow = config_map("unused", &[]);
        workflow.metadata.name = None;
        workflow.metadata.generate_name = Some("demo-".to_string());

        let created = cluster
            .create(&ApiTarget::new(ResourceKind::Workflow, "default"), &workflow, false)
            .await
            .unwrap();
        assert!(created.metadata.name.unwrap().starts_with("demo-"));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let cluster = MockCluster::new();
        cluster.fail_on(Verb::Create, Some("bad"), 403);

        cluster
            .create(&target(), &config_map("good", &[]), false)
            .await
            .unwrap();
        let err = cluster
            .create(&target(), &config_map("bad", &[]), false)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(403));
    }

    #[test]
    fn test_selector_forms() {
        let obj = config_map("a", &[("app", "x"), ("tier", "db")]);
        assert!(matches_selector(&obj, ""));
        assert!(matches_selector(&obj, "app=x,tier==db"));
        assert!(matches_selector(&obj, "app!=y"));
        assert!(matches_selector(&obj, "tier"));
        assert!(!matches_selector(&obj, "app=x,tier=web"));
    }

    #[test]
    fn test_merge_json_removes_nulls() {
        let mut target = json!({"a": 1, "b": {"c": 2, "d": 3}});
        merge_json(&mut target, json!({"b": {"c": null, "e": 4}, "f": 5}));
        assert_eq!(target, json!({"a": 1, "b": {"d": 3, "e": 4}, "f": 5}));
    }
}
