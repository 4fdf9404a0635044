//! Cluster API capability
//!
//! The reconciler never builds its own Kubernetes client. Everything it
//! needs from the cluster goes through [`ClusterApi`], which is implemented
//! by [`KubeClusterApi`] over a real `kube::Client` and by [`MockCluster`]
//! in memory for tests.

mod client;
mod mock;

pub use client::KubeClusterApi;
pub use mock::{InjectedFailure, MockCluster, OperationCounts, RecordedCall, Verb};

use std::fmt;

use async_trait::async_trait;
use kube::api::DynamicObject;

use crate::error::{KubeError, Result};
use crate::kind::{PatchKind, ResourceKind, ResourceScope};

/// Where a call is addressed: a kind, and a namespace for namespaced kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiTarget {
    pub kind: ResourceKind,
    /// `None` for cluster-scoped kinds, or for listing across all namespaces
    pub namespace: Option<String>,
}

impl ApiTarget {
    /// Target a kind, dropping the namespace when the kind is cluster scoped
    pub fn new(kind: ResourceKind, namespace: &str) -> Self {
        let namespace = match kind.scope() {
            ResourceScope::Namespaced => Some(namespace.to_string()),
            ResourceScope::Cluster => None,
        };
        Self { kind, namespace }
    }

    /// Target every namespace (list only)
    pub fn all_namespaces(kind: ResourceKind) -> Self {
        Self {
            kind,
            namespace: None,
        }
    }

    /// Human readable scope, used in error context
    pub fn scope(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("namespace '{}'", ns),
            None => "cluster".to_string(),
        }
    }

    /// Wrap an error with the verb and object it concerns
    pub(crate) fn context(&self, verb: &'static str, name: &str, source: KubeError) -> KubeError {
        KubeError::Operation {
            verb,
            kind: self.kind.to_string(),
            name: name.to_string(),
            scope: self.scope(),
            source: Box::new(source),
        }
    }
}

impl fmt::Display for ApiTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.kind, self.scope())
    }
}

/// Operations the reconciler needs from a cluster
///
/// Implementations must be Send + Sync for use across async tasks. Every
/// mutating call takes a `dry_run` flag that is passed to the API server.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List objects matching a label selector
    async fn list(&self, target: &ApiTarget, selector: &str) -> Result<Vec<DynamicObject>>;

    /// Get an object by name, `None` if absent
    async fn get(&self, target: &ApiTarget, name: &str) -> Result<Option<DynamicObject>>;

    /// Create an object
    async fn create(
        &self,
        target: &ApiTarget,
        object: &DynamicObject,
        dry_run: bool,
    ) -> Result<DynamicObject>;

    /// Patch an existing object
    async fn patch(
        &self,
        target: &ApiTarget,
        name: &str,
        object: &DynamicObject,
        patch: PatchKind,
        dry_run: bool,
    ) -> Result<DynamicObject>;

    /// Delete an object
    async fn delete(&self, target: &ApiTarget, name: &str, dry_run: bool) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_scope() {
        let ns = ApiTarget::new(ResourceKind::ConfigMap, "argo");
        assert_eq!(ns.namespace.as_deref(), Some("argo"));
        assert_eq!(ns.to_string(), "ConfigMap in namespace 'argo'");

        let cluster = ApiTarget::new(ResourceKind::ClusterWorkflowTemplate, "argo");
        assert!(cluster.namespace.is_none());
        assert_eq!(cluster.scope(), "cluster");
    }
}
