//! `kube`-backed cluster API

use async_trait::async_trait;
use kube::{
    Client,
    api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams},
};

use super::{ApiTarget, ClusterApi};
use crate::error::Result;
use crate::kind::PatchKind;

/// Cluster API over a live Kubernetes connection
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    /// Connect using the local kubeconfig or in-cluster configuration
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the underlying Kubernetes client
    pub fn kube_client(&self) -> &Client {
        &self.client
    }

    fn api(&self, target: &ApiTarget) -> Api<DynamicObject> {
        let resource = target.kind.api_resource();
        match &target.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list(&self, target: &ApiTarget, selector: &str) -> Result<Vec<DynamicObject>> {
        let params = ListParams::default().labels(selector);
        let list = self.api(target).list(&params).await?;
        Ok(list.items)
    }

    async fn get(&self, target: &ApiTarget, name: &str) -> Result<Option<DynamicObject>> {
        Ok(self.api(target).get_opt(name).await?)
    }

    async fn create(
        &self,
        target: &ApiTarget,
        object: &DynamicObject,
        dry_run: bool,
    ) -> Result<DynamicObject> {
        let params = PostParams {
            dry_run,
            ..Default::default()
        };
        Ok(self.api(target).create(&params, object).await?)
    }

    async fn patch(
        &self,
        target: &ApiTarget,
        name: &str,
        object: &DynamicObject,
        patch: PatchKind,
        dry_run: bool,
    ) -> Result<DynamicObject> {
        let params = PatchParams {
            dry_run,
            ..Default::default()
        };
        let patch = match patch {
            PatchKind::Strategic => Patch::Strategic(object),
            PatchKind::Merge => Patch::Merge(object),
        };
        Ok(self.api(target).patch(name, &params, &patch).await?)
    }

    async fn delete(&self, target: &ApiTarget, name: &str, dry_run: bool) -> Result<()> {
        let params = DeleteParams {
            propagation_policy: Some(kube::api::PropagationPolicy::Background),
            dry_run,
            ..Default::default()
        };
        self.api(target).delete(name, &params).await?;
        Ok(())
    }
}
