//! CLI commands

use std::sync::Arc;

use argopack_kube::{ClusterApi, KubeClusterApi};

use crate::error::{CliError, Result};

pub mod info;
pub mod install;
pub mod list;
pub mod run;
pub mod uninstall;

/// Connect to the cluster from the local kubeconfig or in-cluster config
pub(crate) async fn connect() -> Result<Arc<dyn ClusterApi>> {
    let api = KubeClusterApi::try_default()
        .await
        .map_err(|e| CliError::Cluster {
            message: e.to_string(),
            help: Some("check your kubeconfig or the KUBECONFIG variable".to_string()),
        })?;
    Ok(Arc::new(api))
}
