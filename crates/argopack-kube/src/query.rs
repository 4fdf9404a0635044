//! Label-selector queries over managed objects

use futures::future::join_all;
use tracing::{debug, info};

use crate::cluster::{ApiTarget, ClusterApi};
use crate::error::{KubeError, Result};
use crate::options::dry_run_suffix;
use crate::resource::VersionedResource;

/// Objects of one kind matching a label selector
pub async fn list_by_label_selector(
    api: &dyn ClusterApi,
    target: &ApiTarget,
    selector: &str,
) -> Result<Vec<VersionedResource>> {
    let objects = api
        .list(target, selector)
        .await
        .map_err(|e| target.context("list", selector, e))?;

    debug!(
        "Found {} {} matching {}",
        objects.len(),
        target,
        selector
    );
    Ok(objects
        .into_iter()
        .map(VersionedResource::from_object)
        .collect())
}

/// Delete every object of one kind matching a label selector
///
/// Deletes run concurrently, each in the namespace the object was found
/// in. Returns the deleted objects; every failed delete is reported.
pub async fn delete_by_label_selector(
    api: &dyn ClusterApi,
    target: &ApiTarget,
    selector: &str,
    dry_run: bool,
) -> Result<Vec<VersionedResource>> {
    let found = list_by_label_selector(api, target, selector).await?;

    let results = join_all(found.into_iter().map(|resource| async move {
        let object_target = match &resource.namespace {
            Some(ns) if target.namespace.is_none() => ApiTarget::new(target.kind, ns),
            _ => target.clone(),
        };
        api.delete(&object_target, &resource.name, dry_run)
            .await
            .map_err(|e| object_target.context("delete", &resource.name, e))?;
        info!(
            "Deleted {} {} v{}{}",
            target.kind,
            resource.name,
            resource.version,
            dry_run_suffix(dry_run)
        );
        Ok::<_, KubeError>(resource)
    }))
    .await;

    let mut deleted = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(resource) => deleted.push(resource),
            Err(e) => failures.push(e),
        }
    }

    KubeError::aggregate(format!("delete {} matching {}", target, selector), failures)?;
    Ok(deleted)
}
