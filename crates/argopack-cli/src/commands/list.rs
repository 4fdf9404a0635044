//! List command - list installed packages

use argopack_kube::InstalledPackage;
use console::style;
use serde_json::json;

use crate::display::display_package_table;
use crate::error::{CliError, Result};

/// Run the list command
pub async fn run(namespace: &str, cluster: bool, output_json: bool) -> Result<()> {
    let api = super::connect().await?;
    let packages = InstalledPackage::list(api.as_ref(), namespace, cluster).await?;

    if output_json {
        let entries: Vec<_> = packages
            .iter()
            .map(|p| {
                json!({
                    "name": p.provenance.name,
                    "version": p.provenance.version,
                    "parent": p.provenance.parent,
                    "registry": p.provenance.registry,
                    "template": p.name(),
                    "runnable": p.is_executable(),
                })
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries).map_err(|e| CliError::Other {
            message: e.to_string(),
        })?;
        println!("{}", json);
        return Ok(());
    }

    if packages.is_empty() {
        if cluster {
            println!("No packages installed at cluster scope");
        } else {
            println!("No packages installed in namespace {}", style(namespace).yellow());
        }
        return Ok(());
    }

    display_package_table(&packages);
    Ok(())
}
