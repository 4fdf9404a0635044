//! Run command - submit a Workflow for an installed package

use argopack_core::workflow::{RunOptions, parse_arguments};
use argopack_kube::InstalledPackage;
use console::style;

use crate::error::Result;

/// Run the run command
pub async fn run(
    package: &str,
    namespace: &str,
    cluster: bool,
    template: Option<&str>,
    service_account: Option<String>,
    image_pull_secret: Option<String>,
    args: &[String],
) -> Result<()> {
    // Malformed arguments are reported before touching the cluster
    let arguments = parse_arguments(args)?;

    let api = super::connect().await?;
    let installed = InstalledPackage::find(api.as_ref(), namespace, package, cluster).await?;
    let options = RunOptions {
        cluster,
        service_account,
        image_pull_secret,
    };

    let workflow = match template {
        Some(template) => {
            installed
                .run_template(api.as_ref(), namespace, template, &arguments, &options)
                .await?
        }
        None => {
            installed
                .run(api.as_ref(), namespace, &arguments, &options)
                .await?
        }
    };

    println!(
        "{} Submitted workflow {} in namespace {}",
        style("✓").green().bold(),
        style(workflow.metadata.name.as_deref().unwrap_or_default()).cyan(),
        style(namespace).yellow()
    );
    Ok(())
}
