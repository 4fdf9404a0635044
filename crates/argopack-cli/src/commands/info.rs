//! Info command - describe an installed package

use argopack_kube::InstalledPackage;

use crate::display::{display_package_details, display_template};
use crate::error::Result;

/// Run the info command
pub async fn run(
    package: &str,
    namespace: &str,
    cluster: bool,
    template: Option<&str>,
) -> Result<()> {
    let api = super::connect().await?;
    let installed = InstalledPackage::find(api.as_ref(), namespace, package, cluster).await?;

    if let Some(template) = template {
        display_template(&installed, template)?;
        return Ok(());
    }

    let details = installed.details(api.as_ref(), namespace).await?;
    display_package_details(&installed, &details);
    Ok(())
}
