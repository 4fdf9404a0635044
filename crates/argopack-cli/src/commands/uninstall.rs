//! Uninstall command - remove a package and its dependencies

use argopack_kube::{InstalledPackage, UninstallOptions};
use console::style;

use crate::display::{display_uninstall_report, pluralize};
use crate::error::Result;

/// Run the uninstall command
pub async fn run(package: &str, namespace: &str, cluster: bool, dry_run: bool) -> Result<()> {
    let api = super::connect().await?;
    let installed = InstalledPackage::find(api.as_ref(), namespace, package, cluster).await?;

    println!(
        "{} Uninstalling package {} version {}",
        style("→").blue().bold(),
        style(&installed.provenance.name).cyan(),
        style(&installed.provenance.version).yellow()
    );

    let mut options = UninstallOptions::new(namespace);
    options.cluster = cluster;
    options.dry_run = dry_run;

    let report = installed.uninstall(api.as_ref(), &options).await?;
    display_uninstall_report(&report);

    let deleted = pluralize(report.total_deleted(), "resource", "resources");
    if dry_run {
        println!(
            "{} Dry run - would delete {} of {}",
            style("✓").green().bold(),
            deleted,
            style(&report.package).cyan()
        );
    } else {
        println!(
            "{} Successfully uninstalled {} ({} deleted)",
            style("✓").green().bold(),
            style(&report.package).cyan(),
            deleted
        );
    }

    Ok(())
}
