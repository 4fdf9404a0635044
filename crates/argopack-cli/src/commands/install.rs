//! Install command - reconcile a package into the cluster

use std::path::PathBuf;

use argopack_core::LoadedPackage;
use argopack_kube::{Category, InstallOptions, PackageReconciler};
use console::style;

use crate::display::{display_install_report, pluralize};
use crate::error::Result;

/// Arguments of the install command
pub struct InstallArgs {
    pub path: PathBuf,
    pub namespace: String,
    pub cluster: bool,
    pub force: bool,
    pub dry_run: bool,
    pub registry: String,
    pub with_dependencies: bool,
    pub configmaps: Option<Vec<String>>,
    pub secrets: Option<Vec<String>>,
    pub pipelines: Option<Vec<String>>,
    pub templates: Option<Vec<String>>,
    pub cronworkflows: Option<Vec<String>>,
    pub cron_schedule: Option<String>,
    pub time_zone: Option<String>,
    pub verbose: bool,
}

impl InstallArgs {
    fn options(&self) -> InstallOptions {
        let mut options = InstallOptions::new(&self.namespace).with_registry(&self.registry);
        options.cluster = self.cluster;
        options.force = self.force;
        options.dry_run = self.dry_run;
        options.cron_schedule = self.cron_schedule.clone();
        options.time_zone = self.time_zone.clone();

        let filters = [
            (Category::ConfigMaps, &self.configmaps),
            (Category::Secrets, &self.secrets),
            (Category::Pipelines, &self.pipelines),
            (Category::Templates, &self.templates),
            (Category::CronWorkflows, &self.cronworkflows),
        ];
        for (category, names) in filters {
            if let Some(names) = names {
                options = options.with_filter(category, names.iter().cloned());
            }
        }
        options
    }
}

/// Run the install command
pub async fn run(args: InstallArgs) -> Result<()> {
    // Load the package before connecting so a bad path fails fast
    let package = LoadedPackage::load(&args.path)?;
    println!(
        "{} Installing package {} version {} in {}",
        style("→").blue().bold(),
        style(&package.descriptor.name).cyan(),
        style(&package.descriptor.version).yellow(),
        if args.cluster {
            style("cluster scope".to_string()).yellow()
        } else {
            style(format!("namespace {}", args.namespace)).yellow()
        }
    );

    let api = super::connect().await?;
    let reconciler = PackageReconciler::new(api);
    let options = args.options();

    let reports = if args.with_dependencies {
        reconciler.install_tree(&args.path, &options).await?
    } else {
        vec![reconciler.install(&args.path, &options).await?]
    };

    for report in &reports {
        display_install_report(report, args.verbose);
    }

    let total: usize = reports.iter().map(|r| r.total()).sum();
    if args.dry_run {
        println!(
            "{} Dry run - {} validated, nothing was changed",
            style("✓").green().bold(),
            pluralize(total, "resource", "resources")
        );
    } else {
        println!(
            "{} Successfully installed {} ({})",
            style("✓").green().bold(),
            style(package.descriptor.qualified_name()).cyan(),
            pluralize(total, "resource", "resources")
        );
    }

    Ok(())
}
