//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Install reports with per-resource decisions
//! - Installed package tables and details
//! - Uninstall summaries

use argopack_core::workflow::Arguments;
use argopack_kube::{
    InstallReport, InstalledPackage, PackageDetails, ResourceOutcome, UninstallReport,
    UpdateDecision,
};
use console::{Style, style};

/// Pluralize a word based on count
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

fn decision_style(decision: UpdateDecision) -> (&'static str, Style) {
    match decision {
        UpdateDecision::Create => ("+", Style::new().green()),
        UpdateDecision::PatchUpdate => ("~", Style::new().yellow()),
        UpdateDecision::RecreateUpdate => ("±", Style::new().magenta()),
        UpdateDecision::SkipNewer => ("!", Style::new().red().dim()),
        UpdateDecision::SkipUpToDate => ("=", Style::new().dim()),
    }
}

fn format_outcome(outcome: &ResourceOutcome) -> String {
    let (symbol, decision_style) = decision_style(outcome.decision);
    let versions = match &outcome.previous_version {
        Some(previous) if *previous != outcome.version => {
            format!("v{} → v{}", previous, outcome.version)
        }
        _ => format!("v{}", outcome.version),
    };

    format!(
        "  {} {} {} {} {}",
        decision_style.apply_to(symbol),
        style(outcome.kind).dim(),
        style(&outcome.name).cyan(),
        style(versions).yellow(),
        decision_style.apply_to(format!("({})", outcome.decision)),
    )
}

/// Display the outcome of one package install
pub fn display_install_report(report: &InstallReport, verbose: bool) {
    println!(
        "{} {} {}",
        style("Package").bold(),
        style(&report.package).cyan().bold(),
        if report.parent != report.package {
            style(format!("(dependency of {})", report.parent)).dim().to_string()
        } else {
            String::new()
        }
    );

    for outcome in report.outcomes() {
        if verbose || outcome.decision.is_mutation() {
            println!("{}", format_outcome(outcome));
        }
    }

    let skipped =
        report.count(UpdateDecision::SkipUpToDate) + report.count(UpdateDecision::SkipNewer);
    println!(
        "  {} created, {} patched, {} recreated, {} unchanged",
        report.count(UpdateDecision::Create),
        report.count(UpdateDecision::PatchUpdate),
        report.count(UpdateDecision::RecreateUpdate),
        skipped
    );
}

/// Display installed packages as a table
pub fn display_package_table(packages: &[InstalledPackage]) {
    println!(
        "{:<40} {:<12} {:<30} {:<10}",
        style("NAME").bold(),
        style("VERSION").bold(),
        style("PARENT").bold(),
        style("RUNNABLE").bold()
    );

    for package in packages {
        let runnable = if package.is_executable() {
            style("yes").green()
        } else {
            style("no").dim()
        };
        println!(
            "{:<40} {:<12} {:<30} {:<10}",
            package.provenance.name,
            package.provenance.version,
            package.provenance.parent,
            runnable
        );
    }
}

fn display_arguments(title: &str, arguments: &Arguments) {
    println!("{}", style(title).yellow());
    if arguments.parameters.is_empty() {
        println!("  {}", style("none").dim());
    }
    for parameter in &arguments.parameters {
        match &parameter.value {
            Some(value) => println!("  - {} {}", style(&parameter.name).green(), value),
            None => println!(
                "  - {} {}",
                style(&parameter.name).cyan(),
                style("(required)").red()
            ),
        }
    }
}

fn display_names(title: &str, names: &[String]) {
    println!("\n{}", style(title).blue().bold());
    if names.is_empty() {
        println!("  {}", style("none").dim());
    }
    for name in names {
        println!("  - {}", style(name).yellow());
    }
}

/// Display a package with everything it owns
pub fn display_package_details(package: &InstalledPackage, details: &PackageDetails) {
    let info = &package.provenance;
    println!("{}", style("Package Info:").blue().bold());
    println!("  {} {}", style("Name:").yellow(), style(&info.name).cyan());
    println!("  {} {}", style("Version:").yellow(), style(&info.version).cyan());
    println!(
        "  {} {}",
        style("Parent Dependency:").yellow(),
        style(&info.parent).cyan()
    );
    println!(
        "  {} {}",
        style("Package Registry:").yellow(),
        style(&info.registry).cyan()
    );
    println!(
        "  {} {}",
        style("Executable:").yellow(),
        style(package.is_executable()).cyan()
    );

    println!();
    display_arguments("Arguments:", &package.arguments);

    println!("\n{}", style("Templates:").blue().bold());
    for template in &package.templates {
        println!("  - {}", style(&template.name).yellow());
    }

    display_names("Pipelines:", &details.pipelines);
    display_names("Config Maps:", &details.config_maps);
    if !details.secrets.is_empty() {
        display_names("Secrets:", &details.secrets);
    }

    println!("\n{}", style("Cron Workflows:").blue().bold());
    if details.cron_workflows.is_empty() {
        println!("  {}", style("none").dim());
    }
    for cron in &details.cron_workflows {
        println!(
            "  - Name: {}, Schedule: {}, Timezone: {}",
            style(&cron.name).yellow(),
            style(cron.schedule.as_deref().unwrap_or("-")).cyan(),
            style(cron.timezone.as_deref().unwrap_or("-")).cyan()
        );
    }
}

/// Display one template of a package
pub fn display_template(package: &InstalledPackage, template: &str) -> argopack_kube::Result<()> {
    let template = package.template(template)?;
    println!(
        "{} {}",
        style("Template:").blue(),
        style(&template.name).bold()
    );
    display_arguments("Inputs:", &template.inputs);
    Ok(())
}

/// Display what an uninstall removed
pub fn display_uninstall_report(report: &UninstallReport) {
    for dependency in &report.dependencies {
        display_uninstall_report(dependency);
    }
    for resource in &report.deleted {
        println!(
            "  {} {} {}",
            style("-").red(),
            style(&resource.kind).dim(),
            style(&resource.name).cyan()
        );
    }
}
