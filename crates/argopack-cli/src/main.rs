//! Argopack CLI - The package manager for Argo Workflows resources

use std::io::stderr;
use std::path::PathBuf;

use argopack_core::Settings;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

mod commands;
mod display;
mod error;
mod exit_codes;

use error::Result;

#[derive(Parser)]
#[command(name = "argopack")]
#[command(author = "Argopack Contributors")]
#[command(version)]
#[command(about = "The package manager for Argo Workflows resources", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Target namespace (defaults to the configured namespace)
    #[arg(short, long, global = true, env = "ARGOPACK_NAMESPACE")]
    namespace: Option<String>,

    /// Use cluster-scoped templates (ClusterWorkflowTemplates)
    #[arg(short, long, global = true)]
    cluster: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package and its resources into the cluster
    Install {
        /// Package directory (containing package.json)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Update resources even if the installed version is newer or equal
        #[arg(short, long)]
        force: bool,

        /// Validate every request with the API server without persisting it
        #[arg(long)]
        dry_run: bool,

        /// Registry recorded on installed resources
        #[arg(long, env = "ARGOPACK_REGISTRY")]
        registry: Option<String>,

        /// Also install every package under node_modules
        #[arg(long)]
        with_dependencies: bool,

        /// Only install these ConfigMaps (comma separated)
        #[arg(long, value_delimiter = ',')]
        configmaps: Option<Vec<String>>,

        /// Only install these Secrets (comma separated)
        #[arg(long, value_delimiter = ',')]
        secrets: Option<Vec<String>>,

        /// Only install these Pipelines (comma separated)
        #[arg(long, value_delimiter = ',')]
        pipelines: Option<Vec<String>>,

        /// Only install these WorkflowTemplates (comma separated)
        #[arg(long, value_delimiter = ',')]
        templates: Option<Vec<String>>,

        /// Only install these CronWorkflows (comma separated)
        #[arg(long, value_delimiter = ',')]
        cronworkflows: Option<Vec<String>>,

        /// Override the schedule of every CronWorkflow
        #[arg(long)]
        cron_schedule: Option<String>,

        /// Override the timezone of every CronWorkflow
        #[arg(long)]
        time_zone: Option<String>,

        /// Show unchanged resources too
        #[arg(short, long)]
        verbose: bool,
    },

    /// List installed packages
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an installed package and the resources it owns
    Info {
        /// Package name
        package: String,

        /// Show the inputs of one template instead
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Remove a package, its dependencies and all their resources
    Uninstall {
        /// Package name
        package: String,

        /// Validate every delete with the API server without persisting it
        #[arg(long)]
        dry_run: bool,
    },

    /// Run an installed package, or one of its templates, as a Workflow
    Run {
        /// Package name
        package: String,

        /// Run a single template of the package
        #[arg(short, long)]
        template: Option<String>,

        /// Service account for the workflow pods
        #[arg(long)]
        service_account: Option<String>,

        /// Image pull secret for the workflow pods
        #[arg(long)]
        image_pull_secret: Option<String>,

        /// Workflow parameters as `--name value` pairs
        #[arg(last = true)]
        args: Vec<String>,
    },
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let default_directives = format!(
        "argopack={level},argopack_kube={level},argopack_core={level},kube=warn,hyper=warn,tower=warn,rustls=warn",
        level = level
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(stderr))
        .init();
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let code = match run(cli).await {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load().unwrap_or_else(|e| {
        warn!("Ignoring settings file: {}", e);
        Settings::default()
    });
    let namespace = cli.namespace.unwrap_or(settings.namespace);
    let cluster = cli.cluster || settings.cluster;

    match cli.command {
        Commands::Install {
            path,
            force,
            dry_run,
            registry,
            with_dependencies,
            configmaps,
            secrets,
            pipelines,
            templates,
            cronworkflows,
            cron_schedule,
            time_zone,
            verbose,
        } => {
            let args = commands::install::InstallArgs {
                path,
                namespace,
                cluster,
                force,
                dry_run,
                registry: registry.unwrap_or(settings.registry),
                with_dependencies,
                configmaps,
                secrets,
                pipelines,
                templates,
                cronworkflows,
                cron_schedule,
                time_zone,
                verbose,
            };
            commands::install::run(args).await
        }

        Commands::List { json } => commands::list::run(&namespace, cluster, json).await,

        Commands::Info { package, template } => {
            commands::info::run(&package, &namespace, cluster, template.as_deref()).await
        }

        Commands::Uninstall { package, dry_run } => {
            commands::uninstall::run(&package, &namespace, cluster, dry_run).await
        }

        Commands::Run {
            package,
            template,
            service_account,
            image_pull_secret,
            args,
        } => {
            commands::run::run(
                &package,
                &namespace,
                cluster,
                template.as_deref(),
                service_account,
                image_pull_secret,
                &args,
            )
            .await
        }
    }
}
