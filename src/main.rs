//! Soak command line
//!
//! Runs one command against the configured plugin repository and prints the
//! progress lines to stdout as they arrive. Logs go to stderr.
//!
//! # Examples
//!
//! ```bash
//! soak install nucleus luckperms
//! soak --plugin-dir ./server/mods update
//! soak search permissions
//! ```

use clap::{Parser, Subcommand};
use soak::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install server plugins and their dependencies from an Ore repository
#[derive(Parser, Debug)]
#[command(name = "soak")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "SOAK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory plugin artifacts are written to
    #[arg(long, global = true)]
    plugin_dir: Option<PathBuf>,

    /// Root URL of the Ore instance
    #[arg(long, global = true)]
    repository: Option<String>,

    /// YAML manifest listing the plugins already installed
    #[arg(long, global = true)]
    installed: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Install plugins by id, dependencies first
    Install {
        /// Plugin ids
        #[arg(required = true)]
        plugin_ids: Vec<String>,
    },

    /// Reinstall every installed plugin at its latest version
    Update,

    /// Remove plugins by id
    Remove {
        /// Plugin ids
        #[arg(required = true)]
        plugin_ids: Vec<String>,
    },

    /// Search the repository
    Search {
        /// Search text, at least three characters
        query: String,
    },
}

impl Commands {
    fn into_command(self) -> SoakResult<Command> {
        match self {
            Commands::Install { plugin_ids } => Command::install(plugin_ids),
            Commands::Update => Ok(Command::Update),
            Commands::Remove { plugin_ids } => Command::remove(plugin_ids),
            Commands::Search { query } => Command::search(query),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.log_error("run");
            eprintln!("soak: {e}");
            match e {
                SoakError::Validation(_) | SoakError::Config(_) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

/// Sets up tracing on stderr, `-v` raising the default level to debug
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("soak=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("soak=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> SoakResult<()> {
    let command = cli.command.into_command()?;

    let mut config = SoakConfig::discover(cli.config.as_deref())?;
    if let Some(plugin_dir) = cli.plugin_dir {
        config.plugin_dir = plugin_dir;
    }
    if let Some(root_url) = cli.repository {
        config.repository.root_url = root_url;
    }
    if let Some(installed) = cli.installed {
        config.installed_manifest = Some(installed);
    }
    config.validate()?;
    debug!("Using configuration {:?}", config);

    let registry = match &config.installed_manifest {
        Some(path) => PluginRegistry::load(path).await?,
        None => PluginRegistry::new(),
    };

    let workflow = Workflow::new(
        Arc::new(OreRepository::with_config(&config.repository)?),
        Arc::new(registry),
        Arc::new(TokioTaskRunner::current()?),
        config.plugin_dir.clone(),
    )
    .with_flush_interval(config.flush_interval());

    workflow
        .schedule(command, Arc::new(ConsoleSession))?
        .join()
        .await
}
