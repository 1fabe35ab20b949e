//! Bulletin CLI application

use bulletin_cli::{AppConfig, Cli, CommandDispatcher, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = CommandDispatcher::execute(cli.command, config).await {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

/// Set up logging; logs go to stderr so chat output stays readable
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file, or use defaults
fn load_configuration(path: Option<&str>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path);
            AppConfig::load_from_file(path)
        }
        None => Ok(AppConfig::default()),
    }
}
