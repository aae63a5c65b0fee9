//! Tutorbot CLI: the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP server with the browser client
//! - `init`    Write a default config file
//! - `config`  Show, validate or locate the configuration
//! - `doctor`  Diagnose the local setup

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tutorbot_config::{AppConfig, ConfigError};

mod commands;

#[derive(Parser)]
#[command(
    name = "tutorbot",
    about = "Tutorbot: a school tutoring chat service",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read configuration from this file instead of ~/.tutorbot/config.toml
    #[arg(short, long, global = true, env = "TUTORBOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose configuration, provider and topic data
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key masked)
    Show,
    /// Validate the configuration
    Validate,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(&config_path, port, host).await?,
        Commands::Init { force } => commands::init::run(&config_path, force).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&config_path).await?,
            ConfigAction::Validate => commands::config_cmd::validate(&config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(&config_path).await?,
        },
        Commands::Doctor => commands::doctor::run(&config_path).await?,
    }

    Ok(())
}

/// Load `path` with environment overrides applied and validated.
pub(crate) fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    tracing::debug!(path = %path.display(), "Loading configuration");
    AppConfig::load_with_overrides(path)
}
