use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use beacon_cli::commands::{heartbeat, session, track};
use beacon_cli::{Cli, Commands, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr; stdout carries the JSON lines
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Track { event, props }) => {
            let config = load_config(&cli)?;
            track::run(&config, event, props).await?;
        }
        Some(Commands::Heartbeat { count, every }) => {
            let config = load_config(&cli)?;
            heartbeat::run(&config, *count, *every).await?;
        }
        Some(Commands::Session) => {
            // Session ids need no configuration
            session::run(&mut std::io::stdout().lock(), chrono::Utc::now())?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}
