pub mod cli;
pub mod commands;
pub mod error;
pub mod models;
pub mod services;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, ConfigAction};
use services::config::ConfigManager;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8, json: bool) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };

    match cli.command {
        Command::Scan(args) => {
            let config = manager.load()?;
            let output = commands::scan::run(config, args)?;
            info!("Results saved to {}", output.display());
        }
        Command::Config { action } => {
            commands::config::run(&manager, action.unwrap_or(ConfigAction::Show))?;
        }
        Command::Library { dir } => {
            let config = manager.load()?;
            commands::library::run(&dir, config.matcher.probe_size)?;
        }
    }
    Ok(())
}
