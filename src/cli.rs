use crate::models::record::Mode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reads commander damage tables out of raid results screenshots
#[derive(Debug, Parser)]
#[command(name = "raid-results", version, about)]
pub struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read one results screenshot into a CSV table
    Scan(ScanArgs),

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// List the portrait identifiers found in a directory, in match order
    Library {
        dir: PathBuf,
    },
}

#[derive(Debug, clap::Args)]
pub struct ScanArgs {
    pub screenshot: PathBuf,

    #[arg(long, value_enum)]
    pub mode: Mode,

    /// Reference portrait directory
    #[arg(long)]
    pub library: Option<PathBuf>,

    /// Directory holding the two row templates
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// OCR server base URL
    #[arg(long)]
    pub ocr_url: Option<String>,

    /// Defaults to results_<timestamp>.csv
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Print the config file location
    Path,
    /// Write the default config unless one exists
    Init,
    /// Print the effective config
    Show,
}
