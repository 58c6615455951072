//! CLI interface for voltrend
//!
//! Subcommands:
//! - `run`: start the analysis engine
//! - `config`: show the resolved configuration
//! - `status`: show current state

mod run;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "voltrend")]
#[command(about = "Volume-profile and multi-timeframe trend signal engine for crypto futures")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the analysis engine
    Run(RunArgs),
    /// Show the resolved configuration
    Config,
    /// Show current state
    Status,
}
