//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chat over a loopback channel with a scripted peer
    Chat {
        /// Your display name
        #[arg(short, long)]
        name: Option<String>,
        /// Display name of the scripted peer
        #[arg(short, long)]
        peer: Option<String>,
    },
    /// Print bubble placements on the configured surface
    Place {
        /// Number of bubbles to place
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
        /// Seed for reproducible placement
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Print the default configuration as TOML
    ExampleConfig,
}
