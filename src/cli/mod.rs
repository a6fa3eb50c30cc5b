//! CLI interface for Courier

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "courier")]
#[command(version = "1.0.0")]
#[command(about = "WebSocket event broadcasting hub", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new courier.toml configuration file
    Init,

    /// Run the hub
    Serve {
        /// Listen host (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print statistics from a running hub
    Stats {
        /// Base URL of the hub
        #[arg(long, default_value = "http://127.0.0.1:8765")]
        url: String,
    },
}
