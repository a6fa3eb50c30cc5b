use anyhow::Result;
use clap::Parser;

mod api;
mod auth;
mod channel;
mod cli;
mod config;
mod error;
mod hub;
mod limiter;
mod message;
mod shutdown;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Serve { host, port } => cli::commands::serve(host, port).await,
        Commands::Stats { url } => cli::commands::stats(&url).await,
    }
}
