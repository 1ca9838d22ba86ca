//! Execgate CLI
//!
//! Command-line interface for interacting with the Execgate gateway.

mod api;
mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "execgate")]
#[command(about = "Execgate code execution CLI", long_about = None)]
struct Cli {
    /// Gateway URL
    #[arg(long, env = "EXECGATE_URL", default_value = "http://localhost:8000")]
    gateway_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        gateway_url: cli.gateway_url,
    };

    handle_command(cli.command, &config).await
}
