//! Quire CLI - serve Markdown/MDX documentation sources over HTTP.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::ServerArgs;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Serve Markdown/MDX documentation sources over HTTP")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to quire.toml config file
    #[arg(short, long, global = true, default_value = "quire.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the content root
    Serve {
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Serve with file watching and debug logging
    Dev {
        #[command(flatten)]
        server: ServerArgs,
    },
}

const DEBUG_FILTER: &str = "info,quire=debug,quire_server=debug,quire_content=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let debug = cli.verbose || matches!(cli.command, Commands::Dev { .. });
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { DEBUG_FILTER } else { "info" }));

    fmt().with_env_filter(filter).with_target(false).init();

    let file_config = config::load_config(&cli.config)?;

    // Execute command
    match cli.command {
        Commands::Serve { server } => {
            commands::serve::run(server.apply(file_config.server)).await?;
        }
        Commands::Dev { server } => {
            commands::dev::run(server.apply(file_config.server)).await?;
        }
    }

    Ok(())
}
