use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tandem_relay::{RelayConfig, RelayServer};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(bin_name = "tandem", version, about = "Signaling relay for two-party peer sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the websocket relay.
    Relay {
        /// JSON config file; flags override its values.
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        bind: Option<String>,

        /// Participants admitted per room.
        #[arg(long)]
        capacity: Option<usize>,
    },

    /// Print the effective relay config as JSON.
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<RelayConfig> {
    match path {
        Some(path) => RelayConfig::from_file(path),
        None => Ok(RelayConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Relay {
            config,
            bind,
            capacity,
        } => {
            let mut config = load_config(config)?;
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(capacity) = capacity {
                config.room_capacity = capacity;
            }
            if config.room_capacity < 2 {
                anyhow::bail!("room capacity must be at least 2, got {}", config.room_capacity);
            }

            let server = RelayServer::bind(&config).await?;
            println!("{}", "Starting tandem relay...".green().bold());
            println!("   Listening: ws://{}/ws/<participant>", server.local_addr()?);
            println!("   Room capacity: {}", config.room_capacity);

            server.run().await?;
        }

        Commands::Config { config } => {
            let config = load_config(config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
