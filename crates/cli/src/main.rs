//! Hotline CLI
//!
//! Classify citizen requests, speak text through the speech queue and run
//! simulated hotline calls against the contact-center backend (or fully
//! offline with the built-in catalog).

mod commands;
mod config;
mod output;
mod voice;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Hotline - contact-center voice agent
#[derive(Parser)]
#[command(name = "hotline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Classify requests and simulate calls for the hotline voice agent")]
#[command(long_about = r#"
Hotline CLI drives the contact-center voice agent from the terminal.

Examples:
  hotline classify "немає опалення вже другий день"
  hotline catalog
  hotline speak "Вітаю" "Як справи?"
  hotline simulate --query "На дорозі величезна яма"
"#)]
struct Cli {
    /// Backend URL
    #[arg(long, env = "HOTLINE_BACKEND_URL")]
    backend: Option<String>,

    /// Config file (defaults to ~/.hotline/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a request
    Classify {
        text: String,

        /// Skip the backend and use the built-in catalog
        #[arg(long)]
        local: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the active category catalog
    Catalog,

    /// Speak one or more texts in order
    Speak {
        #[arg(required = true)]
        texts: Vec<String>,

        /// Use only the local voice
        #[arg(long)]
        no_remote: bool,
    },

    /// Run one simulated call
    Simulate {
        /// What the caller says (random sample request otherwise)
        #[arg(short, long)]
        query: Option<String>,

        /// Do not contact the backend
        #[arg(long)]
        offline: bool,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("hotline={level},hotline_cli={level},warn", level = log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(url) = cli.backend {
        config.backend.url = url;
    }
    config.validate()?;

    match cli.command {
        Commands::Classify { text, local, json } => {
            commands::classify(&config, &text, local, json).await?;
        }
        Commands::Catalog => {
            commands::catalog(&config).await?;
        }
        Commands::Speak { texts, no_remote } => {
            commands::speak(&config, &texts, no_remote).await?;
        }
        Commands::Simulate { query, offline } => {
            commands::simulate(&config, query, offline).await?;
        }
        Commands::Config => {
            commands::show_config(&config)?;
        }
    }

    Ok(())
}
