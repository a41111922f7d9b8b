use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::AppConfig;

pub mod chat;
pub mod models;
pub mod render;

#[derive(Subcommand)]
enum Command {
    /// Start a chat session (the default)
    Chat {
        /// Name or 1-based index of the backend to use
        #[arg(long)]
        model: Option<String>,
    },
    /// List the configured backends
    Models {},
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub fn run() -> Result<()> {
    let args = Cli::parse();

    // Logs go to stderr so they don't interleave with the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=warn", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::from_env()?;
    tracing::debug!("Loaded config: {:?}", config);

    // Handle each sub command
    match args.command {
        Some(Command::Chat { model }) => {
            chat::run(&config, model.as_deref())?;
        }
        Some(Command::Models {}) => {
            models::run(&config);
        }
        None => {
            chat::run(&config, None)?;
        }
    }

    Ok(())
}
