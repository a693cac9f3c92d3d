//! Lendwatch CLI
//!
//! A command-line tool for inspecting tracked metrics, baselines and the
//! health of a running watcher.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{metrics, status};

/// Number of history entries shown when --limit is not given
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Lendwatch CLI
#[derive(Parser)]
#[command(name = "lwctl")]
#[command(author, version, about = "CLI for the Lendwatch metric watcher", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via LWCTL_API_URL env var)
    #[arg(long, env = "LWCTL_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tracked metrics
    Metrics,

    /// Show the current value of a metric
    Check {
        /// Metric key (e.g. euler:pyusd:supply:cap)
        key: String,
    },

    /// Show recent recorded values of a metric
    History {
        /// Metric key
        key: String,

        /// Maximum number of entries
        #[arg(long, short, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },

    /// Show scheduler progress
    Status,

    /// Show thresholds, interval and sources
    Info,

    /// Check that the watcher is reachable and healthy
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Metrics => metrics::list_metrics(&client, cli.format).await?,
        Commands::Check { key } => metrics::check_metric(&client, &key, cli.format).await?,
        Commands::History { key, limit } => {
            metrics::show_history(&client, &key, limit, cli.format).await?
        }
        Commands::Status => status::show_status(&client, cli.format).await?,
        Commands::Info => status::show_info(&client, cli.format).await?,
        Commands::Ping => status::ping(&client, cli.format).await?,
    }

    Ok(())
}
