//! Telemetry Insights CLI
//!
//! Trains anomaly models, generates insights locally, and queries a running
//! insights server.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{analyze, remote, train};
use insights_lib::pipeline::ForestConfig;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Telemetry Insights CLI
#[derive(Parser)]
#[command(name = "insights")]
#[command(author, version, about = "CLI for Telemetry Insights", long_about = None)]
pub struct Cli {
    /// Server URL (can also be set via INSIGHTS_API_URL env var)
    #[arg(long, env = "INSIGHTS_API_URL", default_value = "http://localhost:5001")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train an anomaly model from stored telemetry
    Train {
        /// Directory containing logs.json, tasks.json and metrics.json
        #[arg(long, default_value = "mock_data")]
        data_dir: PathBuf,

        /// Where to write the model artifact
        #[arg(long, short, default_value = "models/trained_model.json")]
        output: PathBuf,

        /// Number of isolation trees
        #[arg(long, default_value_t = 100)]
        trees: usize,

        /// Rows sampled per tree
        #[arg(long, default_value_t = 256)]
        sample_size: usize,

        /// Expected share of anomalies in the training data
        #[arg(long, default_value_t = 0.1)]
        contamination: f64,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Model version (derived from the training time if omitted)
        #[arg(long)]
        model_version: Option<String>,
    },

    /// Generate insights locally
    Analyze {
        /// Directory containing logs.json, tasks.json and metrics.json
        #[arg(long, default_value = "mock_data")]
        data_dir: PathBuf,

        /// Model artifact; a missing or invalid model selects fallback insights
        #[arg(long, default_value = "models/trained_model.json")]
        model: PathBuf,
    },

    /// Fetch insights from a running server
    Remote {
        /// Post this directory's collections instead of using the server's
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Show server health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Train {
            data_dir,
            output,
            trees,
            sample_size,
            contamination,
            seed,
            model_version,
        } => {
            let forest = ForestConfig {
                n_trees: trees,
                sample_size,
                contamination,
                seed,
            };
            train::run_train(&data_dir, &output, forest, model_version, cli.format).await?;
        }
        Commands::Analyze { data_dir, model } => {
            analyze::run_analyze(&data_dir, &model, cli.format).await?;
        }
        Commands::Remote { data_dir } => {
            let client = client::ApiClient::new(&cli.api_url)?;
            remote::run_remote(&client, data_dir.as_deref(), cli.format).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&cli.api_url)?;
            remote::run_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
