//! Demo driver for the request governor.
//!
//! Runs a burst of simulated flaky operations through one orchestrator
//! and prints the resulting pipeline status. No network involved; the
//! "upstream" is a randomized sleep that fails with a configurable ratio.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rand::Rng;

use request_governor::config::loader::load_config;
use request_governor::{
    operation, BatchRequest, ExecuteOptions, GovernorConfig, GovernorError, Orchestrator,
};

#[derive(Parser)]
#[command(name = "governor-cli")]
#[command(about = "Demo driver for the request governor", long_about = None)]
struct Cli {
    /// Optional TOML config; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a burst of simulated operations through the pipeline
    Run {
        /// Number of requests to submit.
        #[arg(short, long, default_value_t = 20)]
        requests: usize,

        /// Probability in [0, 1] that a single attempt fails with a 500.
        #[arg(short, long, default_value_t = 0.3)]
        fail_ratio: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GovernorConfig::default(),
    };
    request_governor::observability::logging::init(&config.observability.log_level);

    match cli.command {
        Commands::Run {
            requests,
            fail_ratio,
        } => run_burst(config, requests, fail_ratio).await?,
    }

    Ok(())
}

async fn run_burst(
    config: GovernorConfig,
    requests: usize,
    fail_ratio: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let governor: Orchestrator<u64> = Orchestrator::new(config);

    // Log lifecycle events as they arrive.
    let mut events = governor.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(?event, "lifecycle");
        }
    });

    let batch: Vec<BatchRequest<u64>> = (0..requests)
        .map(|index| {
            let op = operation(move |_token| async move {
                let latency = rand::thread_rng().gen_range(20..80);
                tokio::time::sleep(Duration::from_millis(latency)).await;
                if rand::thread_rng().gen_bool(fail_ratio.clamp(0.0, 1.0)) {
                    Err(GovernorError::Upstream { status: 500 })
                } else {
                    Ok(index as u64)
                }
            });
            BatchRequest::with_options(op, ExecuteOptions::with_priority((index % 3) as i32))
        })
        .collect();

    let outcomes = governor.settle_all(batch).await;
    let successful = outcomes.iter().filter(|o| o.is_ok()).count();
    tracing::info!(
        requests,
        successful,
        failed = outcomes.len() - successful,
        "Burst complete"
    );

    println!("{}", serde_json::to_string_pretty(&governor.status())?);
    Ok(())
}
