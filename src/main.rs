use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use dealer_assign::{ApiClient, ApiConfig, FanOut, Pipeline};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long)]
    log_level: Option<String>,
    /// YAML file with API settings
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Override the API root, e.g. http://localhost:8080/api/
    #[clap(long)]
    base_url: Option<String>,
    /// Per-request timeout in seconds
    #[clap(long)]
    timeout_secs: Option<u64>,
    /// Cap on concurrent fetches while fanning out
    #[clap(long)]
    max_in_flight: Option<usize>,
    /// Fetch and assign, but print the answer instead of posting it
    #[clap(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let config = resolve_config(&args)?;
    let client = ApiClient::from_config(&config)?;
    let pipeline = Pipeline::new(client)
        .with_fan_out(FanOut::from_max_in_flight(config.max_in_flight))
        .dry_run(args.dry_run);

    let outcome = pipeline.run().await.context("Run failed")?;

    if outcome.submitted() {
        info!(
            "Submitted {} dealers for dataset {}",
            outcome.answer.dealers.len(),
            outcome.dataset_id
        );
    } else {
        println!("{}", serde_json::to_string_pretty(&outcome.answer)?);
    }

    Ok(())
}

fn resolve_config(args: &Cli) -> Result<ApiConfig> {
    let config = match &args.config {
        Some(path) => ApiConfig::from_file(path)
            .with_context(|| format!("Loading config from {}", path.display()))?,
        None => ApiConfig::default(),
    };
    let mut config = config.with_env()?;

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.timeout_secs = timeout_secs;
    }
    if let Some(max_in_flight) = args.max_in_flight {
        config.max_in_flight = Some(max_in_flight);
    }

    config.validate()?;
    Ok(config)
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("hyper=off,reqwest=warn,{}", log_level)))
        .without_time()
        .init();
}
