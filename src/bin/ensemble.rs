//! Ensemble CLI - aggregate a batch of model signals from a JSON file
//!
//! # Usage
//! ```sh
//! cargo run --bin ensemble -- signals.json --method bayesian --outcome 0.03 --explain
//! ```
//!
//! The input file holds a JSON array of `ModelSignal`. Configuration comes from
//! `ENSEMBLE_*` environment variables (a `.env` file is honoured) or `--config <toml>`.

use anyhow::{Context, Result};
use clap::Parser;
use signal_ensemble::application::{EnsembleEngine, EnsembleService};
use signal_ensemble::config::EngineConfig;
use signal_ensemble::domain::ensemble::AggregationMethod;
use signal_ensemble::domain::ml::SoftmaxMetaLearner;
use signal_ensemble::domain::signal::ModelSignal;
use signal_ensemble::infrastructure::EnsembleMetrics;
use signal_ensemble::infrastructure::mock::LinearScorer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file with an array of model signals
    signals: PathBuf,

    /// Aggregation method (majority_vote, performance_weighted, bayesian, stacking, dynamic_contextual)
    #[arg(short, long, default_value = "performance_weighted")]
    method: String,

    /// Only aggregate signals from this regime
    #[arg(short, long)]
    regime: Option<String>,

    /// Realized return to feed back after the decision
    #[arg(short, long, allow_hyphen_values = true)]
    outcome: Option<f64>,

    /// Explain the first signal's features with a linear demo scorer
    #[arg(long)]
    explain: bool,

    /// Comma-separated weights of the demo scorer (defaults to equal weights)
    #[arg(long, value_delimiter = ',')]
    weights: Vec<f64>,

    /// TOML config file (overrides environment variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fall back to performance-weighted voting when the method is unavailable
    #[arg(long)]
    fallback: bool,

    /// Print Prometheus metrics before exiting
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let args = Args::parse();
    info!("Ensemble CLI {} starting...", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::from_env()?,
    };

    let content = std::fs::read_to_string(&args.signals)
        .with_context(|| format!("Failed to read {}", args.signals.display()))?;
    let signals: Vec<ModelSignal> =
        serde_json::from_str(&content).context("Failed to parse signal batch")?;
    info!("Loaded {} signals from {}", signals.len(), args.signals.display());

    let method: AggregationMethod = args.method.parse()?;
    let meta_input_width = config.aggregation.meta_input_width;
    let meta_prior_gain = config.aggregation.meta_prior_gain;
    let metrics = EnsembleMetrics::new()?;
    let engine = Arc::new(EnsembleEngine::new(config).with_metrics(metrics.clone()));

    if method == AggregationMethod::Stacking && engine.meta_learner_version().is_none() {
        engine.set_meta_learner(Box::new(SoftmaxMetaLearner::with_vote_prior(
            meta_input_width,
            meta_prior_gain,
        )));
    }

    let service = EnsembleService::new(engine.clone());
    let regime = args.regime.as_deref();

    let decision = if args.fallback {
        engine.aggregate_with_fallback(&signals, method, regime)?
    } else {
        service.aggregate(&signals, method, regime).await?
    };
    println!("{}", serde_json::to_string_pretty(&decision)?);

    if let Some(outcome) = args.outcome {
        let report = service.record_outcome(outcome).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if args.explain {
        let features = signals
            .first()
            .map(|s| s.features.clone())
            .filter(|f| !f.is_empty())
            .context("The first signal carries no features to explain")?;

        let weights = if args.weights.is_empty() {
            vec![1.0 / features.len() as f64; features.len()]
        } else {
            args.weights.clone()
        };
        engine.set_scorer(Arc::new(LinearScorer::new(weights, 0.0)));

        let explanation = service.explain(features).await?;
        println!("{}", serde_json::to_string_pretty(&explanation)?);
    }

    if args.metrics {
        println!("{}", metrics.render());
    }

    Ok(())
}
