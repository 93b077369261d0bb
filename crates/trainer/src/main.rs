//! AgroClim yield model trainer CLI
//!
//! Fits the random forest yield model on the merged historical table and
//! writes the artifact, metrics and importance table.

use agroclim_core::{CancellationToken, PipelineConfig, StageDeadline};
use agroclim_trainer::{importance, train_from_csv};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "yield-train")]
#[command(author = "AgroClim Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the crop yield random forest on historical climate data", long_about = None)]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Merged historical CSV (overrides config)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory for model, hash, metrics and importances
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of trees
    #[arg(long)]
    trees: Option<usize>,

    /// Maximum tree depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples required to split a node
    #[arg(long)]
    min_samples_split: Option<usize>,

    /// Minimum samples per leaf
    #[arg(long)]
    min_samples_leaf: Option<usize>,

    /// Seed for the split, folds and bootstraps
    #[arg(long)]
    seed: Option<u64>,

    /// Holdout fraction for the test partition
    #[arg(long)]
    holdout: Option<f64>,

    /// Cross-validation folds
    #[arg(long)]
    folds: Option<usize>,

    /// Training time budget in seconds
    #[arg(long)]
    time_limit: Option<u64>,

    /// Print the metrics report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("AgroClim Yield Trainer v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(input) = args.input {
        config.paths.historical = input;
    }
    if let Some(output) = args.output {
        config.paths.model_dir = output;
    }
    let params = &mut config.training.hyperparameters;
    if let Some(trees) = args.trees {
        params.ensemble_size = trees;
    }
    if let Some(depth) = args.max_depth {
        params.max_depth = depth;
    }
    if let Some(min_split) = args.min_samples_split {
        params.min_samples_to_split = min_split;
    }
    if let Some(min_leaf) = args.min_samples_leaf {
        params.min_samples_per_leaf = min_leaf;
    }
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    if let Some(holdout) = args.holdout {
        config.training.holdout_fraction = holdout;
    }
    if let Some(folds) = args.folds {
        config.training.cv_folds = folds;
    }
    if let Some(secs) = args.time_limit {
        config.limits.training_secs = Some(secs);
    }
    config.validate().context("Invalid configuration")?;

    info!("Training configuration:");
    info!("  Trees: {}", config.training.hyperparameters.ensemble_size);
    info!("  Max depth: {}", config.training.hyperparameters.max_depth);
    info!("  Seed: {}", config.training.hyperparameters.seed);
    info!("  Holdout: {}", config.training.holdout_fraction);
    info!("  CV folds: {}", config.training.cv_folds);

    let deadline = StageDeadline::start(
        "training",
        config.limits.training_secs.map(Duration::from_secs),
        CancellationToken::new(),
    );

    info!("Loading dataset from: {}", config.paths.historical.display());
    let outcome = train_from_csv(&config.paths.historical, config.training.clone(), &deadline)
        .context("Training failed")?;

    let hash = outcome
        .save(&config.paths.model_dir)
        .context("Failed to write training outputs")?;

    info!("Feature importances:");
    for row in importance::rank(&outcome.artifact.model)? {
        info!("  {:<28} {:.4}", row.feature, row.importance);
    }
    info!("Model hash: {}", hash);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome.report).context("Failed to encode report")?
        );
    }

    Ok(())
}
