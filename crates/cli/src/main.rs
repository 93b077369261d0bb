//! AgroClim Command Line Interface
//!
//! Runs the yield pipeline end to end, or one stage at a time against a
//! saved model artifact.

use agroclim_core::{
    tables, AgroError, CancellationToken, HistoricalRecord, ModelArtifact, PipelineConfig,
    StageDeadline,
};
use agroclim_projection::{
    climate_coefficients, summarize_by_scenario, ChangeQuantifier, ScenarioForecaster,
    IMPACT_FILE,
};
use agroclim_trainer::{importance, ModelTrainer, TrainingOutcome};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PREDICTIONS_FILE: &str = "future_predictions.csv";
const CHANGES_FILE: &str = "yield_change_projections.csv";

#[derive(Parser)]
#[command(name = "agroclim")]
#[command(about = "Crop yield projections under climate scenarios", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and write per-crop climate coefficients
    Train(PathArgs),
    /// Train, forecast and quantify change in one run
    Run(PathArgs),
    /// Forecast scenarios and quantify change with a saved model
    Forecast(PathArgs),
    /// Print the ranked feature importances of a saved model
    Rank {
        /// Model directory (overrides config)
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct PathArgs {
    /// Merged historical CSV
    #[arg(long)]
    historical: Option<PathBuf>,

    /// Future scenario climate CSV
    #[arg(long)]
    future_climate: Option<PathBuf>,

    /// Model directory
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Output directory for prediction, change and coefficient tables
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Crops to project (repeatable; overrides config)
    #[arg(long = "crop")]
    crops: Vec<String>,
}

impl PathArgs {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(path) = self.historical {
            config.paths.historical = path;
        }
        if let Some(path) = self.future_climate {
            config.paths.future_climate = path;
        }
        if let Some(path) = self.model_dir {
            config.paths.model_dir = path;
        }
        if let Some(path) = self.output_dir {
            config.paths.output_dir = path;
        }
        if !self.crops.is_empty() {
            config.projection.crops = self.crops;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let token = CancellationToken::new();
    match cli.command {
        Commands::Train(paths) => {
            paths.apply(&mut config);
            config.validate().context("Invalid configuration")?;
            handle_train(&config, &token).map(|_| ())
        }
        Commands::Run(paths) => {
            paths.apply(&mut config);
            config.validate().context("Invalid configuration")?;
            handle_run(&config, &token)
        }
        Commands::Forecast(paths) => {
            paths.apply(&mut config);
            config.validate().context("Invalid configuration")?;
            handle_forecast(&config, &token)
        }
        Commands::Rank { model_dir, json } => {
            if let Some(dir) = model_dir {
                config.paths.model_dir = dir;
            }
            handle_rank(&config.paths.model_dir, json)
        }
    }
}

fn handle_train(
    config: &PipelineConfig,
    token: &CancellationToken,
) -> Result<(TrainingOutcome, Vec<HistoricalRecord>)> {
    info!("Loading historical data from {}", config.paths.historical.display());
    let historical = tables::read_historical(&config.paths.historical)
        .context("Failed to read historical data")?;
    info!("Loaded {} historical records", historical.len());

    let deadline = StageDeadline::start(
        "training",
        config.limits.training_budget(),
        token.clone(),
    );
    let outcome = ModelTrainer::new(config.training.clone())
        .train(&historical, &deadline)
        .context("Training failed")?;
    let hash = outcome
        .save(&config.paths.model_dir)
        .context("Failed to write training outputs")?;
    info!("Model saved with hash {}", hash);

    let impact = climate_coefficients(&historical);
    let impact_path = config.paths.output_dir.join(IMPACT_FILE);
    tables::write_csv(&impact_path, &impact.coefficients)
        .context("Failed to write climate impact coefficients")?;
    info!(
        "Wrote {} coefficient rows to {} ({} crops skipped)",
        impact.coefficients.len(),
        impact_path.display(),
        impact.skipped.len()
    );

    Ok((outcome, historical))
}

fn handle_run(config: &PipelineConfig, token: &CancellationToken) -> Result<()> {
    // Fail on missing inputs before spending time on training
    for path in [&config.paths.historical, &config.paths.future_climate] {
        if !path.exists() {
            return Err(AgroError::MissingInput { path: path.clone() }.into());
        }
    }

    let (outcome, historical) = handle_train(config, token)?;
    project(config, &outcome.artifact, &historical, token)
}

fn handle_forecast(config: &PipelineConfig, token: &CancellationToken) -> Result<()> {
    let path = TrainingOutcome::model_path(&config.paths.model_dir);
    let artifact: ModelArtifact = ModelArtifact::load(&path)
        .with_context(|| format!("Failed to load model {}", path.display()))?;
    let historical = tables::read_historical(&config.paths.historical)
        .context("Failed to read historical data")?;

    project(config, &artifact, &historical, token)
}

fn project(
    config: &PipelineConfig,
    artifact: &ModelArtifact,
    historical: &[HistoricalRecord],
    token: &CancellationToken,
) -> Result<()> {
    let future = tables::read_scenarios(&config.paths.future_climate)
        .context("Failed to read future climate")?;
    info!("Loaded {} scenario climate rows", future.len());

    let deadline = StageDeadline::start(
        "forecast",
        config.limits.forecast_budget(),
        token.clone(),
    );
    let predictions = ScenarioForecaster::new(artifact, &config.projection.crops)?
        .forecast(&future, &deadline)
        .context("Forecast failed")?;

    let report =
        ChangeQuantifier::from_config(&config.projection).quantify(historical, &predictions);

    let out = &config.paths.output_dir;
    tables::write_csv(&out.join(PREDICTIONS_FILE), &predictions)
        .context("Failed to write predictions")?;
    tables::write_csv(&out.join(CHANGES_FILE), &report.records)
        .context("Failed to write yield changes")?;
    info!("Wrote {} and {} to {}", PREDICTIONS_FILE, CHANGES_FILE, out.display());

    info!(
        "Projected yield changes ({}+ vs {}+):",
        config.projection.future_from, config.projection.baseline_from
    );
    for summary in summarize_by_scenario(&report.records) {
        info!(
            "  {}: average {:.2}%, range {:.2}% to {:.2}% ({} state/crop pairs)",
            summary.scenario,
            summary.mean_change,
            summary.min_change,
            summary.max_change,
            summary.records
        );
    }

    Ok(())
}

fn handle_rank(model_dir: &Path, json: bool) -> Result<()> {
    let path = TrainingOutcome::model_path(model_dir);
    let artifact: ModelArtifact = ModelArtifact::load(&path)
        .with_context(|| format!("Failed to load model {}", path.display()))?;
    let ranked = importance::rank(&artifact.model)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else {
        for (position, row) in ranked.iter().enumerate() {
            println!("{:>2}. {:<28} {:.4}", position + 1, row.feature, row.importance);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agroclim_core::{Hyperparameters, TrainingConfig};
    use agroclim_projection::ImpactCoefficient;
    use tempfile::TempDir;

    fn history() -> Vec<HistoricalRecord> {
        let mut records = Vec::new();
        for year in 1995..2015 {
            for (s, state) in ["Bihar", "Punjab"].iter().enumerate() {
                for crop in ["Rice", "Wheat"] {
                    let rainfall = 600.0 + 30.0 * ((year * 7 + s as i32 * 5) % 13) as f64;
                    let temp = 23.0 + 0.3 * ((year * 3 + s as i32) % 9) as f64;
                    let yield_t = 1.0 + 0.002 * rainfall - 0.05 * temp;
                    records.push(HistoricalRecord {
                        year,
                        state: state.to_string(),
                        crop: crop.to_string(),
                        area_ha: 100.0,
                        production_ton: yield_t * 100.0,
                        yield_ton_per_ha: yield_t,
                        rainfall_mm: rainfall,
                        avg_temp_c: temp,
                        max_temp_c: temp + 7.0,
                        min_temp_c: temp - 7.0,
                        rainfall_deviation: 0.0,
                        temp_deviation: 0.0,
                        decade: year / 10 * 10,
                    });
                }
            }
        }
        records
    }

    #[test]
    fn test_train_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "agroclim",
            "train",
            "--historical",
            "merged.csv",
            "--model-dir",
            "models",
        ])
        .unwrap();

        let mut config = PipelineConfig::default();
        match cli.command {
            Commands::Train(paths) => paths.apply(&mut config),
            _ => panic!("expected the train subcommand"),
        }
        assert_eq!(config.paths.historical, PathBuf::from("merged.csv"));
        assert_eq!(config.paths.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn test_train_writes_model_and_coefficients() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::default();
        config.paths.historical = dir.path().join("merged.csv");
        config.paths.model_dir = dir.path().join("models");
        config.paths.output_dir = dir.path().join("out");
        config.training = TrainingConfig {
            hyperparameters: Hyperparameters {
                ensemble_size: 4,
                max_depth: 4,
                min_samples_to_split: 4,
                min_samples_per_leaf: 2,
                seed: 7,
            },
            holdout_fraction: 0.2,
            cv_folds: 3,
        };
        tables::write_csv(&config.paths.historical, &history()).unwrap();

        let (outcome, historical) = handle_train(&config, &CancellationToken::new()).unwrap();
        assert_eq!(historical.len(), 80);

        let saved: ModelArtifact =
            ModelArtifact::load(&TrainingOutcome::model_path(&config.paths.model_dir)).unwrap();
        assert_eq!(saved.hash_hex().unwrap(), outcome.artifact.hash_hex().unwrap());

        let coefficients: Vec<ImpactCoefficient> =
            tables::read_csv(&config.paths.output_dir.join(IMPACT_FILE)).unwrap();
        let crops: Vec<&str> = coefficients.iter().map(|c| c.crop.as_str()).collect();
        assert_eq!(crops, vec!["Rice", "Wheat"]);
        assert!(coefficients
            .iter()
            .all(|c| (c.rainfall_coefficient - 0.002).abs() < 1e-9));
    }
}
