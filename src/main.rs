//! Aircast CLI
//!
//! Train per-source forecasting models and serve predictions over HTTP.

use aircast::config::Config;
use aircast::core::FeatureError;
use aircast::model::{forecast, train_best, ForecastError, ModelRegistry, TrainConfig};
use aircast::reading::{load_csv, ReadingStore, Source};
use aircast::server::{run, ServerConfig};
use aircast::VERSION;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "aircast")]
#[command(version = VERSION)]
#[command(about = "SO2 concentration forecasting from windowed sensor readings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the prediction server
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Directory holding trained model artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Directory holding historical reading CSVs (<source>.csv)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Train a model for one source from a CSV of readings
    Train {
        /// Input CSV with `timestamp,value` rows
        input: PathBuf,

        /// Which source the readings belong to
        #[arg(long, value_enum)]
        source: Source,

        /// Where to write the model artifact
        #[arg(long)]
        output: Option<PathBuf>,

        /// Readings per feature window
        #[arg(long, default_value = "7")]
        window_size: usize,

        /// Readings averaged into each forecast target
        #[arg(long, default_value = "7")]
        horizon: usize,

        /// Fraction of samples held out for candidate ranking
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        /// Shuffle seed for the train/test split
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// One-shot forecast for a source from a CSV of readings
    Predict {
        /// Input CSV with `timestamp,value` rows
        input: PathBuf,

        /// Which source the readings belong to
        #[arg(long, value_enum)]
        source: Source,

        /// Directory holding trained model artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aircast=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            models_dir,
            data_dir,
        } => {
            cmd_serve(port, models_dir, data_dir).await;
        }
        Commands::Train {
            input,
            source,
            output,
            window_size,
            horizon,
            test_fraction,
            seed,
        } => {
            cmd_train(input, source, output, window_size, horizon, test_fraction, seed);
        }
        Commands::Predict {
            input,
            source,
            models_dir,
        } => {
            cmd_predict(input, source, models_dir);
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

async fn cmd_serve(port: Option<u16>, models_dir: Option<PathBuf>, data_dir: Option<PathBuf>) {
    let config = Config::load().unwrap_or_default();
    let port = port.unwrap_or(config.port);
    let models_dir = models_dir.unwrap_or(config.models_dir.clone());
    let data_dir = data_dir.unwrap_or(config.data_dir.clone());

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("Aircast v{VERSION}");
    println!("  Models: {models_dir:?}");
    println!("  Data: {data_dir:?}");

    // Preload whatever history is on disk, one CSV per source.
    let store = Arc::new(ReadingStore::new());
    for source in Source::ALL {
        let path = data_dir.join(format!("{source}.csv"));
        if !path.exists() {
            continue;
        }
        match load_csv(&path, source) {
            Ok(readings) => {
                let count = store.insert_many(readings);
                println!("  Loaded {count} {source} readings from {path:?}");
            }
            Err(e) => {
                eprintln!("Warning: Could not load {path:?}: {e}");
            }
        }
    }

    let server_config = ServerConfig::new(port, models_dir);
    let (addr, shutdown_tx) = match run(server_config, store).await {
        Ok(handles) => handles,
        Err(e) => {
            eprintln!("Error starting server: {e}");
            std::process::exit(1);
        }
    };

    println!("Listening on http://{addr}");
    println!("Press Ctrl+C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Error waiting for shutdown signal: {e}");
    }

    println!();
    println!("Shutting down...");
    let _ = shutdown_tx.send(());
}

fn cmd_train(
    input: PathBuf,
    source: Source,
    output: Option<PathBuf>,
    window_size: usize,
    horizon: usize,
    test_fraction: f64,
    seed: u64,
) {
    let config = Config::load().unwrap_or_default();
    let output = output.unwrap_or(config.models_dir.clone());

    let readings = match load_csv(&input, source) {
        Ok(readings) => readings,
        Err(e) => {
            eprintln!("Error loading {input:?}: {e}");
            std::process::exit(1);
        }
    };
    println!("Loaded {} {} readings from {:?}", readings.len(), source, input);

    let train_config = TrainConfig {
        window_size,
        horizon,
        test_fraction,
        seed,
    };

    let outcome = match train_best(source, &readings, &train_config) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error training model: {e}");
            std::process::exit(1);
        }
    };

    println!();
    println!("Candidates:");
    for report in &outcome.reports {
        println!(
            "  {:<8} mae={:.4}  rmse={:.4}  r2={:.4}",
            report.name, report.mae, report.rmse, report.r2
        );
    }
    println!();
    println!(
        "Selected: {} ({} training samples)",
        outcome.artifact.model_name, outcome.artifact.training_samples
    );

    match outcome.artifact.save(&output) {
        Ok(path) => println!("Saved model artifact to {path:?}"),
        Err(e) => {
            eprintln!("Error saving artifact: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_predict(input: PathBuf, source: Source, models_dir: Option<PathBuf>) {
    let config = Config::load().unwrap_or_default();
    let models_dir = models_dir.unwrap_or(config.models_dir.clone());

    let readings = match load_csv(&input, source) {
        Ok(readings) => readings,
        Err(e) => {
            eprintln!("Error loading {input:?}: {e}");
            std::process::exit(1);
        }
    };

    let registry = ModelRegistry::open(models_dir);
    let store = ReadingStore::new();
    store.insert_many(readings);

    match forecast(&registry, &store, source) {
        Ok(result) => {
            println!("Source: {}", result.source);
            println!("Model: {}", result.model_name);
            println!(
                "Predicted mean over next {} readings: {:.4}",
                result.horizon, result.prediction
            );
            println!("Confidence: {:.2}", result.confidence);
        }
        Err(ForecastError::NoModel(source)) => {
            eprintln!("No trained model for source '{source}'.");
            eprintln!("Run `aircast train <csv> --source {source}` first.");
            std::process::exit(1);
        }
        Err(ForecastError::Feature(FeatureError::InsufficientData { needed, available })) => {
            eprintln!("Not enough readings to forecast: have {available}, need {needed}.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error computing forecast: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}
