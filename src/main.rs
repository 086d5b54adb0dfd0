//! AI Security IDS - command line entry point
//!
//! `train` fits the pipeline and model on a 43-column CSV and writes the
//! model artifact plus the evaluation payload; `predict` scores a CSV with a
//! saved artifact.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ai_security_ids::constants::{APP_NAME, APP_VERSION};
use ai_security_ids::logic::config::TrainingConfig;
use ai_security_ids::logic::dataset::reader::read_csv;
use ai_security_ids::logic::features::VocabularyScope;
use ai_security_ids::logic::model::{default_artifact_path, InferenceEngine, ModelArtifact, Predictor};
use ai_security_ids::logic::training::run_training;

#[derive(Parser)]
#[command(name = "ai-security-ids")]
#[command(about = "Hybrid dual-path network intrusion classifier", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on a connection table and evaluate on a held-out split
    Train {
        /// CSV with the 43 connection columns
        #[arg(short, long)]
        data: PathBuf,

        /// First row is a header
        #[arg(long)]
        header: bool,

        /// Directory for model.json and report.json
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Override the epoch count
        #[arg(long)]
        epochs: Option<usize>,

        /// Fit categorical vocabularies on the training split only
        #[arg(long)]
        strict_vocabulary: bool,
    },

    /// Score records with a saved model artifact
    Predict {
        /// Model artifact (JSON)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// CSV with the 43 connection columns
        #[arg(short, long)]
        data: PathBuf,

        /// First row is a header
        #[arg(long)]
        header: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let cli = Cli::parse();
    match cli.command {
        Commands::Train {
            data,
            header,
            output_dir,
            epochs,
            strict_vocabulary,
        } => {
            let mut config = TrainingConfig::from_env();
            if let Some(epochs) = epochs {
                config.epochs = epochs;
            }
            if strict_vocabulary {
                config.vocabulary = VocabularyScope::TrainingOnly;
            }

            let records = read_csv(&data, header).with_context(|| format!("reading {}", data.display()))?;
            let outcome = run_training(&records, &config).context("training failed")?;

            let dir = output_dir.unwrap_or_else(|| {
                default_artifact_path()
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."))
            });
            outcome.artifact()?.save(&dir.join("model.json"))?;
            outcome.report.save(&dir.join("report.json"))?;

            println!("{}", outcome.report.classification_report);
            println!("Confusion matrix: {:?}", outcome.report.confusion_matrix.matrix);
            println!("ROC AUC: {:.4}", outcome.report.roc.auc);
        }
        Commands::Predict { model, data, header } => {
            let path = model.unwrap_or_else(default_artifact_path);
            let artifact = ModelArtifact::load(&path).with_context(|| format!("loading {}", path.display()))?;
            let predictor = Predictor::from_artifact(artifact)?;

            let records = read_csv(&data, header).with_context(|| format!("reading {}", data.display()))?;
            let results = predictor.predict_records(&records)?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}
