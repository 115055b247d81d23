//! CLI entry point for the loanrisk training step.
//!
//! Subcommands:
//!   fit     -- Fit preprocessing + logistic regression on a loan dataset
//!   sample  -- Fit a synthetic age/salary model for smoke tests

use anyhow::Context;
use clap::{Parser, Subcommand};
use loanrisk_model::{save_classifier, save_descriptor, ClassifierArtifact};
use loanrisk_train::{
    save_outcome, train, train_sample, ColumnRoles, Dataset, FitOptions, SampleConfig,
    TrainConfig,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "train-model", about = "Loan default model training")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fit the model on a JSON or JSON Lines loan dataset.
    Fit {
        /// Path to the dataset.
        #[arg(long)]
        dataset: PathBuf,

        /// Output path for the classifier artifact.
        #[arg(long, default_value = "model.json")]
        model_out: PathBuf,

        /// Output path for the preprocessing descriptor.
        #[arg(long, default_value = "preprocessing.json")]
        descriptor_out: PathBuf,

        /// Binary target column.
        #[arg(long, default_value = "EverDelinquent")]
        target: String,

        /// Held-out fraction.
        #[arg(long, default_value = "0.2")]
        test_ratio: f64,

        /// Random seed for the split.
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Gradient descent iterations.
        #[arg(long, default_value = "1000")]
        max_iter: usize,

        /// Label-encoded columns (repeatable); defaults to the mortgage set.
        #[arg(long = "label-column")]
        label_columns: Vec<String>,

        /// One-hot columns (repeatable); defaults to the mortgage set.
        #[arg(long = "one-hot-column")]
        one_hot_columns: Vec<String>,

        /// Identifier columns to drop (repeatable).
        #[arg(long = "exclude-column", default_value = "LoanSeqNum")]
        exclude_columns: Vec<String>,
    },

    /// Fit a synthetic model with numeric `age` and `salary` features.
    Sample {
        /// Output path for the classifier artifact.
        #[arg(long, default_value = "model.json")]
        model_out: PathBuf,

        /// Output path for the preprocessing descriptor.
        #[arg(long, default_value = "preprocessing.json")]
        descriptor_out: PathBuf,

        /// Rows to generate.
        #[arg(long, default_value = "1000")]
        rows: usize,

        /// Random seed.
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Fit {
            dataset,
            model_out,
            descriptor_out,
            target,
            test_ratio,
            seed,
            max_iter,
            label_columns,
            one_hot_columns,
            exclude_columns,
        } => {
            let mut roles = ColumnRoles::default();
            if !label_columns.is_empty() {
                roles.label_columns = label_columns;
            }
            if !one_hot_columns.is_empty() {
                roles.one_hot_columns = one_hot_columns;
            }
            let config = TrainConfig {
                target,
                exclude_columns,
                roles,
                test_ratio,
                seed,
                fit: FitOptions {
                    max_iter,
                    ..FitOptions::default()
                },
                model_path: model_out,
                descriptor_path: descriptor_out,
            };

            let data = Dataset::load(&dataset)
                .with_context(|| format!("loading {}", dataset.display()))?;
            let outcome = train(data, &config).context("training failed")?;
            save_outcome(&outcome, &config).context("saving artifacts")?;

            println!("\nTrain: {}", outcome.train_metrics);
            println!("Test:  {}", outcome.test_metrics);
            if outcome.overfits() {
                println!("Warning: train accuracy exceeds test accuracy by more than 5 points");
            }
            println!(
                "Features: {} -> {}, {}",
                outcome.descriptor.feature_count(),
                config.model_path.display(),
                config.descriptor_path.display()
            );
        }

        Command::Sample {
            model_out,
            descriptor_out,
            rows,
            seed,
        } => {
            let (model, descriptor) = train_sample(&SampleConfig { rows, seed })?;
            save_classifier(&ClassifierArtifact::from(model), &model_out)?;
            save_descriptor(&descriptor, &descriptor_out)?;
            println!(
                "Sample model written to {} and {}",
                model_out.display(),
                descriptor_out.display()
            );
        }
    }

    Ok(())
}
