//! Fine-tuning CLI.
//!
//! Loads the three dataset partitions, fine-tunes the classifier head for a
//! small number of epochs, evaluates once on the test split, and writes the
//! trained weights (plus a config sidecar) to the output directory.

use std::path::PathBuf;

use anyhow::Result;
use burn::module::{AutodiffModule, Module};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::AdamConfig;
use burn::record::CompactRecorder;
use clap::Parser;
use colored::Colorize;
use tracing::info;

use dogvision::backend::{backend_name, default_device, TrainingBackend};
use dogvision::dataset::{create_feeders, DEFAULT_IMAGE_SIZE};
use dogvision::model::{BreedClassifier, BreedClassifierConfig, TrainConfig};
use dogvision::training::{test, train};
use dogvision::utils::logging::{init_logging, LogConfig, RunLogger};

/// Fine-tune a frozen-backbone image classifier on a folder-per-class
/// dog image dataset and evaluate it on the held-out test split.
#[derive(Parser, Debug)]
#[command(name = "dogvision")]
#[command(version = "0.1.0")]
#[command(about = "Fine-tune and evaluate a dog image classifier", long_about = None)]
struct Cli {
    /// Learning rate for the head optimizer
    #[arg(long)]
    learning_rate: f64,

    /// Batch size for all feeders
    #[arg(long)]
    batch_size: usize,

    /// Epoch budget (early stopping may end the run sooner)
    #[arg(long)]
    epochs: usize,

    /// Dataset root containing train/, test/ and valid/ subdirectories
    #[arg(long, env = "DOG_IMAGES")]
    data: PathBuf,

    /// Directory to write the trained model and config into
    #[arg(long)]
    output_dir: PathBuf,

    /// Optional backbone weights file to initialize from
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Square image size fed to the network
    #[arg(long, default_value_t = DEFAULT_IMAGE_SIZE)]
    image_size: usize,

    /// Random seed for dataset shuffling
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let log_config = if args.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config).map_err(|e| anyhow::anyhow!(e))?;

    info!(
        "Training with learning rate: {}, batch size: {}, epochs: {}",
        args.learning_rate, args.batch_size, args.epochs
    );
    info!("Data path: {:?}", args.data);
    info!("Backend: {}", backend_name());

    let device = default_device();

    println!("{}", "Loading Dataset...".cyan());
    let feeders = create_feeders::<TrainingBackend>(
        &args.data,
        args.batch_size,
        args.image_size,
        args.seed,
        &device,
    )?;

    println!("{}", "Creating Model...".cyan());
    let model_config = BreedClassifierConfig::new(feeders.num_classes());
    let mut model = BreedClassifier::<TrainingBackend>::new(&model_config, &device);
    if let Some(weights) = &args.weights {
        info!("Initializing backbone from {:?}", weights);
        model = model.load_backbone(weights, &device)?;
    }
    let model = model.with_frozen_backbone();

    let criterion = CrossEntropyLossConfig::new();
    let mut optimizer = AdamConfig::new().init();
    let logger = RunLogger::new();

    println!("{}", "Starting Model Training".green().bold());
    let (model, summary) = train(
        model,
        &feeders.train,
        &feeders.valid,
        &criterion,
        &mut optimizer,
        args.learning_rate,
        args.epochs,
        &logger,
    );
    info!(
        "Training finished after {} epoch(s), best validation loss: {:.4}",
        summary.epochs_run, summary.best_loss
    );

    println!("{}", "Starting Model Testing".green().bold());
    test(&model.valid(), &feeders.test, &criterion, &logger);

    println!("{}", "Saving the Model".cyan());
    std::fs::create_dir_all(&args.output_dir)?;

    let recorder = CompactRecorder::new();
    model
        .save_file(args.output_dir.join("model"), &recorder)
        .map_err(|e| anyhow::anyhow!("Failed to save model: {:?}", e))?;

    let run_config = TrainConfig {
        learning_rate: args.learning_rate,
        batch_size: args.batch_size,
        epochs: args.epochs,
        image_size: args.image_size,
        seed: args.seed,
        num_classes: feeders.num_classes(),
        classes: feeders.classes.clone(),
    };
    run_config.save(&args.output_dir.join("config.json"))?;

    info!("Saved model to {:?}", args.output_dir.join("model.mpk"));
    println!("saved");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_full_flags() {
        let cli = Cli::try_parse_from([
            "dogvision",
            "--learning-rate",
            "0.001",
            "--batch-size",
            "16",
            "--epochs",
            "4",
            "--data",
            "/data/dogs",
            "--output-dir",
            "/out/models",
        ])
        .unwrap();

        assert_eq!(cli.learning_rate, 0.001);
        assert_eq!(cli.batch_size, 16);
        assert_eq!(cli.epochs, 4);
        assert_eq!(cli.image_size, DEFAULT_IMAGE_SIZE);
        assert_eq!(cli.seed, 42);
        assert!(cli.weights.is_none());
    }

    #[test]
    fn test_output_dir_is_mandatory() {
        let result = Cli::try_parse_from([
            "dogvision",
            "--learning-rate",
            "0.001",
            "--batch-size",
            "16",
            "--epochs",
            "4",
            "--data",
            "/data/dogs",
        ]);
        assert!(result.is_err());
    }
}
