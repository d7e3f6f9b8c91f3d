//! # dogvision
//!
//! Single-run fine-tuning harness for a dog image classifier built on the
//! Burn framework: load a folder-per-class dataset with `train/`, `test/`
//! and `valid/` partitions, fine-tune the trainable head of a
//! frozen-backbone CNN for a small number of epochs, evaluate once on the
//! test split, and persist the learned weights.
//!
//! ## Modules
//!
//! - `dataset`: folder-per-class loading, augmentation, batch feeders
//! - `model`: backbone + head network and run configuration
//! - `training`: the train/validation loop and the test evaluator
//! - `utils`: errors, logging, metric accumulators
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dogvision::backend::TrainingBackend;
//! use dogvision::dataset::create_feeders;
//! use dogvision::model::{BreedClassifier, BreedClassifierConfig};
//!
//! let device = Default::default();
//! let feeders = create_feeders::<TrainingBackend>(&data_dir, 32, 224, 42, &device)?;
//! let config = BreedClassifierConfig::new(feeders.num_classes());
//! let model = BreedClassifier::new(&config, &device).with_frozen_backbone();
//! // ... train and test
//! ```

pub mod backend;
pub mod dataset;
pub mod model;
pub mod training;
pub mod utils;

pub use dataset::{create_feeders, BatchFeeder, FeederSet, ImageBatch, ImageItem, SplitDataset};
pub use model::{BreedClassifier, BreedClassifierConfig, TrainConfig};
pub use training::{test, train, EvalOptions, TrainingSummary};
pub use utils::error::{DogvisionError, Result};
pub use utils::logging::{init_logging, LogConfig, RunLogger};
pub use utils::metrics::{PhaseMetrics, RunningMetrics};
