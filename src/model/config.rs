//! Run configuration persisted next to the trained model.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{DogvisionError, Result};

/// Hyperparameters and data settings for one training run. Written as a JSON
/// sidecar next to the saved weights so a run's settings travel with it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainConfig {
    /// Learning rate for the head optimizer
    pub learning_rate: f64,

    /// Batch size for all three feeders
    pub batch_size: usize,

    /// Epoch budget (the early-stopping policy may stop sooner)
    pub epochs: usize,

    /// Square image size fed to the network
    pub image_size: usize,

    /// Seed for dataset shuffling
    pub seed: u64,

    /// Number of classes, derived from the train split
    pub num_classes: usize,

    /// Class names in label order
    pub classes: Vec<String>,
}

impl TrainConfig {
    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DogvisionError::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| DogvisionError::Serialization(e.to_string()))
    }
}
