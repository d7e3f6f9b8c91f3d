//! Model module: the frozen-backbone classifier and its configuration.

pub mod config;
pub mod net;

pub use config::TrainConfig;
pub use net::{Backbone, BreedClassifier, BreedClassifierConfig, ClassifierHead};
