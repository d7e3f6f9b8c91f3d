//! Dataset handling: folder-per-class loading, augmentation, and batching.
//!
//! The data root holds three independent partitions (`train/`, `test/`,
//! `valid/`), each with one subdirectory per class label. The factory in
//! [`feeder`] turns them into three batch feeders sharing one class mapping.

pub mod augment;
pub mod batch;
pub mod feeder;
pub mod loader;

pub use augment::Augmenter;
pub use batch::{ImageBatch, ImageBatcher, ImageItem};
pub use feeder::{create_feeders, BatchFeeder, FeederSet, ImageDataset};
pub use loader::{ImageSample, SplitDataset};

/// Default square image size fed to the model
pub const DEFAULT_IMAGE_SIZE: usize = 224;
