//! Batch feeders: ordered, restartable, finite sequences of image batches.
//!
//! Each partition (train/test/valid) gets its own independent feeder. The
//! train feeder lives on the autodiff backend and applies augmentation; the
//! test and valid feeders live on the inner backend with resize-only
//! preprocessing.

use std::path::{Path, PathBuf};

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use tracing::warn;

use crate::dataset::augment::Augmenter;
use crate::dataset::batch::{ImageBatch, ImageBatcher, ImageItem};
use crate::dataset::loader::SplitDataset;
use crate::utils::error::Result;

/// One partition's samples, loaded lazily from disk or held in memory.
///
/// Undecodable files yield `None` from [`Dataset::get`]; the feeder skips
/// them instead of failing the run.
#[derive(Debug, Clone, Default)]
pub struct ImageDataset {
    samples: Vec<(PathBuf, usize)>,
    image_size: usize,
    augment: Option<Augmenter>,
    cached: Option<Vec<ImageItem>>,
}

impl ImageDataset {
    /// Lazily loading dataset over (path, label) samples.
    pub fn new(samples: Vec<(PathBuf, usize)>, image_size: usize) -> Self {
        Self {
            samples,
            image_size,
            augment: None,
            cached: None,
        }
    }

    /// Apply randomized augmentation on every load (training split only).
    pub fn with_augmenter(mut self, augmenter: Augmenter) -> Self {
        self.augment = Some(augmenter);
        self
    }

    /// In-memory dataset over pre-built items.
    pub fn from_items(items: Vec<ImageItem>) -> Self {
        Self {
            samples: Vec::new(),
            image_size: 0,
            augment: None,
            cached: Some(items),
        }
    }
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        if let Some(ref cached) = self.cached {
            return cached.get(index).cloned();
        }

        let (path, label) = self.samples.get(index)?;
        match ImageItem::load(path, *label, self.image_size, self.augment.as_ref()) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping unreadable image: {}", e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        match &self.cached {
            Some(items) => items.len(),
            None => self.samples.len(),
        }
    }
}

/// An ordered, restartable, finite sequence of image batches on one device.
#[derive(Debug, Clone)]
pub struct BatchFeeder<B: Backend> {
    dataset: ImageDataset,
    batcher: ImageBatcher,
    batch_size: usize,
    device: B::Device,
}

impl<B: Backend> BatchFeeder<B> {
    pub fn new(
        dataset: ImageDataset,
        batch_size: usize,
        image_size: usize,
        device: B::Device,
    ) -> Self {
        Self {
            dataset,
            batcher: ImageBatcher::new(image_size),
            batch_size,
            device,
        }
    }

    /// Number of samples in the underlying dataset
    pub fn num_samples(&self) -> usize {
        self.dataset.len()
    }

    /// Number of batches one full pass yields
    pub fn num_batches(&self) -> usize {
        let len = self.dataset.len();
        if len == 0 {
            0
        } else {
            (len + self.batch_size - 1) / self.batch_size
        }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// One full ordered pass over the partition. Calling this again restarts
    /// from the beginning; batches whose every item failed to load are
    /// dropped.
    pub fn batches(&self) -> impl Iterator<Item = ImageBatch<B>> + '_ {
        let len = self.dataset.len();
        (0..len).step_by(self.batch_size.max(1)).filter_map(move |start| {
            let end = (start + self.batch_size).min(len);
            let items: Vec<ImageItem> = (start..end).filter_map(|i| self.dataset.get(i)).collect();
            if items.is_empty() {
                None
            } else {
                Some(self.batcher.batch(items, &self.device))
            }
        })
    }
}

/// The three feeders produced by the data factory, plus the class metadata
/// the model factory needs.
pub struct FeederSet<B: AutodiffBackend> {
    pub train: BatchFeeder<B>,
    pub test: BatchFeeder<B::InnerBackend>,
    pub valid: BatchFeeder<B::InnerBackend>,
    pub classes: Vec<String>,
}

impl<B: AutodiffBackend> FeederSet<B> {
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }
}

/// Build the train/test/valid feeders from a dataset root.
///
/// The train feeder reads the `train/` split with randomized augmentation;
/// test and valid read their own splits with the deterministic resize only.
/// All three are shuffled once with the given seed.
pub fn create_feeders<B: AutodiffBackend>(
    data_dir: &Path,
    batch_size: usize,
    image_size: usize,
    seed: u64,
    device: &B::Device,
) -> Result<FeederSet<B>> {
    let mut dataset = SplitDataset::open(data_dir)?;
    dataset.log_stats();
    dataset.shuffle(seed);

    let to_samples = |samples: &[crate::dataset::loader::ImageSample]| {
        samples
            .iter()
            .map(|s| (s.path.clone(), s.label))
            .collect::<Vec<_>>()
    };

    let train_dataset = ImageDataset::new(to_samples(&dataset.train), image_size)
        .with_augmenter(Augmenter::default());
    let test_dataset = ImageDataset::new(to_samples(&dataset.test), image_size);
    let valid_dataset = ImageDataset::new(to_samples(&dataset.valid), image_size);

    let inner_device = <B::InnerBackend as Backend>::Device::default();

    Ok(FeederSet {
        train: BatchFeeder::new(train_dataset, batch_size, image_size, device.clone()),
        test: BatchFeeder::new(test_dataset, batch_size, image_size, inner_device.clone()),
        valid: BatchFeeder::new(valid_dataset, batch_size, image_size, inner_device),
        classes: dataset.classes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;

    type B = DefaultBackend;

    fn items(count: usize, size: usize) -> Vec<ImageItem> {
        (0..count)
            .map(|i| {
                ImageItem::from_data(
                    vec![i as f32 / count as f32; 3 * size * size],
                    i % 3,
                    format!("item_{}.jpg", i),
                )
            })
            .collect()
    }

    #[test]
    fn test_batch_count_rounds_up() {
        let feeder: BatchFeeder<B> =
            BatchFeeder::new(ImageDataset::from_items(items(5, 2)), 2, 2, Default::default());

        assert_eq!(feeder.num_samples(), 5);
        assert_eq!(feeder.num_batches(), 3);
        assert_eq!(feeder.batches().count(), 3);

        let sizes: Vec<usize> = feeder.batches().map(|b| b.size()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_feeder_is_restartable() {
        let feeder: BatchFeeder<B> =
            BatchFeeder::new(ImageDataset::from_items(items(4, 2)), 2, 2, Default::default());

        // Two full passes over the same feeder (the validation reporting pass
        // re-iterates the feeder after the metrics pass).
        let first: Vec<Vec<i64>> = feeder
            .batches()
            .map(|b| b.targets.into_data().to_vec().unwrap())
            .collect();
        let second: Vec<Vec<i64>> = feeder
            .batches()
            .map(|b| b.targets.into_data().to_vec().unwrap())
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_feeder() {
        let feeder: BatchFeeder<B> =
            BatchFeeder::new(ImageDataset::from_items(Vec::new()), 4, 2, Default::default());
        assert_eq!(feeder.num_batches(), 0);
        assert_eq!(feeder.batches().count(), 0);
    }

    #[test]
    fn test_unreadable_images_are_skipped() {
        // A dataset pointing at files that do not exist: every get() fails,
        // the feeder yields no batches, and nothing panics.
        let dataset = ImageDataset::new(
            vec![(PathBuf::from("/nonexistent/a.jpg"), 0), (PathBuf::from("/nonexistent/b.jpg"), 1)],
            4,
        );
        assert_eq!(dataset.len(), 2);
        assert!(dataset.get(0).is_none());

        let feeder: BatchFeeder<B> = BatchFeeder::new(dataset, 2, 4, Default::default());
        assert_eq!(feeder.batches().count(), 0);
    }

    #[test]
    fn test_truncated_image_tolerated() {
        // A garbage file with an image extension is listed by the loader but
        // skipped at decode time; the remaining images still batch.
        let root = crate::dataset::loader::tests::fixture_root("truncated", &["beagle"], 2);
        std::fs::write(root.join("train").join("beagle").join("broken.jpg"), b"not an image")
            .unwrap();

        let feeders: FeederSet<crate::backend::TrainingBackend> =
            create_feeders(&root, 4, 6, 42, &Default::default()).unwrap();

        assert_eq!(feeders.train.num_samples(), 3);
        let total: usize = feeders.train.batches().map(|b| b.size()).sum();
        assert_eq!(total, 2);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_create_feeders_partitions() {
        let root = crate::dataset::loader::tests::fixture_root("feeders", &["a", "b"], 2);
        let feeders: FeederSet<crate::backend::TrainingBackend> =
            create_feeders(&root, 2, 6, 7, &Default::default()).unwrap();

        assert_eq!(feeders.num_classes(), 2);
        assert_eq!(feeders.train.num_samples(), 4);
        assert_eq!(feeders.test.num_samples(), 4);
        assert_eq!(feeders.valid.num_samples(), 4);

        let _ = std::fs::remove_dir_all(&root);
    }
}
