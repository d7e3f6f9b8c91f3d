//! Dataset loader for the `train/` / `test/` / `valid/` directory layout.
//!
//! The data root must contain exactly those three subdirectories, each
//! organized folder-per-class:
//!
//! ```text
//! root/
//! ├── train/
//! │   ├── affenpinscher/
//! │   │   ├── img_001.jpg
//! │   │   └── ...
//! │   └── beagle/
//! ├── test/
//! └── valid/
//! ```
//!
//! The class list comes from the train split and is shared by all three, so
//! label indices agree across partitions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::utils::error::{DogvisionError, Result};

/// File extensions treated as images
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// A single image file with its label and metadata
#[derive(Debug, Clone)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Class name (directory name)
    pub class_name: String,
}

/// The three partitions of a folder-per-class image dataset
#[derive(Debug)]
pub struct SplitDataset {
    /// Root directory of the dataset
    pub root: PathBuf,
    /// Sorted class names, taken from the train split
    pub classes: Vec<String>,
    /// Mapping from class name to label index
    pub class_to_idx: HashMap<String, usize>,
    /// Samples in the train split
    pub train: Vec<ImageSample>,
    /// Samples in the test split
    pub test: Vec<ImageSample>,
    /// Samples in the valid split
    pub valid: Vec<ImageSample>,
}

impl SplitDataset {
    /// Scan the dataset root. Fails if any of the three split directories is
    /// missing; unreadable or non-image files are skipped, not errors.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        info!("Loading dataset from: {:?}", root);

        if !root.exists() {
            return Err(DogvisionError::PathNotFound(root));
        }
        for split in ["train", "test", "valid"] {
            let dir = root.join(split);
            if !dir.is_dir() {
                return Err(DogvisionError::Dataset(format!(
                    "missing '{}' directory under {:?}",
                    split, root
                )));
            }
        }

        let mut classes: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(root.join("train"))? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    classes.push(name.to_string());
                }
            }
        }
        classes.sort();

        if classes.is_empty() {
            return Err(DogvisionError::Dataset(format!(
                "no class directories found under {:?}",
                root.join("train")
            )));
        }
        info!("Found {} classes", classes.len());

        let class_to_idx: HashMap<String, usize> = classes
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        let train = scan_split(&root.join("train"), &class_to_idx)?;
        let test = scan_split(&root.join("test"), &class_to_idx)?;
        let valid = scan_split(&root.join("valid"), &class_to_idx)?;

        info!(
            "Loaded {} train / {} test / {} valid samples",
            train.len(),
            test.len(),
            valid.len()
        );

        Ok(Self {
            root,
            classes,
            class_to_idx,
            train,
            test,
            valid,
        })
    }

    /// Number of classes in the dataset
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Shuffle every split in place with a seeded generator.
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.train.shuffle(&mut rng);
        self.test.shuffle(&mut rng);
        self.valid.shuffle(&mut rng);
    }

    /// Log a per-split, per-class summary of the dataset.
    pub fn log_stats(&self) {
        info!(
            "Dataset: {} classes, {} train / {} test / {} valid samples",
            self.num_classes(),
            self.train.len(),
            self.test.len(),
            self.valid.len()
        );
        for (idx, name) in self.classes.iter().enumerate() {
            let count = self.train.iter().filter(|s| s.label == idx).count();
            debug!("  {:3}. {:30} {:5} train samples", idx, name, count);
        }
    }
}

/// Collect image samples from one split directory.
fn scan_split(dir: &Path, class_to_idx: &HashMap<String, usize>) -> Result<Vec<ImageSample>> {
    let mut samples = Vec::new();

    let mut class_dirs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    class_dirs.sort();

    for class_dir in class_dirs {
        let class_name = match class_dir.file_name().and_then(|s| s.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        let Some(&label) = class_to_idx.get(&class_name) else {
            warn!(
                "Class '{}' in {:?} is not present in the train split, skipping",
                class_name, dir
            );
            continue;
        };

        for entry in WalkDir::new(&class_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path().to_path_buf();
            if !path.is_file() {
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                    samples.push(ImageSample {
                        path,
                        label,
                        class_name: class_name.clone(),
                    });
                }
            }
        }
    }

    Ok(samples)
}
