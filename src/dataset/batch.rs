//! Item and batch types for feeding images into the model.
//!
//! An [`ImageItem`] is one decoded, preprocessed image in CHW float layout;
//! the [`ImageBatcher`] stacks items into a normalized tensor batch.

use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use image::imageops::FilterType;
use image::ImageReader;

use crate::dataset::augment::Augmenter;
use crate::utils::error::{DogvisionError, Result};

/// ImageNet channel means, applied by the batcher.
const NORM_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations, applied by the batcher.
const NORM_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A single image ready for batching
#[derive(Clone, Debug)]
pub struct ImageItem {
    /// Image data as flattened CHW float array [3 * H * W], scaled to [0, 1]
    pub image: Vec<f32>,
    /// Class label index
    pub label: usize,
    /// Source path (for debugging/logging)
    pub path: String,
}

impl ImageItem {
    /// Load an image from disk: decode, optionally augment, resize to a
    /// square of `image_size`, and convert to CHW floats.
    pub fn load(
        path: &Path,
        label: usize,
        image_size: usize,
        augment: Option<&Augmenter>,
    ) -> Result<Self> {
        let img = ImageReader::open(path)
            .map_err(|e| DogvisionError::ImageLoad(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| DogvisionError::ImageLoad(path.to_path_buf(), e.to_string()))?;

        let img = match augment {
            Some(augmenter) => augmenter.apply(img),
            None => img,
        };

        let rgb = img
            .resize_exact(image_size as u32, image_size as u32, FilterType::Triangle)
            .to_rgb8();

        let (width, height) = (image_size, image_size);
        let mut image = vec![0.0f32; 3 * height * width];
        for y in 0..height {
            for x in 0..width {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                image[y * width + x] = pixel[0] as f32 / 255.0;
                image[height * width + y * width + x] = pixel[1] as f32 / 255.0;
                image[2 * height * width + y * width + x] = pixel[2] as f32 / 255.0;
            }
        }

        Ok(Self {
            image,
            label,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Create from pre-loaded CHW data
    pub fn from_data(image: Vec<f32>, label: usize, path: String) -> Self {
        Self { image, label, path }
    }
}

/// A batch of images and integer class targets
#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    /// Number of samples in the batch
    pub fn size(&self) -> usize {
        self.targets.dims()[0]
    }
}

/// Stacks [`ImageItem`]s into an [`ImageBatch`], applying ImageNet
/// channel normalization.
#[derive(Clone, Debug)]
pub struct ImageBatcher {
    image_size: usize,
}

impl ImageBatcher {
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let channels = 3;
        let height = self.image_size;
        let width = self.image_size;

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, height, width]),
            device,
        );

        let mean = Tensor::<B, 4>::from_floats(
            TensorData::new(NORM_MEAN.to_vec(), [1, 3, 1, 1]),
            device,
        );
        let std = Tensor::<B, 4>::from_floats(
            TensorData::new(NORM_STD.to_vec(), [1, 3, 1, 1]),
            device,
        );
        let images = (images - mean) / std;

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        ImageBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;

    type B = DefaultBackend;

    fn item(value: f32, label: usize, size: usize) -> ImageItem {
        ImageItem::from_data(vec![value; 3 * size * size], label, "test.jpg".to_string())
    }

    #[test]
    fn test_item_from_data() {
        let item = item(0.5, 5, 4);
        assert_eq!(item.label, 5);
        assert_eq!(item.image.len(), 3 * 4 * 4);
    }

    #[test]
    fn test_batch_shapes() {
        let device = Default::default();
        let batcher = ImageBatcher::new(4);
        let batch: ImageBatch<B> =
            batcher.batch(vec![item(0.0, 0, 4), item(1.0, 2, 4)], &device);

        assert_eq!(batch.images.dims(), [2, 3, 4, 4]);
        assert_eq!(batch.targets.dims(), [2]);
        assert_eq!(batch.size(), 2);
    }

    #[test]
    fn test_batch_normalization() {
        let device = Default::default();
        let batcher = ImageBatcher::new(2);
        let batch: ImageBatch<B> = batcher.batch(vec![item(0.5, 0, 2)], &device);

        let data = batch.images.into_data().to_vec::<f32>().unwrap();
        // Channel 0 pixels: (0.5 - 0.485) / 0.229
        let expected = (0.5 - NORM_MEAN[0]) / NORM_STD[0];
        assert!((data[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_load_with_augmentation_keeps_shape() {
        let path = std::env::temp_dir().join(format!("dogvision_aug_{}.png", std::process::id()));
        image::RgbImage::from_pixel(10, 7, image::Rgb([90, 140, 40]))
            .save(&path)
            .unwrap();

        // The random crop runs before the square resize, so the loaded
        // buffer always has the full CHW extent regardless of the region.
        let item = ImageItem::load(&path, 1, 6, Some(&Augmenter::default())).unwrap();
        assert_eq!(item.image.len(), 3 * 6 * 6);
        assert!(item.image.iter().all(|v| (0.0..=1.0).contains(v)));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_batch_targets() {
        let device = Default::default();
        let batcher = ImageBatcher::new(2);
        let batch: ImageBatch<B> =
            batcher.batch(vec![item(0.0, 3, 2), item(0.0, 1, 2)], &device);

        let targets = batch.targets.into_data().to_vec::<i64>().unwrap();
        assert_eq!(targets, vec![3, 1]);
    }
}
