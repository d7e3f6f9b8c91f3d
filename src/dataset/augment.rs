//! Data augmentation for the training split.
//!
//! The training feeder applies randomized transforms (random-scale crop,
//! horizontal flip, grayscale, color jitter) before the deterministic
//! resize; the test and validation feeders get the resize only. The crop
//! picks a random area and aspect ratio, so the square resize that follows
//! yields a different framing of the subject on every load.

use image::DynamicImage;
use rand::Rng;

/// Area fraction range sampled by the random crop
const CROP_SCALE: (f64, f64) = (0.08, 1.0);
/// Aspect ratio range sampled by the random crop
const CROP_RATIO: (f64, f64) = (3.0 / 4.0, 4.0 / 3.0);

/// Randomized augmentation applied to training images.
#[derive(Debug, Clone)]
pub struct Augmenter {
    /// Probability of a random-scale/aspect crop
    pub crop_prob: f64,
    /// Probability of a horizontal flip
    pub flip_prob: f64,
    /// Probability of converting to grayscale
    pub grayscale_prob: f64,
    /// Probability of applying brightness/contrast/saturation/hue jitter
    pub jitter_prob: f64,
}

impl Default for Augmenter {
    fn default() -> Self {
        Self {
            crop_prob: 1.0,
            flip_prob: 0.1,
            grayscale_prob: 0.1,
            jitter_prob: 0.5,
        }
    }
}

impl Augmenter {
    pub fn new(crop_prob: f64, flip_prob: f64, grayscale_prob: f64, jitter_prob: f64) -> Self {
        Self {
            crop_prob,
            flip_prob,
            grayscale_prob,
            jitter_prob,
        }
    }

    /// Apply the configured transforms with fresh randomness per image.
    pub fn apply(&self, img: DynamicImage) -> DynamicImage {
        let mut rng = rand::thread_rng();
        self.apply_with_rng(img, &mut rng)
    }

    fn apply_with_rng<R: Rng>(&self, mut img: DynamicImage, rng: &mut R) -> DynamicImage {
        if self.crop_prob > 0.0 && rng.gen_bool(self.crop_prob) {
            img = random_resized_crop(img, rng);
        }

        if self.flip_prob > 0.0 && rng.gen_bool(self.flip_prob) {
            img = img.fliph();
        }

        if self.grayscale_prob > 0.0 && rng.gen_bool(self.grayscale_prob) {
            img = img.grayscale();
        }

        if self.jitter_prob > 0.0 && rng.gen_bool(self.jitter_prob) {
            let contrast: f32 = rng.gen_range(-25.0..25.0);
            let brightness: i32 = rng.gen_range(-32..32);
            let saturation: f32 = rng.gen_range(0.5..1.5);
            let hue: i32 = rng.gen_range(-180..180);
            img = adjust_saturation(
                img.adjust_contrast(contrast).brighten(brightness),
                saturation,
            )
            .huerotate(hue);
        }

        img
    }
}

/// Crop a region with random area and aspect ratio. The caller's square
/// resize then rescales the region, so together they act as a
/// random-resized crop. Falls back to the full image when no sampled
/// region fits.
fn random_resized_crop<R: Rng>(img: DynamicImage, rng: &mut R) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let area = (width as f64) * (height as f64);

    for _ in 0..10 {
        let target_area = area * rng.gen_range(CROP_SCALE.0..CROP_SCALE.1);
        let ratio = rng.gen_range(CROP_RATIO.0..CROP_RATIO.1);
        let w = (target_area * ratio).sqrt().round() as u32;
        let h = (target_area / ratio).sqrt().round() as u32;

        if w >= 1 && h >= 1 && w <= width && h <= height {
            let x = rng.gen_range(0..=width - w);
            let y = rng.gen_range(0..=height - h);
            return img.crop_imm(x, y, w, h);
        }
    }

    img
}

/// Scale per-pixel distance from the luma: factor 0.0 is grayscale, 1.0 is
/// the identity, above 1.0 oversaturates.
fn adjust_saturation(img: DynamicImage, factor: f32) -> DynamicImage {
    let mut rgb = img.to_rgb8();
    for pixel in rgb.pixels_mut() {
        let [r, g, b] = pixel.0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        pixel.0 = [r, g, b].map(|c| (luma + (c as f32 - luma) * factor).clamp(0.0, 255.0) as u8);
    }
    DynamicImage::ImageRgb8(rgb)
}
