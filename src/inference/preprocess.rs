//! Image preprocessing for the disease classifier
//!
//! Shorter side resized to 256 (bilinear), center crop 224x224, scaled to
//! `[0, 1]`, ImageNet-normalized, CHW layout.

use image::{imageops::FilterType, DynamicImage};
use serde::{Deserialize, Serialize};

use crate::utils::{GreenTwinError, Result};

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resize + crop geometry for classifier input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocessor {
    /// Target length of the shorter image side
    pub resize_to: u32,
    /// Side length of the square center crop
    pub crop_size: u32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            resize_to: 256,
            crop_size: 224,
        }
    }
}

impl Preprocessor {
    pub fn new(resize_to: u32, crop_size: u32) -> Result<Self> {
        let preprocessor = Self {
            resize_to,
            crop_size,
        };
        preprocessor.validate()?;
        Ok(preprocessor)
    }

    pub fn validate(&self) -> Result<()> {
        if self.crop_size == 0 || self.resize_to == 0 {
            return Err(GreenTwinError::Config(
                "preprocessing sizes must be positive".to_string(),
            ));
        }
        if self.crop_size > self.resize_to {
            return Err(GreenTwinError::Config(format!(
                "crop size {} exceeds resize target {}",
                self.crop_size, self.resize_to
            )));
        }
        Ok(())
    }

    /// Number of floats produced per image
    pub fn tensor_len(&self) -> usize {
        3 * (self.crop_size as usize) * (self.crop_size as usize)
    }

    /// Resize so the shorter side equals `resize_to`, keeping aspect ratio
    pub fn resize_shorter_side(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(GreenTwinError::Image(format!(
                "cannot preprocess a {}x{} image",
                width, height
            )));
        }

        let target = self.resize_to as u64;
        let (new_width, new_height) = if width <= height {
            (target, (height as u64 * target / width as u64).max(1))
        } else {
            ((width as u64 * target / height as u64).max(1), target)
        };

        Ok(image.resize_exact(new_width as u32, new_height as u32, FilterType::Triangle))
    }

    /// Square crop of `crop_size` around the image center
    pub fn center_crop(&self, image: &DynamicImage) -> DynamicImage {
        let size = self.crop_size;
        let left = (image.width().saturating_sub(size) as f64 / 2.0).round() as u32;
        let top = (image.height().saturating_sub(size) as f64 / 2.0).round() as u32;
        image.crop_imm(left, top, size, size)
    }

    /// Full pipeline: resize, crop, normalize to a CHW float vector
    pub fn preprocess(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let resized = self.resize_shorter_side(image)?;
        let cropped = self.center_crop(&resized);
        Ok(normalize_chw(&cropped))
    }
}

/// Normalize an image to a flat CHW vector with ImageNet statistics
pub fn normalize_chw(image: &DynamicImage) -> Vec<f32> {
    let rgb = image.to_rgb8();
    let num_pixels = (rgb.width() * rgb.height()) as usize;

    let mut normalized = vec![0.0f32; 3 * num_pixels];
    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            normalized[c * num_pixels + i] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    normalized
}
