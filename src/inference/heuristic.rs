//! Disease-Signal Post-Processor
//!
//! A cheap pixel check on top of the classifier: if the leaf image is mostly
//! healthy green but the model predicted a disease, the label is replaced with
//! the healthy label. Confidence is never touched.
//!
//! This also suppresses true positives for diseases that keep leaves green.
//! That trade-off is known and intentional.

use image::{imageops::FilterType, DynamicImage, Rgb};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::utils::{GreenTwinError, Result};

/// Label substituted when the heuristic overrides a disease prediction
pub const DEFAULT_HEALTHY_LABEL: &str = "Tomato___healthy";

/// Largest accepted sampling grid side
pub const MAX_GRID_SIZE: u32 = 1024;

/// Thresholds for the green-dominance check
///
/// The defaults are empirical and kept exactly for compatibility.
/// They are tunable, not load-bearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorHeuristic {
    /// Side length of the grid the image is downscaled to
    pub grid_size: u32,
    /// Green channel must exceed this (8-bit) value
    pub brightness_floor: u8,
    /// Override fires when the green ratio is strictly above this
    pub green_ratio_threshold: f64,
    /// Replacement label for overridden predictions
    pub healthy_label: String,
}

impl Default for ColorHeuristic {
    fn default() -> Self {
        Self {
            grid_size: 50,
            brightness_floor: 50,
            green_ratio_threshold: 0.45,
            healthy_label: DEFAULT_HEALTHY_LABEL.to_string(),
        }
    }
}

/// Result of running the heuristic over one prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuristicOutcome {
    /// Final label (original or overridden)
    pub label: String,
    /// Label the classifier predicted
    pub raw_label: String,
    /// Measured green ratio; `None` when the check could not run
    pub green_ratio: Option<f64>,
    /// Whether the label was replaced
    pub overridden: bool,
}

impl HeuristicOutcome {
    fn passthrough(label: &str, green_ratio: Option<f64>) -> Self {
        Self {
            label: label.to_string(),
            raw_label: label.to_string(),
            green_ratio,
            overridden: false,
        }
    }
}

/// Case-insensitive check for the "healthy" marker in a class label
pub fn is_healthy_label(label: &str) -> bool {
    label.to_lowercase().contains("healthy")
}

impl ColorHeuristic {
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 || self.grid_size > MAX_GRID_SIZE {
            return Err(GreenTwinError::Config(format!(
                "heuristic.grid_size must be within 1..={}, got {}",
                MAX_GRID_SIZE, self.grid_size
            )));
        }
        if !(0.0..=1.0).contains(&self.green_ratio_threshold) {
            return Err(GreenTwinError::Config(format!(
                "heuristic.green_ratio_threshold must be within [0, 1], got {}",
                self.green_ratio_threshold
            )));
        }
        if self.healthy_label.trim().is_empty() {
            return Err(GreenTwinError::Config(
                "heuristic.healthy_label must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Green strictly dominates red and blue and clears the brightness floor
    pub fn is_green_dominant(&self, pixel: &Rgb<u8>) -> bool {
        let [r, g, b] = pixel.0;
        g > r && g > b && g > self.brightness_floor
    }

    /// Fraction of green-dominant pixels on the downscaled grid
    pub fn green_ratio(&self, image: &DynamicImage) -> Result<f64> {
        if image.width() == 0 || image.height() == 0 {
            return Err(GreenTwinError::Image(format!(
                "cannot sample a {}x{} image",
                image.width(),
                image.height()
            )));
        }
        if self.grid_size == 0 {
            return Err(GreenTwinError::Config(
                "heuristic.grid_size must be positive".to_string(),
            ));
        }

        let grid = image
            .resize_exact(self.grid_size, self.grid_size, FilterType::CatmullRom)
            .to_rgb8();

        let total = grid.width() as usize * grid.height() as usize;
        let green = grid
            .pixels()
            .filter(|pixel| self.is_green_dominant(pixel))
            .count();

        Ok(green as f64 / total as f64)
    }

    /// Run the override on a decoded image. Fails open.
    pub fn apply(&self, image: &DynamicImage, predicted_label: &str) -> HeuristicOutcome {
        match self.green_ratio(image) {
            Ok(ratio) => self.decide(predicted_label, ratio),
            Err(e) => {
                warn!("Heuristic failed, keeping '{}': {}", predicted_label, e);
                HeuristicOutcome::passthrough(predicted_label, None)
            }
        }
    }

    /// Decode the image bytes, then run the override. Fails open.
    pub fn apply_to_bytes(&self, bytes: &[u8], predicted_label: &str) -> HeuristicOutcome {
        match image::load_from_memory(bytes) {
            Ok(image) => self.apply(&image, predicted_label),
            Err(e) => {
                warn!("Heuristic failed, keeping '{}': {}", predicted_label, e);
                HeuristicOutcome::passthrough(predicted_label, None)
            }
        }
    }

    /// Override decision for a known green ratio
    pub fn decide(&self, predicted_label: &str, green_ratio: f64) -> HeuristicOutcome {
        debug!(
            "Heuristic check: predicted {}, green ratio {:.2}",
            predicted_label, green_ratio
        );

        if !is_healthy_label(predicted_label) && green_ratio > self.green_ratio_threshold {
            info!(
                "Override: {:.2} green, switching '{}' to '{}'",
                green_ratio, predicted_label, self.healthy_label
            );
            return HeuristicOutcome {
                label: self.healthy_label.clone(),
                raw_label: predicted_label.to_string(),
                green_ratio: Some(green_ratio),
                overridden: true,
            };
        }

        HeuristicOutcome::passthrough(predicted_label, Some(green_ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::io::Cursor;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    /// Left `green_cols` columns green, the rest brown
    fn split(width: u32, height: u32, green_cols: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < green_cols {
                Rgb([30, 160, 40])
            } else {
                Rgb([120, 80, 40])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_all_green_overrides_disease_label() {
        let heuristic = ColorHeuristic::default();
        let image = solid(50, 50, [20, 180, 30]);

        assert_eq!(heuristic.green_ratio(&image).unwrap(), 1.0);

        let outcome = heuristic.apply(&image, "Tomato___Late_blight");
        assert!(outcome.overridden);
        assert_eq!(outcome.label, "Tomato___healthy");
        assert_eq!(outcome.raw_label, "Tomato___Late_blight");
        assert_eq!(outcome.green_ratio, Some(1.0));
    }

    #[test]
    fn test_all_green_healthy_label_passes_through() {
        let heuristic = ColorHeuristic::default();
        let image = solid(50, 50, [20, 180, 30]);

        let outcome = heuristic.apply(&image, "Tomato___healthy");
        assert!(!outcome.overridden);
        assert_eq!(outcome.label, "Tomato___healthy");
    }

    #[test]
    fn test_red_image_never_overridden() {
        let heuristic = ColorHeuristic::default();
        let image = solid(64, 64, [200, 30, 30]);

        assert_eq!(heuristic.green_ratio(&image).unwrap(), 0.0);

        let outcome = heuristic.apply(&image, "Tomato___Bacterial_spot");
        assert!(!outcome.overridden);
        assert_eq!(outcome.label, "Tomato___Bacterial_spot");
    }

    #[test]
    fn test_dark_green_below_brightness_floor() {
        let heuristic = ColorHeuristic::default();
        let image = solid(50, 50, [10, 45, 10]);

        assert_eq!(heuristic.green_ratio(&image).unwrap(), 0.0);
        assert!(!heuristic.apply(&image, "Tomato___Leaf_Mold").overridden);
    }

    #[test]
    fn test_pixel_rule_is_strict() {
        let heuristic = ColorHeuristic::default();
        assert!(heuristic.is_green_dominant(&Rgb([10, 51, 10])));
        assert!(!heuristic.is_green_dominant(&Rgb([10, 50, 10])));
        assert!(!heuristic.is_green_dominant(&Rgb([120, 120, 0])));
        assert!(!heuristic.is_green_dominant(&Rgb([0, 120, 120])));
    }

    #[test]
    fn test_ratio_threshold_is_strict() {
        let heuristic = ColorHeuristic::default();
        assert!(!heuristic.decide("Tomato___Late_blight", 0.45).overridden);
        assert!(heuristic.decide("Tomato___Late_blight", 0.46).overridden);
    }

    #[test]
    fn test_mixed_image_ratio() {
        let heuristic = ColorHeuristic::default();

        // 100x50 image with the left 40 columns green downsamples to 20 of 50 columns
        let mostly_brown = split(100, 50, 40);
        let ratio = heuristic.green_ratio(&mostly_brown).unwrap();
        assert!(ratio > 0.3 && ratio < 0.5, "ratio {}", ratio);
        assert!(!heuristic.apply(&mostly_brown, "Tomato___Early_blight").overridden);

        let mostly_green = split(100, 50, 80);
        let ratio = heuristic.green_ratio(&mostly_green).unwrap();
        assert!(ratio > 0.7, "ratio {}", ratio);
        assert!(heuristic.apply(&mostly_green, "Tomato___Early_blight").overridden);
    }

    #[test]
    fn test_healthy_marker_is_case_insensitive() {
        let heuristic = ColorHeuristic::default();
        let outcome = heuristic.decide("Mock HEALTHY", 0.99);
        assert!(!outcome.overridden);
        assert_eq!(outcome.label, "Mock HEALTHY");
    }

    #[test]
    fn test_empty_image_fails_open() {
        let heuristic = ColorHeuristic::default();
        let image = DynamicImage::new_rgb8(0, 0);

        assert!(heuristic.green_ratio(&image).is_err());

        let outcome = heuristic.apply(&image, "Tomato___Late_blight");
        assert_eq!(outcome.label, "Tomato___Late_blight");
        assert_eq!(outcome.green_ratio, None);
        assert!(!outcome.overridden);
    }

    #[test]
    fn test_undecodable_bytes_fail_open() {
        let heuristic = ColorHeuristic::default();
        let outcome = heuristic.apply_to_bytes(b"definitely not an image", "Tomato___Leaf_Mold");

        assert_eq!(outcome.label, "Tomato___Leaf_Mold");
        assert_eq!(outcome.green_ratio, None);
    }

    #[test]
    fn test_encoded_bytes_are_decoded() {
        let heuristic = ColorHeuristic::default();
        let bytes = png_bytes(&solid(120, 80, [40, 200, 60]));

        let outcome = heuristic.apply_to_bytes(&bytes, "Tomato___Septoria_leaf_spot");
        assert!(outcome.overridden);
        assert_eq!(outcome.green_ratio, Some(1.0));
    }

    #[test]
    fn test_custom_healthy_label() {
        let heuristic = ColorHeuristic {
            healthy_label: "Potato___healthy".to_string(),
            ..ColorHeuristic::default()
        };
        let outcome = heuristic.decide("Potato___Late_blight", 0.9);
        assert_eq!(outcome.label, "Potato___healthy");
    }

    #[test]
    fn test_validate() {
        assert!(ColorHeuristic::default().validate().is_ok());
        let bad = ColorHeuristic {
            grid_size: 0,
            ..ColorHeuristic::default()
        };
        assert!(bad.validate().is_err());
        let bad = ColorHeuristic {
            green_ratio_threshold: 1.5,
            ..ColorHeuristic::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_grid_size_upper_bound() {
        let largest = ColorHeuristic {
            grid_size: MAX_GRID_SIZE,
            ..ColorHeuristic::default()
        };
        assert!(largest.validate().is_ok());

        let huge = ColorHeuristic {
            grid_size: 70_000,
            ..ColorHeuristic::default()
        };
        assert!(matches!(huge.validate(), Err(GreenTwinError::Config(_))));

        let config: crate::config::GreenTwinConfig =
            serde_json::from_str(r#"{ "heuristic": { "grid_size": 70000 } }"#).unwrap();
        assert!(config.validate().is_err());
    }
}
