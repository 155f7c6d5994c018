//! Disease classifier boundary
//!
//! [`DiseaseClassifier`] has two implementations chosen once at startup:
//! [`ModelClassifier`] runs a burn checkpoint, [`MockClassifier`] returns a
//! fixed answer. [`load_classifier`] picks the model when its artifacts load and
//! falls back to the mock otherwise, so a missing model never blocks startup.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::time::Instant;

use burn::{
    module::Module,
    record::CompactRecorder,
    tensor::{backend::Backend, Tensor, TensorData},
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{default_device, InferenceBackend};
use crate::config::ModelConfig;
use crate::model::{LeafDiseaseNet, LeafDiseaseNetConfig};
use crate::utils::{GreenTwinError, Result};

use super::preprocess::Preprocessor;

/// Label returned by the mock classifier
pub const MOCK_LABEL: &str = "Mock Healthy";

/// Confidence returned by the mock classifier
pub const MOCK_CONFIDENCE: f64 = 0.99;

/// Top-1 output of a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Predicted class name
    pub label: String,
    /// Softmax probability of the predicted class, in `[0, 1]`
    pub confidence: f64,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Anything that maps an image to a single disease label
pub trait DiseaseClassifier: Send {
    /// Top-1 label and confidence for the image
    fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult>;

    /// Short name for logs
    fn name(&self) -> &str;

    /// True for the fallback implementation
    fn is_mock(&self) -> bool {
        false
    }
}

/// Fixed-answer classifier used when no model is available
#[derive(Debug, Clone)]
pub struct MockClassifier {
    result: ClassificationResult,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            result: ClassificationResult::new(MOCK_LABEL, MOCK_CONFIDENCE),
        }
    }

    /// Mock with a custom fixed answer
    pub fn with_result(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            result: ClassificationResult::new(label, confidence),
        }
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DiseaseClassifier for MockClassifier {
    fn classify(&self, _image: &DynamicImage) -> Result<ClassificationResult> {
        Ok(self.result.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn is_mock(&self) -> bool {
        true
    }
}

/// Classifier backed by a [`LeafDiseaseNet`] checkpoint
pub struct ModelClassifier<B: Backend> {
    model: LeafDiseaseNet<B>,
    classes: Vec<String>,
    preprocessor: Preprocessor,
    device: B::Device,
}

impl<B: Backend> ModelClassifier<B> {
    /// Wrap an already-built network
    pub fn new(
        model: LeafDiseaseNet<B>,
        classes: Vec<String>,
        preprocessor: Preprocessor,
        device: B::Device,
    ) -> Result<Self> {
        if classes.is_empty() {
            return Err(GreenTwinError::Model("class list is empty".to_string()));
        }
        if classes.len() != model.num_classes() {
            return Err(GreenTwinError::Model(format!(
                "{} class names for a {}-class model",
                classes.len(),
                model.num_classes()
            )));
        }
        preprocessor.validate()?;

        Ok(Self {
            model,
            classes,
            preprocessor,
            device,
        })
    }

    /// Restore the network and class list described by `config`
    pub fn load(config: &ModelConfig, device: &B::Device) -> Result<Self> {
        let weights_path = config.weights_path();
        let classes_path = config.classes_path();

        if !weights_path.exists() {
            return Err(GreenTwinError::PathNotFound(weights_path));
        }
        let classes = load_classes(&classes_path)?;

        let network = LeafDiseaseNetConfig::new(classes.len())
            .with_base_filters(config.base_filters)
            .with_num_stages(config.num_stages)
            .with_hidden_units(config.hidden_units);

        let recorder = CompactRecorder::new();
        let model = network
            .init::<B>(device)
            .load_file(weights_path.clone(), &recorder, device)
            .map_err(|e| GreenTwinError::Model(format!("Failed to load {:?}: {:?}", weights_path, e)))?;

        info!(
            "Model loaded from {:?} ({} classes)",
            weights_path,
            classes.len()
        );

        Self::new(model, classes, config.preprocessing, device.clone())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Softmax distribution over all classes
    pub fn probabilities(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let pixels = self.preprocessor.preprocess(image)?;
        let size = self.preprocessor.crop_size as usize;

        let input = Tensor::<B, 4>::from_floats(TensorData::new(pixels, [1, 3, size, size]), &self.device);

        self.model
            .forward_softmax(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| GreenTwinError::Classifier(format!("Failed to read probabilities: {:?}", e)))
    }
}

impl<B: Backend> DiseaseClassifier for ModelClassifier<B> {
    fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult> {
        let start = Instant::now();
        let probs = self.probabilities(image)?;

        let (index, confidence) = probs
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
            .ok_or_else(|| GreenTwinError::Classifier("model produced no output".to_string()))?;

        let label = self
            .classes
            .get(index)
            .cloned()
            .ok_or_else(|| GreenTwinError::Classifier(format!("class index {} out of range", index)))?;

        debug!(
            "Classified as {} ({:.3}) in {:.1} ms",
            label,
            confidence,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(ClassificationResult::new(label, confidence as f64))
    }

    fn name(&self) -> &str {
        "model"
    }
}

/// Read a JSON array of class names
pub fn load_classes(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(GreenTwinError::PathNotFound(path.to_path_buf()));
    }
    let json = fs::read_to_string(path)?;
    let classes: Vec<String> = serde_json::from_str(&json)?;
    if classes.is_empty() {
        return Err(GreenTwinError::Model(format!("{:?} lists no classes", path)));
    }
    Ok(classes)
}

/// Model classifier if its artifacts load, mock otherwise
pub fn load_classifier(config: &ModelConfig) -> Box<dyn DiseaseClassifier> {
    if !config.artifacts_present() {
        warn!(
            "Model or classes file not found in {:?}. Inference will be mocked.",
            config.model_dir
        );
        return Box::new(MockClassifier::new());
    }

    match ModelClassifier::<InferenceBackend>::load(config, &default_device()) {
        Ok(classifier) => Box::new(classifier),
        Err(e) => {
            warn!("Failed to load model: {}. Inference will be mocked.", e);
            Box::new(MockClassifier::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    type TestBackend = NdArray<f32>;

    fn tiny_model_config(dir: &Path) -> ModelConfig {
        ModelConfig {
            model_dir: dir.to_path_buf(),
            preprocessing: Preprocessor::new(36, 32).unwrap(),
            base_filters: 4,
            num_stages: 2,
            hidden_units: 8,
            ..ModelConfig::default()
        }
    }

    fn classes() -> Vec<String> {
        ["Tomato___Early_blight", "Tomato___Late_blight", "Tomato___healthy"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn write_artifacts(config: &ModelConfig) {
        let device = Default::default();
        let model = LeafDiseaseNetConfig::new(3)
            .with_base_filters(config.base_filters)
            .with_num_stages(config.num_stages)
            .with_hidden_units(config.hidden_units)
            .init::<TestBackend>(&device);
        model
            .save_file(config.weights_path(), &CompactRecorder::new())
            .unwrap();
        fs::write(config.classes_path(), serde_json::to_string(&classes()).unwrap()).unwrap();
    }

    fn leaf() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(48, 40, Rgb([40, 150, 60])))
    }

    #[test]
    fn test_mock_classifier() {
        let mock = MockClassifier::new();
        let result = mock.classify(&leaf()).unwrap();

        assert!(mock.is_mock());
        assert_eq!(result.label, "Mock Healthy");
        assert_eq!(result.confidence, 0.99);
    }

    #[test]
    fn test_model_classifier_returns_known_label() {
        let device = Default::default();
        let model = LeafDiseaseNetConfig::new(3)
            .with_base_filters(4)
            .with_num_stages(2)
            .with_hidden_units(8)
            .init::<TestBackend>(&device);
        let classifier =
            ModelClassifier::new(model, classes(), Preprocessor::new(36, 32).unwrap(), device)
                .unwrap();

        let result = classifier.classify(&leaf()).unwrap();

        assert!(!classifier.is_mock());
        assert!(classes().contains(&result.label));
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
        // Top-1 of three classes is at least a third
        assert!(result.confidence >= 1.0 / 3.0 - 1e-6);
    }

    #[test]
    fn test_class_count_mismatch() {
        let device = Default::default();
        let model = LeafDiseaseNetConfig::new(5)
            .with_base_filters(4)
            .with_num_stages(1)
            .with_hidden_units(8)
            .init::<TestBackend>(&device);

        let result = ModelClassifier::new(model, classes(), Preprocessor::default(), device);
        assert!(matches!(result, Err(GreenTwinError::Model(_))));
    }

    #[test]
    fn test_load_from_checkpoint() {
        let dir = TempDir::new().unwrap();
        let config = tiny_model_config(dir.path());
        write_artifacts(&config);

        let classifier = ModelClassifier::<TestBackend>::load(&config, &Default::default()).unwrap();
        assert_eq!(classifier.classes(), classes().as_slice());

        let boxed = load_classifier(&config);
        assert!(!boxed.is_mock());
        let result = boxed.classify(&leaf()).unwrap();
        assert!(classes().contains(&result.label));
    }

    #[test]
    fn test_missing_artifacts_fall_back_to_mock() {
        let dir = TempDir::new().unwrap();
        let classifier = load_classifier(&ModelConfig::with_model_dir(dir.path()));
        assert!(classifier.is_mock());
    }

    #[test]
    fn test_broken_artifacts_fall_back_to_mock() {
        let dir = TempDir::new().unwrap();
        let config = tiny_model_config(dir.path());
        fs::write(config.weights_path(), b"not a checkpoint").unwrap();
        fs::write(config.classes_path(), r#"["a", "b"]"#).unwrap();

        assert!(load_classifier(&config).is_mock());
    }

    #[test]
    fn test_load_classes_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("classes.json");

        assert!(matches!(load_classes(&path), Err(GreenTwinError::PathNotFound(_))));

        fs::write(&path, "[]").unwrap();
        assert!(matches!(load_classes(&path), Err(GreenTwinError::Model(_))));

        fs::write(&path, "{").unwrap();
        assert!(matches!(load_classes(&path), Err(GreenTwinError::Serialization(_))));
    }
}
