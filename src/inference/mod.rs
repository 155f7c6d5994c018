//! Inference module: classifier boundary and post-processing
//!
//! This module provides:
//! - The [`DiseaseClassifier`] trait with model-backed and mock implementations
//! - Image preprocessing for the model
//! - The color heuristic that vetoes implausible disease predictions

pub mod classifier;
pub mod heuristic;
pub mod preprocess;

// Re-export main types for convenience
pub use classifier::{
    load_classifier, ClassificationResult, DiseaseClassifier, MockClassifier, ModelClassifier,
};
pub use heuristic::{is_healthy_label, ColorHeuristic, HeuristicOutcome};
pub use preprocess::Preprocessor;
