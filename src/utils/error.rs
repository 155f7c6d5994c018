//! Error Handling Module
//!
//! Defines the error type shared by the GreenTwin library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for GreenTwin operations
#[derive(Error, Debug)]
pub enum GreenTwinError {
    /// Error decoding or processing an image
    #[error("Image error: {0}")]
    Image(String),

    /// Error loading model artifacts
    #[error("Model error: {0}")]
    Model(String),

    /// Error while running the classifier
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Plant record not found
    #[error("Plant not found: {0}")]
    NotFound(u64),

    /// Path not found
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Scheduler lifecycle error
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl From<serde_json::Error> for GreenTwinError {
    fn from(err: serde_json::Error) -> Self {
        GreenTwinError::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for GreenTwinError {
    fn from(err: image::ImageError) -> Self {
        GreenTwinError::Image(err.to_string())
    }
}

/// Convenience Result type for GreenTwin operations
pub type Result<T> = std::result::Result<T, GreenTwinError>;
