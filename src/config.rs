//! Configuration for the GreenTwin core
//!
//! All sections have defaults matching the values the system was tuned with,
//! so an empty JSON object (or no file at all) is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::inference::heuristic::ColorHeuristic;
use crate::inference::preprocess::Preprocessor;
use crate::twin::TwinParams;
use crate::utils::{GreenTwinError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreenTwinConfig {
    /// Classifier artifacts and preprocessing
    pub model: ModelConfig,
    /// Color heuristic thresholds
    pub heuristic: ColorHeuristic,
    /// Twin update step sizes
    pub twin: TwinParams,
    /// Reminder scheduler settings
    pub reminders: ReminderConfig,
    /// Location of the JSON plant store
    pub store_path: StorePath,
}

impl GreenTwinConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GreenTwinError::PathNotFound(path.to_path_buf()));
        }

        let json = fs::read_to_string(path)?;
        let config: GreenTwinConfig = serde_json::from_str(&json).map_err(|e| {
            GreenTwinError::Config(format!("Failed to parse {:?}: {}", path, e))
        })?;
        config.validate()?;

        info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Load from `path` if given, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Write configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.heuristic.validate()?;
        self.twin.validate()?;
        self.reminders.validate()?;
        Ok(())
    }
}

/// Classifier artifact locations and network shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the checkpoint and class list
    pub model_dir: PathBuf,
    /// Checkpoint file name (burn `CompactRecorder` format)
    pub weights_file: String,
    /// JSON array of class names, index-aligned with the model output
    pub classes_file: String,
    /// Resize and crop geometry
    pub preprocessing: Preprocessor,
    /// Filters in the first conv stage of the checkpointed network
    pub base_filters: usize,
    /// Conv stages of the checkpointed network
    pub num_stages: usize,
    /// Hidden layer width of the checkpointed network
    pub hidden_units: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("ml_models/tomato"),
            weights_file: "best_model.mpk".to_string(),
            classes_file: "classes.json".to_string(),
            preprocessing: Preprocessor::default(),
            base_filters: 32,
            num_stages: 4,
            hidden_units: 256,
        }
    }
}

impl ModelConfig {
    /// Config pointing at a specific model directory
    pub fn with_model_dir(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ..Self::default()
        }
    }

    pub fn weights_path(&self) -> PathBuf {
        self.model_dir.join(&self.weights_file)
    }

    pub fn classes_path(&self) -> PathBuf {
        self.model_dir.join(&self.classes_file)
    }

    /// Both artifacts are present on disk
    pub fn artifacts_present(&self) -> bool {
        self.weights_path().exists() && self.classes_path().exists()
    }

    pub fn validate(&self) -> Result<()> {
        self.preprocessing.validate()?;
        if self.base_filters == 0 || self.num_stages == 0 || self.hidden_units == 0 {
            return Err(GreenTwinError::Config(
                "model network dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reminder scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Minutes between reminder checks
    pub interval_minutes: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
        }
    }
}

impl ReminderConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes == 0 {
            return Err(GreenTwinError::Config(
                "reminders.interval_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Path of the JSON plant store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorePath(pub PathBuf);

impl Default for StorePath {
    fn default() -> Self {
        Self(PathBuf::from("data/plants.json"))
    }
}

impl AsRef<Path> for StorePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}
