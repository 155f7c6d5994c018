//! # GreenTwin
//!
//! Core of a plant-care tracker: a digital twin of each plant's physiological
//! state, and a disease-signal pipeline that classifies leaf images and vetoes
//! implausible disease predictions with a color heuristic.
//!
//! ## Modules
//!
//! - `twin`: bounded plant state and its update rules
//! - `inference`: classifier boundary (Burn model or mock), preprocessing, color heuristic
//! - `model`: CNN architecture built with Burn
//! - `store`: plant records and growth logs (in-memory and JSON file)
//! - `service`: plant CRUD and the diagnose pipeline
//! - `scheduler`: periodic reminder checks
//! - `config`: JSON configuration
//! - `utils`: logging, errors, and helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use greentwin::{GreenTwinConfig, InMemoryStore, PlantCareService};
//!
//! let config = GreenTwinConfig::default();
//! let mut service = PlantCareService::from_config(InMemoryStore::new(), &config);
//!
//! let plant = service.create_plant("Roma", "Solanum lycopersicum")?;
//! let diagnosis = service.diagnose(plant.id, &std::fs::read("leaf.jpg")?)?;
//! println!("{} -> health {:.1}", diagnosis.classification.label, diagnosis.state.health_score());
//! ```

pub mod backend;
pub mod config;
pub mod inference;
pub mod model;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod twin;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::GreenTwinConfig;
pub use inference::{ClassificationResult, ColorHeuristic, DiseaseClassifier, MockClassifier};
pub use scheduler::{DueReminderCheck, ReminderJob, ReminderScheduler};
pub use service::{Diagnosis, PlantCareService};
pub use store::{
    DiagnosisSnapshot, InMemoryStore, JsonFileStore, PlantId, PlantLog, PlantRecord, PlantStore,
};
pub use twin::{PlantState, TwinEngine, TwinParams};
pub use utils::error::{GreenTwinError, Result};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
