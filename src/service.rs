//! Plant care service
//!
//! Wires the store, classifier, color heuristic and twin engine together.
//! A diagnosis runs: decode → classify → heuristic → twin update → growth log
//! → store.

use chrono::Utc;
use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::GreenTwinConfig;
use crate::inference::{
    is_healthy_label, load_classifier, ClassificationResult, ColorHeuristic, DiseaseClassifier,
    HeuristicOutcome,
};
use crate::store::{DiagnosisSnapshot, PlantId, PlantLog, PlantRecord, PlantStore};
use crate::twin::{PlantState, TwinEngine, HEALTHY_OBSERVATION};
use crate::utils::{GreenTwinError, Result};

/// Outcome of running one image through the full pipeline
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub plant_id: PlantId,
    /// Final label (after the heuristic) and the classifier's confidence
    pub classification: ClassificationResult,
    /// Label as produced by the classifier
    pub raw_label: String,
    /// Green ratio measured by the heuristic, if it ran
    pub green_ratio: Option<f64>,
    /// Whether the heuristic replaced the label
    pub overridden: bool,
    /// Twin state after the update
    pub state: PlantState,
}

/// Plant CRUD plus disease diagnosis over a [`PlantStore`]
pub struct PlantCareService<S: PlantStore> {
    store: S,
    engine: TwinEngine,
    heuristic: ColorHeuristic,
    classifier: Box<dyn DiseaseClassifier>,
}

impl<S: PlantStore> PlantCareService<S> {
    pub fn new(
        store: S,
        engine: TwinEngine,
        heuristic: ColorHeuristic,
        classifier: Box<dyn DiseaseClassifier>,
    ) -> Self {
        Self {
            store,
            engine,
            heuristic,
            classifier,
        }
    }

    /// Build from configuration; the classifier falls back to the mock if
    /// the model artifacts are unavailable
    pub fn from_config(store: S, config: &GreenTwinConfig) -> Self {
        let classifier = load_classifier(&config.model);
        info!("Using {} classifier", classifier.name());
        Self::new(
            store,
            TwinEngine::new(config.twin),
            config.heuristic.clone(),
            classifier,
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn classifier(&self) -> &dyn DiseaseClassifier {
        self.classifier.as_ref()
    }

    /// Register a plant together with its fresh twin state
    pub fn create_plant(&mut self, name: &str, species: &str) -> Result<PlantRecord> {
        let name = name.trim();
        let species = species.trim();
        if name.is_empty() || species.is_empty() {
            return Err(GreenTwinError::InvalidInput(
                "plant name and species must not be empty".to_string(),
            ));
        }

        let record = PlantRecord::new(self.store.next_id()?, name, species);
        self.store.put(record.clone())?;

        info!("Created plant {} '{}' ({})", record.id, record.name, record.species);
        Ok(record)
    }

    pub fn get_plant(&self, id: PlantId) -> Result<PlantRecord> {
        self.store.get(id)?.ok_or(GreenTwinError::NotFound(id))
    }

    pub fn list_plants(&self) -> Result<Vec<PlantRecord>> {
        self.store.list()
    }

    /// Delete a plant together with its twin state and growth log
    pub fn delete_plant(&mut self, id: PlantId) -> Result<()> {
        if !self.store.delete(id)? {
            return Err(GreenTwinError::NotFound(id));
        }
        info!("Deleted plant {}", id);
        Ok(())
    }

    /// Apply water/heat stress deltas to a plant's twin
    pub fn apply_stress(
        &mut self,
        id: PlantId,
        water_delta: f64,
        heat_delta: f64,
    ) -> Result<PlantState> {
        let mut record = self.get_plant(id)?;
        self.engine
            .update_stress(&mut record.state, water_delta, heat_delta);

        let state = record.state.clone();
        self.store.put(record)?;
        Ok(state)
    }

    /// Classify an encoded image and run the heuristic; no state is touched
    pub fn classify_image(&self, bytes: &[u8]) -> Result<(ClassificationResult, HeuristicOutcome)> {
        let image = image::load_from_memory(bytes)?;
        self.classify_decoded(&image)
    }

    /// Classify an already decoded image and run the heuristic
    pub fn classify_decoded(
        &self,
        image: &DynamicImage,
    ) -> Result<(ClassificationResult, HeuristicOutcome)> {
        let raw = self.classifier.classify(image)?;
        let outcome = self.heuristic.apply(image, &raw.label);

        let final_result = ClassificationResult::new(outcome.label.clone(), raw.confidence);
        Ok((final_result, outcome))
    }

    /// Full pipeline for one plant image
    ///
    /// On decode or classifier failure the stored state is left untouched.
    /// A successful diagnosis is also appended to the plant's growth log.
    pub fn diagnose(&mut self, id: PlantId, bytes: &[u8]) -> Result<Diagnosis> {
        let mut record = self.get_plant(id)?;

        let image = image::load_from_memory(bytes).map_err(|e| {
            warn!("Could not decode image for plant {}: {}", id, e);
            GreenTwinError::from(e)
        })?;

        let (classification, outcome) = self.classify_decoded(&image)?;

        // Any label carrying the healthy marker (including the heuristic's
        // replacement) counts as a healthy observation for the twin.
        let observation = if is_healthy_label(&classification.label) {
            HEALTHY_OBSERVATION
        } else {
            classification.label.as_str()
        };
        self.engine.update_after_disease_prediction(
            &mut record.state,
            classification.confidence,
            observation,
        );

        let state = record.state.clone();
        record.logs.push(PlantLog {
            logged_at: state.last_updated(),
            note: format!("Diagnosis: {}", classification.label),
            diagnosis: Some(DiagnosisSnapshot {
                label: classification.label.clone(),
                confidence: classification.confidence,
                overridden: outcome.overridden,
                health_score: state.health_score(),
                disease_risk_index: state.disease_risk_index(),
            }),
        });
        self.store.put(record)?;

        info!(
            "Plant {}: {} ({:.2}), health {:.1}",
            id,
            classification.label,
            classification.confidence,
            state.health_score()
        );

        Ok(Diagnosis {
            plant_id: id,
            raw_label: outcome.raw_label,
            green_ratio: outcome.green_ratio,
            overridden: outcome.overridden,
            classification,
            state,
        })
    }

    /// Append a manual growth-log note
    pub fn add_log(&mut self, id: PlantId, note: &str) -> Result<PlantLog> {
        let note = note.trim();
        if note.is_empty() {
            return Err(GreenTwinError::InvalidInput(
                "log note must not be empty".to_string(),
            ));
        }

        let mut record = self.get_plant(id)?;
        let entry = PlantLog::note(note, Utc::now());
        record.logs.push(entry.clone());
        self.store.put(record)?;

        debug!("Logged note for plant {}", id);
        Ok(entry)
    }

    /// Growth log of a plant, oldest first
    pub fn list_logs(&self, id: PlantId) -> Result<Vec<PlantLog>> {
        Ok(self.get_plant(id)?.logs)
    }
}
