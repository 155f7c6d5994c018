//! Plant record store boundary
//!
//! Persistence is reduced to get/put/delete/list by plant identifier. The twin
//! state and growth log live inside their plant record, so deleting a plant
//! deletes both.

pub mod json_file;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::twin::PlantState;
use crate::utils::Result;

pub use json_file::JsonFileStore;
pub use memory::InMemoryStore;

/// Plant identifier
pub type PlantId = u64;

/// Twin outcome recorded alongside a diagnosis log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisSnapshot {
    /// Final label after the color heuristic
    pub label: String,
    pub confidence: f64,
    pub overridden: bool,
    pub health_score: f64,
    pub disease_risk_index: f64,
}

/// One growth-log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantLog {
    pub logged_at: DateTime<Utc>,
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<DiagnosisSnapshot>,
}

impl PlantLog {
    pub fn note(note: impl Into<String>, logged_at: DateTime<Utc>) -> Self {
        Self {
            logged_at,
            note: note.into(),
            diagnosis: None,
        }
    }
}

/// A tracked plant, its twin state and its growth log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantRecord {
    pub id: PlantId,
    pub name: String,
    pub species: String,
    pub created_at: DateTime<Utc>,
    pub state: PlantState,
    /// Oldest first
    #[serde(default)]
    pub logs: Vec<PlantLog>,
}

impl PlantRecord {
    /// New plant with a fresh twin state
    pub fn new(id: PlantId, name: impl Into<String>, species: impl Into<String>) -> Self {
        let created_at = Utc::now();
        Self {
            id,
            name: name.into(),
            species: species.into(),
            created_at,
            state: PlantState::with_stress(0.0, 0.0, 0.0, created_at),
            logs: Vec::new(),
        }
    }
}

/// Storage for plant records
pub trait PlantStore {
    fn get(&self, id: PlantId) -> Result<Option<PlantRecord>>;

    /// Insert or replace the record with the same id
    fn put(&mut self, record: PlantRecord) -> Result<()>;

    /// Remove a record; returns whether it existed
    fn delete(&mut self, id: PlantId) -> Result<bool>;

    /// All records, ordered by id
    fn list(&self) -> Result<Vec<PlantRecord>>;

    /// One past the largest stored id (1 for an empty store)
    fn next_id(&self) -> Result<PlantId> {
        Ok(self
            .list()?
            .iter()
            .map(|record| record.id)
            .max()
            .map_or(1, |max| max + 1))
    }
}
