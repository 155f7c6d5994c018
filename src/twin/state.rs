//! Plant twin state record
//!
//! One `PlantState` exists per plant. Stress fields are kept in `[0, 1]` and the
//! health score is derived from them, so every construction path (including
//! deserialization) clamps and recomputes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{clamp_range, clamp_unit};

/// Upper bound of the health score
pub const MAX_HEALTH_SCORE: f64 = 100.0;

/// Health penalty for a fully water-stressed plant
pub const WATER_STRESS_WEIGHT: f64 = 20.0;

/// Health penalty for a fully heat-stressed plant
pub const HEAT_STRESS_WEIGHT: f64 = 20.0;

/// Health penalty for a certain disease (2.5x a single stress factor)
pub const DISEASE_RISK_WEIGHT: f64 = 50.0;

/// Health score for the given stress inputs, each clamped to `[0, 1]` first
pub fn health_score_for(water_stress: f64, heat_stress: f64, disease_risk_index: f64) -> f64 {
    let penalty = clamp_unit(water_stress) * WATER_STRESS_WEIGHT
        + clamp_unit(heat_stress) * HEAT_STRESS_WEIGHT
        + clamp_unit(disease_risk_index) * DISEASE_RISK_WEIGHT;

    clamp_range(MAX_HEALTH_SCORE - penalty, 0.0, MAX_HEALTH_SCORE)
}

/// Physiological state of a single plant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPlantState")]
pub struct PlantState {
    pub(crate) water_stress: f64,
    pub(crate) heat_stress: f64,
    pub(crate) disease_risk_index: f64,
    pub(crate) health_score: f64,
    pub(crate) last_updated: DateTime<Utc>,
}

impl PlantState {
    /// Fresh state for a newly created plant: no stress, full health
    pub fn new() -> Self {
        Self::with_stress(0.0, 0.0, 0.0, Utc::now())
    }

    /// State with explicit stress values (clamped) and timestamp
    pub fn with_stress(
        water_stress: f64,
        heat_stress: f64,
        disease_risk_index: f64,
        last_updated: DateTime<Utc>,
    ) -> Self {
        let mut state = Self {
            water_stress: clamp_unit(water_stress),
            heat_stress: clamp_unit(heat_stress),
            disease_risk_index: clamp_unit(disease_risk_index),
            health_score: MAX_HEALTH_SCORE,
            last_updated,
        };
        state.recompute_health();
        state
    }

    pub fn water_stress(&self) -> f64 {
        self.water_stress
    }

    pub fn heat_stress(&self) -> f64 {
        self.heat_stress
    }

    pub fn disease_risk_index(&self) -> f64 {
        self.disease_risk_index
    }

    /// Derived health score in `[0, 100]`
    pub fn health_score(&self) -> f64 {
        self.health_score
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// True when the stress fields match, ignoring the timestamp
    pub fn same_condition(&self, other: &PlantState) -> bool {
        self.water_stress == other.water_stress
            && self.heat_stress == other.heat_stress
            && self.disease_risk_index == other.disease_risk_index
            && self.health_score == other.health_score
    }

    pub(crate) fn recompute_health(&mut self) {
        self.health_score =
            health_score_for(self.water_stress, self.heat_stress, self.disease_risk_index);
    }
}

impl Default for PlantState {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire shape of a stored state; any stored health score is ignored
#[derive(Deserialize)]
struct RawPlantState {
    #[serde(default)]
    water_stress: f64,
    #[serde(default)]
    heat_stress: f64,
    #[serde(default)]
    disease_risk_index: f64,
    #[serde(default = "Utc::now")]
    last_updated: DateTime<Utc>,
}

impl From<RawPlantState> for PlantState {
    fn from(raw: RawPlantState) -> Self {
        PlantState::with_stress(
            raw.water_stress,
            raw.heat_stress,
            raw.disease_risk_index,
            raw.last_updated,
        )
    }
}
