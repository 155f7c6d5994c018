//! Twin State Updater
//!
//! Bounded state transitions over a [`PlantState`]. Every transition clamps the
//! touched fields to `[0, 1]`, recomputes the health score, and stamps
//! `last_updated`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::{clamp_unit, GreenTwinError, Result};

use super::state::{health_score_for, PlantState};

/// Label that counts as a healthy observation
pub const HEALTHY_OBSERVATION: &str = "healthy";

/// Step sizes for disease-risk updates
///
/// Empirical constants. The defaults must stay as they are for compatibility
/// with existing records, but nothing else depends on their exact values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwinParams {
    /// Risk decay applied per healthy observation
    pub recovery_step: f64,
    /// Risk increase per unit of classifier confidence
    pub onset_gain: f64,
}

impl Default for TwinParams {
    fn default() -> Self {
        Self {
            recovery_step: 0.1,
            onset_gain: 0.5,
        }
    }
}

impl TwinParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("recovery_step", self.recovery_step),
            ("onset_gain", self.onset_gain),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(GreenTwinError::Config(format!(
                    "twin.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Applies stress and disease observations to plant states
#[derive(Debug, Clone, Default)]
pub struct TwinEngine {
    params: TwinParams,
}

impl TwinEngine {
    pub fn new(params: TwinParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TwinParams {
        &self.params
    }

    /// Health score (0-100) from the state's stress fields
    ///
    /// `100 - 20*water - 20*heat - 50*disease_risk`, inputs clamped to `[0, 1]`.
    pub fn calculate_health_score(state: &PlantState) -> f64 {
        health_score_for(
            state.water_stress,
            state.heat_stress,
            state.disease_risk_index,
        )
    }

    /// Fold a classifier observation into the disease risk index
    ///
    /// A `"healthy"` label (case-insensitive, exact) decays risk by the recovery
    /// step. Any other label raises it by `confidence * onset_gain`.
    pub fn update_after_disease_prediction(
        &self,
        state: &mut PlantState,
        confidence: f64,
        label: &str,
    ) {
        self.update_after_disease_prediction_at(state, confidence, label, Utc::now());
    }

    pub fn update_after_disease_prediction_at(
        &self,
        state: &mut PlantState,
        confidence: f64,
        label: &str,
        now: DateTime<Utc>,
    ) {
        let before = state.disease_risk_index;

        state.disease_risk_index = if label.eq_ignore_ascii_case(HEALTHY_OBSERVATION) {
            clamp_unit(before - self.params.recovery_step)
        } else {
            clamp_unit(before + clamp_unit(confidence) * self.params.onset_gain)
        };

        state.health_score = Self::calculate_health_score(state);
        state.last_updated = now;

        debug!(
            "Disease observation '{}' ({:.2}): risk {:.3} -> {:.3}, health {:.1}",
            label, confidence, before, state.disease_risk_index, state.health_score
        );
    }

    /// Apply water and heat stress deltas
    pub fn update_stress(&self, state: &mut PlantState, water_delta: f64, heat_delta: f64) {
        self.update_stress_at(state, water_delta, heat_delta, Utc::now());
    }

    pub fn update_stress_at(
        &self,
        state: &mut PlantState,
        water_delta: f64,
        heat_delta: f64,
        now: DateTime<Utc>,
    ) {
        state.water_stress = clamp_unit(state.water_stress + finite_or_zero(water_delta));
        state.heat_stress = clamp_unit(state.heat_stress + finite_or_zero(heat_delta));

        state.health_score = Self::calculate_health_score(state);
        state.last_updated = now;

        debug!(
            "Stress update: water {:.3}, heat {:.3}, health {:.1}",
            state.water_stress, state.heat_stress, state.health_score
        );
    }
}

// Infinite deltas still saturate; NaN is ignored.
fn finite_or_zero(delta: f64) -> f64 {
    if delta.is_nan() {
        0.0
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn state(water: f64, heat: f64, risk: f64) -> PlantState {
        PlantState::with_stress(water, heat, risk, at(0))
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_health_score_formula() {
        let s = state(0.5, 0.25, 0.4);
        // 100 - 10 - 5 - 20
        assert!(approx(TwinEngine::calculate_health_score(&s), 65.0));
    }

    #[test]
    fn test_health_score_clamps_out_of_range_inputs() {
        let mut s = PlantState::new();
        for (w, h, d) in [(-4.0, 9.0, 2.0), (1e9, -1e9, 0.5), (3.0, 3.0, 3.0)] {
            s.water_stress = w;
            s.heat_stress = h;
            s.disease_risk_index = d;
            let score = TwinEngine::calculate_health_score(&s);
            assert!((0.0..=100.0).contains(&score), "score {} out of range", score);
        }

        s.water_stress = 5.0;
        s.heat_stress = 0.0;
        s.disease_risk_index = 0.0;
        assert!(approx(TwinEngine::calculate_health_score(&s), 80.0));
    }

    #[test]
    fn test_stress_delta_clamps_at_zero() {
        let engine = TwinEngine::default();
        let mut s = state(0.2, 0.0, 0.0);

        engine.update_stress_at(&mut s, -10.0, 0.0, at(5));

        assert_eq!(s.water_stress(), 0.0);
        assert_eq!(s.health_score(), 100.0);
        assert_eq!(s.last_updated(), at(5));
    }

    #[test]
    fn test_stress_delta_clamps_at_one() {
        let engine = TwinEngine::default();
        let mut s = state(0.9, 0.3, 0.0);

        engine.update_stress_at(&mut s, 0.5, 0.2, at(1));

        assert_eq!(s.water_stress(), 1.0);
        assert!(approx(s.heat_stress(), 0.5));
        assert!(approx(s.health_score(), 70.0));
    }

    #[test]
    fn test_disease_onset_scales_with_confidence() {
        let engine = TwinEngine::default();
        let mut s = state(0.0, 0.0, 0.3);

        engine.update_after_disease_prediction_at(&mut s, 0.8, "Late_blight", at(1));

        assert!(approx(s.disease_risk_index(), 0.7));
        assert!(approx(s.health_score(), 65.0));
        assert_eq!(s.last_updated(), at(1));
    }

    #[test]
    fn test_disease_onset_saturates() {
        let engine = TwinEngine::default();
        let mut s = state(0.0, 0.0, 0.9);

        engine.update_after_disease_prediction_at(&mut s, 1.0, "Early_blight", at(1));

        assert_eq!(s.disease_risk_index(), 1.0);
    }

    #[test]
    fn test_healthy_observation_decays_risk() {
        let engine = TwinEngine::default();
        let mut s = state(0.0, 0.0, 0.05);

        engine.update_after_disease_prediction_at(&mut s, 1.0, "healthy", at(1));

        assert_eq!(s.disease_risk_index(), 0.0);
        assert_eq!(s.health_score(), 100.0);
    }

    #[test]
    fn test_healthy_match_is_case_insensitive_and_exact() {
        let engine = TwinEngine::default();

        let mut s = state(0.0, 0.0, 0.5);
        engine.update_after_disease_prediction_at(&mut s, 0.9, "HEALTHY", at(1));
        assert!(approx(s.disease_risk_index(), 0.4));

        // Only the bare word counts as a healthy observation here
        let mut s = state(0.0, 0.0, 0.5);
        engine.update_after_disease_prediction_at(&mut s, 0.2, "Tomato___healthy", at(1));
        assert!(approx(s.disease_risk_index(), 0.6));
    }

    #[test]
    fn test_recovery_is_independent_of_confidence() {
        let engine = TwinEngine::default();
        let mut low = state(0.0, 0.0, 0.5);
        let mut high = state(0.0, 0.0, 0.5);

        engine.update_after_disease_prediction_at(&mut low, 0.1, "healthy", at(1));
        engine.update_after_disease_prediction_at(&mut high, 1.0, "healthy", at(1));

        assert!(low.same_condition(&high));
    }

    #[test]
    fn test_zero_delta_is_idempotent_except_timestamp() {
        let engine = TwinEngine::default();
        let original = state(0.35, 0.6, 0.2);
        let mut s = original.clone();

        for i in 1..=5 {
            engine.update_stress_at(&mut s, 0.0, 0.0, at(i));
        }

        assert!(s.same_condition(&original));
        assert_eq!(s.last_updated(), at(5));
        assert_ne!(s.last_updated(), original.last_updated());
    }

    #[test]
    fn test_nan_delta_is_ignored() {
        let engine = TwinEngine::default();
        let mut s = state(0.4, 0.4, 0.0);

        engine.update_stress_at(&mut s, f64::NAN, 0.1, at(1));

        assert!(approx(s.water_stress(), 0.4));
        assert!(approx(s.heat_stress(), 0.5));
    }

    #[test]
    fn test_custom_params() {
        let engine = TwinEngine::new(TwinParams {
            recovery_step: 0.25,
            onset_gain: 1.0,
        });
        let mut s = state(0.0, 0.0, 0.5);

        engine.update_after_disease_prediction_at(&mut s, 0.3, "Leaf_Mold", at(1));
        assert!(approx(s.disease_risk_index(), 0.8));

        engine.update_after_disease_prediction_at(&mut s, 0.3, "healthy", at(2));
        assert!(approx(s.disease_risk_index(), 0.55));
    }

    #[test]
    fn test_params_validation() {
        assert!(TwinParams::default().validate().is_ok());
        let bad = TwinParams {
            recovery_step: -0.1,
            ..TwinParams::default()
        };
        assert!(bad.validate().is_err());
        let bad = TwinParams {
            onset_gain: f64::NAN,
            ..TwinParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
