//! Digital twin of a plant's physiological condition
//!
//! - `state`: the bounded [`PlantState`] record and the health score formula
//! - `engine`: stress and disease-observation transitions

pub mod engine;
pub mod state;

pub use engine::{TwinEngine, TwinParams, HEALTHY_OBSERVATION};
pub use state::{health_score_for, PlantState, MAX_HEALTH_SCORE};
