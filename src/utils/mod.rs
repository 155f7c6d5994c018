//! Utilities module for logging, errors, and small helpers
//!
//! This module provides:
//! - Structured logging with tracing
//! - Error handling types
//! - Numeric clamping helpers shared by the twin engine and the heuristic

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{GreenTwinError, Result};
pub use logging::init_logging;

/// Clamp a value into `[0.0, 1.0]`. NaN maps to 0.0.
pub fn clamp_unit(value: f64) -> f64 {
    clamp_range(value, 0.0, 1.0)
}

/// Clamp a value into `[min, max]`. NaN maps to `min`.
pub fn clamp_range(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// Format a ratio as a percentage with one decimal
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}
