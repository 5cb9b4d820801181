//! Temporal filters for smoothing noisy gaze measurements.
//!
//! Per-eye and combined gaze vectors pass through one of the Kalman variants;
//! the exponential smoother damps the final screen point.

/// Constant-velocity Kalman filter with fixed noise
pub mod kalman;

/// Kalman filter with velocity-scheduled noise
pub mod adaptive_kalman;

/// Exponential smoothing of screen points
pub mod exponential;

use std::{fmt, str::FromStr};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{config::TrackerConfig, Error, Result};

/// Trait for all gaze vector filters
pub trait GazeFilter: Send + Sync {
    /// Fold in a measurement and return the filtered position
    fn update(&mut self, measurement: Vector2<f64>) -> Vector2<f64>;

    /// Advance the state one frame without a measurement
    fn predict(&mut self) -> Vector2<f64>;

    /// Reset filter state
    fn reset(&mut self);

    /// Current velocity magnitude
    fn velocity(&self) -> f64;

    /// Whether the filter has received a measurement since the last reset
    fn is_initialized(&self) -> bool;

    /// Filter-confirmed fixation, for filters that track it
    fn is_dwelling(&self) -> Option<bool> {
        None
    }

    /// Get filter name
    fn name(&self) -> &str;
}

/// Filter variants selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Fixed-noise constant-velocity Kalman filter
    #[default]
    Kalman,
    /// Velocity-scheduled Kalman filter
    Adaptive,
}

impl FilterKind {
    /// Build a filter of this kind from the tracker's tunables
    pub fn build(self, config: &TrackerConfig) -> Box<dyn GazeFilter> {
        match self {
            Self::Kalman => Box::new(kalman::ConstantVelocityKalmanFilter::from_config(config)),
            Self::Adaptive => Box::new(adaptive_kalman::AdaptiveKalmanFilter::from_config(config)),
        }
    }
}

impl FromStr for FilterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "kalman" | "constant_velocity" => Ok(Self::Kalman),
            "adaptive" | "adaptive_kalman" => Ok(Self::Adaptive),
            _ => Err(Error::FilterError(format!("Unknown filter type: {s}"))),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kalman => write!(f, "kalman"),
            Self::Adaptive => write!(f, "adaptive"),
        }
    }
}

/// Create a gaze filter by type name
///
/// # Errors
///
/// Returns `Error::FilterError` for an unknown name
pub fn create_filter(filter_type: &str, config: &TrackerConfig) -> Result<Box<dyn GazeFilter>> {
    Ok(filter_type.parse::<FilterKind>()?.build(config))
}
