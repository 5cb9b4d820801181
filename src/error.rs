//! Error types for the gaze tracking library.

use crate::calibration::CalibrationMode;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization of calibration records or replay frames failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization of the configuration failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Eye corners are too close together to normalize the iris offset
    #[error("Degenerate eye geometry: eye width {width:.3}px")]
    DegenerateEyeGeometry {
        /// Measured distance between the eye corners, in pixels
        width: f64,
    },

    /// Too few calibration points for the requested regression
    #[error("Not enough calibration points for {mode} calibration (need {required}, have {available})")]
    InsufficientPoints {
        /// Regression mode that was requested
        mode: CalibrationMode,
        /// Minimum number of points for that mode
        required: usize,
        /// Number of points supplied
        available: usize,
    },

    /// The user cancelled a calibration session
    #[error("Calibration aborted")]
    CalibrationAborted,

    /// An operation needed a fitted calibration model and none is present
    #[error("No calibration model available")]
    NotCalibrated,

    /// A stored calibration record is inconsistent
    #[error("Invalid calibration record: {0}")]
    InvalidCalibration(String),

    /// The landmark source could not deliver a frame
    #[error("Landmark source error: {0}")]
    Source(String),

    /// Filter initialization or processing error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
