use nalgebra::{Vector3, Vector6};

use super::CalibrationMode;
use crate::{gaze_vector::GazeVector, utils::safe_cast::to_pixel, Error, Result};

/// Per-axis regression coefficients, sized by the calibration mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coefficients {
    Affine { x: Vector3<f64>, y: Vector3<f64> },
    Polynomial { x: Vector6<f64>, y: Vector6<f64> },
}

impl Coefficients {
    /// Build coefficients from per-axis slices whose length must match `mode`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCalibration` on a length mismatch
    pub fn from_slices(mode: CalibrationMode, x: &[f64], y: &[f64]) -> Result<Self> {
        let expected = mode.coefficient_count();
        if x.len() != expected || y.len() != expected {
            return Err(Error::InvalidCalibration(format!(
                "{mode} calibration needs {expected} coefficients per axis, got {} and {}",
                x.len(),
                y.len()
            )));
        }

        Ok(match mode {
            CalibrationMode::Affine => Self::Affine {
                x: Vector3::from_column_slice(x),
                y: Vector3::from_column_slice(y),
            },
            CalibrationMode::Polynomial => Self::Polynomial {
                x: Vector6::from_column_slice(x),
                y: Vector6::from_column_slice(y),
            },
        })
    }

    pub fn mode(&self) -> CalibrationMode {
        match self {
            Self::Affine { .. } => CalibrationMode::Affine,
            Self::Polynomial { .. } => CalibrationMode::Polynomial,
        }
    }

    /// Horizontal coefficients
    pub fn x(&self) -> &[f64] {
        match self {
            Self::Affine { x, .. } => x.as_slice(),
            Self::Polynomial { x, .. } => x.as_slice(),
        }
    }

    /// Vertical coefficients
    pub fn y(&self) -> &[f64] {
        match self {
            Self::Affine { y, .. } => y.as_slice(),
            Self::Polynomial { y, .. } => y.as_slice(),
        }
    }

    /// Continuous screen position for a gaze vector
    pub fn apply(&self, gaze: &GazeVector) -> (f64, f64) {
        let (gx, gy) = (gaze.x, gaze.y);
        match self {
            Self::Affine { x, y } => {
                let features = Vector3::new(1.0, gx, gy);
                (x.dot(&features), y.dot(&features))
            }
            Self::Polynomial { x, y } => {
                let features = Vector6::new(1.0, gx, gy, gx * gx, gy * gy, gx * gy);
                (x.dot(&features), y.dot(&features))
            }
        }
    }
}

/// A fitted gaze-to-screen transform.
///
/// Immutable once built; a new fit or load replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationModel {
    coefficients: Coefficients,
    screen_width: u32,
    screen_height: u32,
}

impl CalibrationModel {
    pub fn new(coefficients: Coefficients, screen_width: u32, screen_height: u32) -> Self {
        Self {
            coefficients,
            screen_width,
            screen_height,
        }
    }

    pub fn mode(&self) -> CalibrationMode {
        self.coefficients.mode()
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    /// Screen dimensions the model was fitted for
    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }

    /// Unclamped screen position, used for diagnostics
    pub fn predict(&self, gaze: &GazeVector) -> (f64, f64) {
        self.coefficients.apply(gaze)
    }

    /// Map a gaze vector to integer pixels inside `[0, W-1] x [0, H-1]`
    pub fn gaze_to_screen(&self, gaze: &GazeVector) -> (i32, i32) {
        let (x, y) = self.predict(gaze);
        (to_pixel(x, self.screen_width), to_pixel(y, self.screen_height))
    }
}
