//! Gaze-to-screen calibration.
//!
//! Two strategies are provided:
//! - [`CalibrationFitter`] fits an affine or second-order polynomial map from
//!   averaged gaze vectors to known target pixels by least squares.
//! - [`QuickOffsetCalibrator`] measures a constant bias at five canonical
//!   points and folds it into the estimator offsets.
//!
//! [`session`] drives either strategy from a live landmark source.

/// Fitted gaze-to-screen transform
pub mod model;

/// On-disk calibration record
pub mod record;

/// Least-squares calibration fitting
pub mod fitter;

/// Five-point additive offset calibration
pub mod quick_offset;

/// Interactive sample collection from a landmark source
pub mod session;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use fitter::{CalibrationFitter, FitReport};
pub use model::{CalibrationModel, Coefficients};
pub use quick_offset::{OffsetMeasurement, QuickOffsetCalibrator};
pub use record::CalibrationRecord;

use crate::{
    constants::{MIN_AFFINE_POINTS, MIN_POLYNOMIAL_POINTS},
    gaze_vector::GazeVector,
    utils::mean_vector,
    Error, Result,
};

/// Regression family used to map gaze vectors to screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationMode {
    /// `screen = a0 + a1*gx + a2*gy`
    Affine,
    /// `screen = a0 + a1*gx + a2*gy + a3*gx^2 + a4*gy^2 + a5*gx*gy`
    Polynomial,
}

impl CalibrationMode {
    /// Coefficients per screen axis
    pub const fn coefficient_count(self) -> usize {
        match self {
            Self::Affine => 3,
            Self::Polynomial => 6,
        }
    }

    /// Fewest calibration points the fit accepts
    pub const fn min_points(self) -> usize {
        match self {
            Self::Affine => MIN_AFFINE_POINTS,
            Self::Polynomial => MIN_POLYNOMIAL_POINTS,
        }
    }

    /// Mode whose coefficient vectors have `len` entries
    pub const fn from_coefficient_count(len: usize) -> Option<Self> {
        match len {
            3 => Some(Self::Affine),
            6 => Some(Self::Polynomial),
            _ => None,
        }
    }

    /// Design matrix row for a gaze vector
    pub fn features(self, gaze: &GazeVector) -> Vec<f64> {
        let (gx, gy) = (gaze.x, gaze.y);
        match self {
            Self::Affine => vec![1.0, gx, gy],
            Self::Polynomial => vec![1.0, gx, gy, gx * gx, gy * gy, gx * gy],
        }
    }
}

impl fmt::Display for CalibrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Affine => write!(f, "affine"),
            Self::Polynomial => write!(f, "polynomial"),
        }
    }
}

impl FromStr for CalibrationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "affine" => Ok(Self::Affine),
            "polynomial" | "poly" => Ok(Self::Polynomial),
            _ => Err(Error::InvalidInput(format!("Unknown calibration mode: {s}"))),
        }
    }
}

/// A target screen position and the gaze samples recorded while fixating it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// Target position in screen pixels
    pub target: (i32, i32),
    /// Raw combined gaze vectors
    pub samples: Vec<GazeVector>,
}

impl CalibrationPoint {
    pub fn new(target: (i32, i32), samples: Vec<GazeVector>) -> Self {
        Self { target, samples }
    }

    /// Representative gaze vector, `None` if no samples were recorded
    pub fn average(&self) -> Option<GazeVector> {
        mean_vector(&self.samples)
    }
}

/// Calibration target layout.
///
/// Five points are the four corners at `margin` plus the screen center; nine
/// points form a 3x3 grid spanning the screen inside `margin`. `margin` is a
/// fraction of each screen dimension.
///
/// # Errors
///
/// Returns `Error::InvalidInput` for any point count other than 5 or 9
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // margin is a small fraction of the screen
pub fn calibration_targets(num_points: usize, screen_width: u32, screen_height: u32, margin: f64) -> Result<Vec<(i32, i32)>> {
    let width = i64::from(screen_width);
    let height = i64::from(screen_height);
    let margin = margin.clamp(0.0, 0.5);
    let margin_x = (f64::from(screen_width) * margin) as i64;
    let margin_y = (f64::from(screen_height) * margin) as i64;

    let points: Vec<(i64, i64)> = match num_points {
        5 => vec![
            (margin_x, margin_y),
            (width - margin_x, margin_y),
            (width / 2, height / 2),
            (margin_x, height - margin_y),
            (width - margin_x, height - margin_y),
        ],
        9 => (0..3)
            .flat_map(|row| {
                (0..3).map(move |col| {
                    (
                        margin_x + col * (width - 2 * margin_x) / 2,
                        margin_y + row * (height - 2 * margin_y) / 2,
                    )
                })
            })
            .collect(),
        n => {
            return Err(Error::InvalidInput(format!(
                "Calibration supports 5 or 9 points, got {n}"
            )))
        }
    };

    points
        .into_iter()
        .map(|(x, y)| Ok((pixel_coord(x)?, pixel_coord(y)?)))
        .collect()
}

fn pixel_coord(value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidInput(format!("Coordinate {value} out of range")))
}

/// Average each point's samples, skipping points that recorded nothing
pub fn averaged_points(points: &[CalibrationPoint]) -> Vec<((i32, i32), GazeVector)> {
    points
        .iter()
        .filter_map(|p| p.average().map(|avg| (p.target, avg)))
        .collect()
}
