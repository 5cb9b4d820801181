use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use serde::{Deserialize, Serialize};

use super::{CalibrationMode, CalibrationModel, Coefficients};
use crate::{Error, Result};

/// Serialized form of a fitted calibration.
///
/// `mode` is optional on load: older records without it are classified by
/// coefficient count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<CalibrationMode>,
    pub transform_x: Vec<f64>,
    pub transform_y: Vec<f64>,
    pub screen_width: u32,
    pub screen_height: u32,
    /// Targets used during the session that produced the fit
    #[serde(default)]
    pub calibration_points: Vec<(i32, i32)>,
}

impl CalibrationRecord {
    pub fn from_model(model: &CalibrationModel, calibration_points: &[(i32, i32)]) -> Self {
        let (screen_width, screen_height) = model.screen_size();
        Self {
            mode: Some(model.mode()),
            transform_x: model.coefficients().x().to_vec(),
            transform_y: model.coefficients().y().to_vec(),
            screen_width,
            screen_height,
            calibration_points: calibration_points.to_vec(),
        }
    }

    /// Regression mode, inferred from the coefficient count when untagged
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCalibration` when no mode can be inferred
    pub fn resolved_mode(&self) -> Result<CalibrationMode> {
        match self.mode {
            Some(mode) => Ok(mode),
            None => CalibrationMode::from_coefficient_count(self.transform_x.len()).ok_or_else(|| {
                Error::InvalidCalibration(format!(
                    "Cannot infer calibration mode from {} coefficients",
                    self.transform_x.len()
                ))
            }),
        }
    }

    /// Rebuild the model
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCalibration` if the mode and coefficients disagree
    /// or the screen size is zero
    pub fn to_model(&self) -> Result<CalibrationModel> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(Error::InvalidCalibration("Screen dimensions must be greater than 0".to_string()));
        }
        if self.transform_x.iter().chain(&self.transform_y).any(|c| !c.is_finite()) {
            return Err(Error::InvalidCalibration("Coefficients must be finite".to_string()));
        }

        let mode = self.resolved_mode()?;
        let coefficients = Coefficients::from_slices(mode, &self.transform_x, &self.transform_y)?;
        Ok(CalibrationModel::new(coefficients, self.screen_width, self.screen_height))
    }

    /// Write the record as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Read a record from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
