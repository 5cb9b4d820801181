use std::path::Path;

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};

use super::{averaged_points, CalibrationMode, CalibrationModel, CalibrationPoint, CalibrationRecord, Coefficients};
use crate::{
    combiner::linear_screen_point,
    constants::POOR_CALIBRATION_ERROR_PX,
    gaze_vector::GazeVector,
    utils::mean,
    Error, Result,
};

/// Outcome of a successful fit
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub mode: CalibrationMode,
    /// Points that contributed at least one sample
    pub points_used: usize,
    /// Mean Euclidean distance between predicted and target pixels
    pub mean_error_px: f64,
    /// Per-point distance, in input order
    pub point_errors: Vec<f64>,
}

impl FitReport {
    /// Whether the mean error exceeds the poor-calibration threshold
    pub fn is_poor(&self) -> bool {
        self.mean_error_px > POOR_CALIBRATION_ERROR_PX
    }
}

/// Least-squares gaze-to-screen calibration.
///
/// A failed fit never touches the stored model.
#[derive(Debug, Clone)]
pub struct CalibrationFitter {
    mode: CalibrationMode,
    screen_width: u32,
    screen_height: u32,
    model: Option<CalibrationModel>,
    targets: Vec<(i32, i32)>,
    last_report: Option<FitReport>,
}

impl CalibrationFitter {
    pub fn new(mode: CalibrationMode, screen_width: u32, screen_height: u32) -> Self {
        Self {
            mode,
            screen_width,
            screen_height,
            model: None,
            targets: Vec::new(),
            last_report: None,
        }
    }

    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    /// Mode used by the next fit; the stored model is unaffected
    pub fn set_mode(&mut self, mode: CalibrationMode) {
        self.mode = mode;
    }

    pub fn model(&self) -> Option<&CalibrationModel> {
        self.model.as_ref()
    }

    pub fn is_calibrated(&self) -> bool {
        self.model.is_some()
    }

    /// Targets of the session that produced the current model
    pub fn targets(&self) -> &[(i32, i32)] {
        &self.targets
    }

    pub fn last_report(&self) -> Option<&FitReport> {
        self.last_report.as_ref()
    }

    /// Fit from raw calibration points, averaging each point's samples
    ///
    /// # Errors
    ///
    /// Returns `Error::InsufficientPoints` when fewer points than the mode
    /// requires carry samples, or `Error::InvalidInput` for non-finite samples
    pub fn fit(&mut self, points: &[CalibrationPoint]) -> Result<FitReport> {
        let averaged = averaged_points(points);
        if averaged.len() < points.len() {
            warn!("{} calibration point(s) had no samples", points.len() - averaged.len());
        }
        self.fit_averaged(&averaged)
    }

    /// Fit from one averaged gaze vector per target
    ///
    /// # Errors
    ///
    /// Returns `Error::InsufficientPoints` when there are too few points and
    /// `Error::InvalidInput` for a non-finite gaze vector
    pub fn fit_averaged(&mut self, data: &[((i32, i32), GazeVector)]) -> Result<FitReport> {
        if let Some((target, _)) = data.iter().find(|(_, gaze)| !gaze.iter().all(|v| v.is_finite())) {
            return Err(Error::InvalidInput(format!(
                "Non-finite gaze vector for calibration target {target:?}"
            )));
        }

        let required = self.mode.min_points();
        if data.len() < required {
            warn!(
                "Not enough calibration points for {} fit (need {required}, have {})",
                self.mode,
                data.len()
            );
            return Err(Error::InsufficientPoints {
                mode: self.mode,
                required,
                available: data.len(),
            });
        }

        let columns = self.mode.coefficient_count();
        let design = DMatrix::from_row_iterator(
            data.len(),
            columns,
            data.iter().flat_map(|(_, gaze)| self.mode.features(gaze)),
        );
        let target_x = DVector::from_iterator(data.len(), data.iter().map(|(t, _)| f64::from(t.0)));
        let target_y = DVector::from_iterator(data.len(), data.iter().map(|(t, _)| f64::from(t.1)));

        let coeff_x = solve_least_squares(&design, &target_x)?;
        let coeff_y = solve_least_squares(&design, &target_y)?;

        let coefficients = Coefficients::from_slices(self.mode, coeff_x.as_slice(), coeff_y.as_slice())?;
        let model = CalibrationModel::new(coefficients, self.screen_width, self.screen_height);

        let point_errors: Vec<f64> = data
            .iter()
            .map(|(target, gaze)| {
                let (px, py) = model.predict(gaze);
                (px - f64::from(target.0)).hypot(py - f64::from(target.1))
            })
            .collect();
        let mean_error_px = mean(&point_errors).unwrap_or(0.0);

        info!("Calibration error ({}): {mean_error_px:.1} pixels average", self.mode);
        debug!("Transform X: {:?}", coefficients.x());
        debug!("Transform Y: {:?}", coefficients.y());

        let report = FitReport {
            mode: self.mode,
            points_used: data.len(),
            mean_error_px,
            point_errors,
        };
        if report.is_poor() {
            warn!("Poor calibration quality ({mean_error_px:.1}px); consider recalibrating");
        }

        self.model = Some(model);
        self.targets = data.iter().map(|(t, _)| *t).collect();
        self.last_report = Some(report.clone());

        Ok(report)
    }

    /// Map a gaze vector to screen pixels, falling back to the linear map
    /// when no model is present. Always inside the screen.
    pub fn gaze_to_screen(&self, gaze: &GazeVector) -> (i32, i32) {
        match &self.model {
            Some(model) => model.gaze_to_screen(gaze),
            None => linear_screen_point(gaze, self.screen_width, self.screen_height),
        }
    }

    /// Persist the current model
    ///
    /// # Errors
    ///
    /// Returns `Error::NotCalibrated` without a model, or an I/O error
    pub fn save_calibration<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let model = self.model.as_ref().ok_or(Error::NotCalibrated)?;
        CalibrationRecord::from_model(model, &self.targets).save(&path)?;
        info!("Calibration ({}) saved to {}", model.mode(), path.as_ref().display());
        Ok(())
    }

    /// Replace the model with one loaded from disk; on error the current
    /// model is kept
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the record is invalid
    pub fn load_calibration<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let record = CalibrationRecord::load(&path)?;
        let model = record.to_model()?;

        if model.screen_size() != (self.screen_width, self.screen_height) {
            warn!(
                "Calibration was fitted for {:?}, current screen is {}x{}",
                model.screen_size(),
                self.screen_width,
                self.screen_height
            );
        }

        info!("Calibration ({}) loaded from {}", model.mode(), path.as_ref().display());
        self.mode = model.mode();
        self.model = Some(model);
        self.targets = record.calibration_points;
        self.last_report = None;
        Ok(())
    }
}

/// Ordinary least squares via SVD; rank-deficient systems yield the
/// minimum-norm solution
///
/// # Errors
///
/// Returns `Error::InvalidCalibration` if the decomposition is unusable
pub fn solve_least_squares(design: &DMatrix<f64>, targets: &DVector<f64>) -> Result<DVector<f64>> {
    let svd = design.clone().svd(true, true);
    let max_singular = svd.singular_values.max();
    #[allow(clippy::cast_precision_loss)]
    let tolerance = max_singular * design.nrows().max(design.ncols()) as f64 * f64::EPSILON;

    svd.solve(targets, tolerance)
        .map_err(|e| Error::InvalidCalibration(format!("Least-squares solve failed: {e}")))
}
