//! Bi-ocular combination and screen mapping.

use log::warn;
use nalgebra::Point2;

use crate::{
    calibration::CalibrationModel,
    constants::{BINOCULAR_CONFIDENCE, MONOCULAR_CONFIDENCE},
    filters::{exponential::ExponentialSmoother, GazeFilter},
    gaze_vector::GazeVector,
    utils::safe_cast::to_pixel,
};

/// Filtered gaze of one eye together with the iris pixel it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeSample {
    pub gaze: GazeVector,
    pub iris_center: Point2<f64>,
}

/// Per-frame tracker output
#[derive(Debug, Clone, PartialEq)]
pub struct GazeEstimate {
    pub left: Option<GazeVector>,
    pub right: Option<GazeVector>,
    pub combined: GazeVector,
    /// 1.0 with both eyes, 0.7 with one
    pub confidence: f64,
    /// Smoothed screen position in pixels
    pub screen_point: (i32, i32),
    pub left_iris_center: Option<Point2<f64>>,
    pub right_iris_center: Option<Point2<f64>>,
}

/// Linear gaze-to-screen map used before calibration, clamped into the screen
pub fn linear_screen_point(gaze: &GazeVector, screen_width: u32, screen_height: u32) -> (i32, i32) {
    let x = (gaze.x + 1.0) / 2.0 * f64::from(screen_width);
    let y = (gaze.y + 1.0) / 2.0 * f64::from(screen_height);
    (to_pixel(x, screen_width), to_pixel(y, screen_height))
}

/// Merges per-eye vectors into one confidence-scored estimate
pub struct GazeCombiner {
    combined_filter: Box<dyn GazeFilter>,
    smoother: ExponentialSmoother,
    screen_width: u32,
    screen_height: u32,
    calibration: Option<CalibrationModel>,
}

impl GazeCombiner {
    pub fn new(combined_filter: Box<dyn GazeFilter>, smoothing_factor: f64, screen_width: u32, screen_height: u32) -> Self {
        Self {
            combined_filter,
            smoother: ExponentialSmoother::new(smoothing_factor),
            screen_width,
            screen_height,
            calibration: None,
        }
    }

    /// Combine one frame's eye samples.
    ///
    /// Both eyes are averaged and passed through the combined filter; a
    /// single eye is used directly. Returns `None` when neither eye is
    /// available, leaving the smoothed screen point where it was.
    pub fn process(&mut self, left: Option<EyeSample>, right: Option<EyeSample>) -> Option<GazeEstimate> {
        let (combined, confidence) = match (left, right) {
            (Some(l), Some(r)) => {
                let average = (l.gaze + r.gaze) / 2.0;
                (self.combined_filter.update(average), BINOCULAR_CONFIDENCE)
            }
            (Some(only), None) | (None, Some(only)) => (only.gaze, MONOCULAR_CONFIDENCE),
            (None, None) => return None,
        };

        let raw_point = self.map_to_screen(&combined);
        let screen_point = self.smoother.apply(raw_point);

        Some(GazeEstimate {
            left: left.map(|s| s.gaze),
            right: right.map(|s| s.gaze),
            combined,
            confidence,
            screen_point,
            left_iris_center: left.map(|s| s.iris_center),
            right_iris_center: right.map(|s| s.iris_center),
        })
    }

    /// Unsmoothed screen position, through the calibration when one is set
    pub fn map_to_screen(&self, gaze: &GazeVector) -> (i32, i32) {
        match &self.calibration {
            Some(model) => model.gaze_to_screen(gaze),
            None => linear_screen_point(gaze, self.screen_width, self.screen_height),
        }
    }

    /// Use a fitted calibration in place of the linear map
    pub fn set_calibration(&mut self, model: CalibrationModel) {
        if model.screen_size() != (self.screen_width, self.screen_height) {
            warn!(
                "Calibration targets {:?} but the combiner maps to {}x{}",
                model.screen_size(),
                self.screen_width,
                self.screen_height
            );
        }
        self.calibration = Some(model);
    }

    /// Return to the linear map
    pub fn clear_calibration(&mut self) -> Option<CalibrationModel> {
        self.calibration.take()
    }

    pub fn calibration(&self) -> Option<&CalibrationModel> {
        self.calibration.as_ref()
    }

    /// Last emitted screen point
    pub fn last_screen_point(&self) -> Option<(i32, i32)> {
        self.smoother.previous()
    }

    pub fn combined_filter(&self) -> &dyn GazeFilter {
        self.combined_filter.as_ref()
    }

    /// Reset the combined filter and forget the previous screen point
    pub fn reset(&mut self) {
        self.combined_filter.reset();
        self.smoother.reset();
    }
}
