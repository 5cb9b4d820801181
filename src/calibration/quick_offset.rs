use log::{debug, info};
use nalgebra::Vector2;

use super::session::{SampleCollector, SessionControl};
use crate::{
    constants::{
        DEFAULT_QUICK_SAMPLES_PER_POINT, DEFAULT_VERTICAL_SAMPLES, OFFSET_MAX, OFFSET_MIN, QUICK_CALIBRATION_MARGIN_PX,
        VERTICAL_TOP_EXPECTED_Y,
    },
    config::CalibrationConfig,
    gaze_vector::GazeVector,
    source::LandmarkSource,
    tracker::GazeTracker,
    utils::{mean, mean_vector, safe_cast::u32_to_i32},
    Error, Result,
};

/// Averaged gaze recorded while fixating one quick-calibration target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetMeasurement {
    pub name: &'static str,
    pub target: (i32, i32),
    pub expected: GazeVector,
    pub measured: GazeVector,
}

impl OffsetMeasurement {
    /// `expected - measured`, per axis
    pub fn error(&self) -> GazeVector {
        self.expected - self.measured
    }
}

/// Five-point additive bias corrector.
///
/// Produces a constant `(offset_x, offset_y)` correction instead of a
/// regression, suitable for quick re-centering between sessions.
#[derive(Debug, Clone)]
pub struct QuickOffsetCalibrator {
    screen_width: u32,
    screen_height: u32,
    points: [(&'static str, (i32, i32)); 5],
    samples_per_point: usize,
}

impl QuickOffsetCalibrator {
    /// Five targets laid out on a `screen_width` x `screen_height` screen.
    ///
    /// The edge margin shrinks to a quarter of the extent on small screens so
    /// the left/right and top/bottom targets never cross.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if either dimension is zero
    pub fn new(screen_width: u32, screen_height: u32) -> Result<Self> {
        if screen_width == 0 || screen_height == 0 {
            return Err(Error::InvalidInput(format!(
                "Screen dimensions must be non-zero, got {screen_width}x{screen_height}"
            )));
        }

        let w = u32_to_i32(screen_width).unwrap_or(i32::MAX);
        let h = u32_to_i32(screen_height).unwrap_or(i32::MAX);
        let margin_x = QUICK_CALIBRATION_MARGIN_PX.min(w / 4);
        let margin_y = QUICK_CALIBRATION_MARGIN_PX.min(h / 4);

        Ok(Self {
            screen_width,
            screen_height,
            points: [
                ("center", (w / 2, h / 2)),
                ("top", (w / 2, margin_y)),
                ("bottom", (w / 2, h - margin_y)),
                ("left", (margin_x, h / 2)),
                ("right", (w - margin_x, h / 2)),
            ],
            samples_per_point: DEFAULT_QUICK_SAMPLES_PER_POINT,
        })
    }

    /// Calibrator using the configured sample count per target
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if either dimension is zero
    pub fn from_config(config: &CalibrationConfig, screen_width: u32, screen_height: u32) -> Result<Self> {
        Ok(Self::new(screen_width, screen_height)?.with_samples_per_point(config.quick_samples_per_point))
    }

    pub fn with_samples_per_point(mut self, samples_per_point: usize) -> Self {
        self.samples_per_point = samples_per_point.max(1);
        self
    }

    /// Named targets in presentation order
    pub fn points(&self) -> &[(&'static str, (i32, i32)); 5] {
        &self.points
    }

    pub fn samples_per_point(&self) -> usize {
        self.samples_per_point
    }

    /// Normalized gaze a perfectly centered tracker would report for `target`
    pub fn expected_gaze(&self, target: (i32, i32)) -> GazeVector {
        Vector2::new(
            f64::from(target.0) / f64::from(self.screen_width) * 2.0 - 1.0,
            f64::from(target.1) / f64::from(self.screen_height) * 2.0 - 1.0,
        )
    }

    /// Measurement for a target from its raw samples, `None` without samples
    pub fn measure(&self, name: &'static str, target: (i32, i32), samples: &[GazeVector]) -> Option<OffsetMeasurement> {
        mean_vector(samples).map(|measured| OffsetMeasurement {
            name,
            target,
            expected: self.expected_gaze(target),
            measured,
        })
    }

    /// New offsets: `current + mean(expected - measured)`, clamped to `[-1, 1]`.
    ///
    /// Without measurements the current offsets are returned.
    pub fn compute_offsets(&self, measurements: &[OffsetMeasurement], current: (f64, f64)) -> (f64, f64) {
        let errors: Vec<GazeVector> = measurements.iter().map(OffsetMeasurement::error).collect();
        let Some(correction) = mean_vector(&errors) else {
            return current;
        };

        for m in measurements {
            debug!(
                "{:8}: expected ({:+.2}, {:+.2}) measured ({:+.2}, {:+.2})",
                m.name, m.expected.x, m.expected.y, m.measured.x, m.measured.y
            );
        }

        (
            (current.0 + correction.x).clamp(OFFSET_MIN, OFFSET_MAX),
            (current.1 + correction.y).clamp(OFFSET_MIN, OFFSET_MAX),
        )
    }

    /// Run the five-point procedure against a live source and return the
    /// corrected offsets. The tracker's offsets are not modified.
    ///
    /// # Errors
    ///
    /// Returns `Error::CalibrationAborted` if the user aborts, or a source
    /// error if frames run out
    pub fn run<S, C>(&self, tracker: &mut GazeTracker, source: &mut S, control: &mut C) -> Result<(f64, f64)>
    where
        S: LandmarkSource + ?Sized,
        C: SessionControl + ?Sized,
    {
        let collector = SampleCollector::new(self.samples_per_point).with_filter_reset(false);
        let mut measurements = Vec::with_capacity(self.points.len());

        for &(name, target) in &self.points {
            info!("Look at: {}", name.to_uppercase());
            let samples = collector.collect(tracker, source, control, target)?;
            measurements.extend(self.measure(name, target, &samples));
        }

        let offsets = self.compute_offsets(&measurements, tracker.config().offset());
        info!("Computed offsets: X={:+.2}, Y={:+.2}", offsets.0, offsets.1);
        Ok(offsets)
    }

    /// Vertical-only correction from gaze_y samples taken while looking at
    /// the top of the screen. Without samples `current_offset_y` is returned.
    pub fn vertical_offset_correction(samples: &[f64], current_offset_y: f64) -> f64 {
        mean(samples).map_or(current_offset_y, |measured| {
            (current_offset_y + (VERTICAL_TOP_EXPECTED_Y - measured)).clamp(OFFSET_MIN, OFFSET_MAX)
        })
    }

    /// Record gaze_y at the top of the screen and return the corrected
    /// vertical offset
    ///
    /// # Errors
    ///
    /// Returns `Error::CalibrationAborted` if the user aborts, or a source
    /// error if frames run out
    pub fn run_vertical<S, C>(&self, tracker: &mut GazeTracker, source: &mut S, control: &mut C) -> Result<f64>
    where
        S: LandmarkSource + ?Sized,
        C: SessionControl + ?Sized,
    {
        let collector = SampleCollector::new(DEFAULT_VERTICAL_SAMPLES).with_filter_reset(false);
        let (top_x, _) = self.points[1].1;
        let target = (top_x, 0);
        let samples: Vec<f64> = collector
            .collect(tracker, source, control, target)?
            .iter()
            .map(|g| g.y)
            .collect();

        let offset_y = Self::vertical_offset_correction(&samples, tracker.config().offset().1);
        info!("Computed Y offset: {offset_y:+.2}");
        Ok(offset_y)
    }
}
