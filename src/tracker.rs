//! Frame-at-a-time gaze tracking session.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    calibration::CalibrationModel,
    combiner::{EyeSample, GazeCombiner, GazeEstimate},
    config::{Config, TrackerConfig},
    constants::{BLINK_THRESHOLD_PX, LATENCY_WINDOW, OFFSET_STEP, SENSITIVITY_STEP},
    filters::{FilterKind, GazeFilter},
    gaze_vector::GazeVectorEstimator,
    landmarks::{Eye, FaceLandmarks},
    source::Frame,
};

/// Owns the estimator tunables, the per-eye filters and the combiner.
///
/// Each filter instance holds its own state; none are shared. Calls must be
/// serialized by the caller.
pub struct GazeTracker {
    config: TrackerConfig,
    filter_kind: FilterKind,
    left_filter: Box<dyn GazeFilter>,
    right_filter: Box<dyn GazeFilter>,
    combiner: GazeCombiner,
    landmark_info_logged: bool,
    frame_times: VecDeque<Duration>,
}

impl GazeTracker {
    pub fn new(config: TrackerConfig, filter_kind: FilterKind, screen_width: u32, screen_height: u32, smoothing_factor: f64) -> Self {
        Self {
            left_filter: filter_kind.build(&config),
            right_filter: filter_kind.build(&config),
            combiner: GazeCombiner::new(filter_kind.build(&config), smoothing_factor, screen_width, screen_height),
            config,
            filter_kind,
            landmark_info_logged: false,
            frame_times: VecDeque::with_capacity(LATENCY_WINDOW),
        }
    }

    /// Build a tracker from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.tracker_config(),
            config.filter.kind,
            config.screen.width,
            config.screen.height,
            config.combiner.smoothing_factor,
        )
    }

    /// Process one frame. Returns `None` when no face was found or both
    /// eyes were closed or unreadable.
    pub fn process_frame(&mut self, frame: &Frame) -> Option<GazeEstimate> {
        let start = Instant::now();

        let estimate = frame
            .landmarks
            .as_ref()
            .and_then(|landmarks| self.process_landmarks(landmarks, frame.width, frame.height));

        self.record_latency(start.elapsed());
        estimate
    }

    fn process_landmarks(&mut self, landmarks: &FaceLandmarks, width: u32, height: u32) -> Option<GazeEstimate> {
        if !self.landmark_info_logged {
            info!("Face detected with {} landmarks", landmarks.len());
            if landmarks.has_iris() {
                info!("Iris landmarks available");
            } else {
                warn!("Iris landmarks missing, using eye contour fallback");
            }
            self.landmark_info_logged = true;
        }

        let left = self.eye_sample(landmarks, Eye::Left, width, height);
        let right = self.eye_sample(landmarks, Eye::Right, width, height);

        self.combiner.process(left, right)
    }

    fn eye_sample(&mut self, landmarks: &FaceLandmarks, eye: Eye, width: u32, height: u32) -> Option<EyeSample> {
        let geometry = landmarks.eye_geometry(eye, width, height)?;
        if geometry.is_closed(BLINK_THRESHOLD_PX) {
            debug!("{eye} eye closed ({:.1}px)", geometry.openness());
            return None;
        }

        let gaze = match GazeVectorEstimator::new(&self.config).estimate(&geometry) {
            Ok(gaze) => gaze,
            Err(e) => {
                debug!("Skipping {eye} eye: {e}");
                return None;
            }
        };

        let filter = match eye {
            Eye::Left => &mut self.left_filter,
            Eye::Right => &mut self.right_filter,
        };

        Some(EyeSample {
            gaze: filter.update(gaze),
            iris_center: geometry.iris,
        })
    }

    fn record_latency(&mut self, elapsed: Duration) {
        if self.frame_times.len() == LATENCY_WINDOW {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(elapsed);
    }

    /// Mean processing time over the last 30 frames, in milliseconds
    #[allow(clippy::cast_precision_loss)] // At most LATENCY_WINDOW entries
    pub fn average_latency_ms(&self) -> Option<f64> {
        if self.frame_times.is_empty() {
            return None;
        }
        let total: Duration = self.frame_times.iter().sum();
        Some(total.as_secs_f64() * 1000.0 / self.frame_times.len() as f64)
    }

    /// Reset all three filters and the screen smoothing
    pub fn reset_filters(&mut self) {
        self.left_filter.reset();
        self.right_filter.reset();
        self.combiner.reset();
        debug!("Filters reset");
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn filter_kind(&self) -> FilterKind {
        self.filter_kind
    }

    pub fn combiner(&self) -> &GazeCombiner {
        &self.combiner
    }

    /// Set both sensitivities, clamped to `[0.5, 5.0]`
    pub fn set_sensitivity(&mut self, x: f64, y: f64) {
        self.config.set_sensitivity(x, y);
    }

    /// Set both offsets, clamped to `[-1, 1]`
    pub fn set_offset(&mut self, x: f64, y: f64) {
        self.config.set_offset(x, y);
    }

    /// Step both sensitivities up or down by one increment
    pub fn step_sensitivity(&mut self, increase: bool) {
        let delta = if increase { SENSITIVITY_STEP } else { -SENSITIVITY_STEP };
        self.config.adjust_sensitivity(delta);
        let (x, y) = self.config.sensitivity();
        info!("Sensitivity: X={x:.1}, Y={y:.1}");
    }

    /// Nudge the offsets by whole increments, e.g. `(0, -1)` moves the gaze up
    pub fn step_offset(&mut self, steps_x: i32, steps_y: i32) {
        self.config
            .nudge_offset(f64::from(steps_x) * OFFSET_STEP, f64::from(steps_y) * OFFSET_STEP);
        let (x, y) = self.config.offset();
        info!("Offset: X={x:+.2}, Y={y:+.2}");
    }

    /// Zero both offsets
    pub fn reset_offset(&mut self) {
        self.config.set_offset(0.0, 0.0);
    }

    /// Map through a fitted calibration from now on
    pub fn set_calibration(&mut self, model: CalibrationModel) {
        self.combiner.set_calibration(model);
    }

    /// Filter-confirmed fixation of the combined gaze, when the filter kind
    /// tracks it
    pub fn is_dwelling(&self) -> Option<bool> {
        self.combiner.combined_filter().is_dwelling()
    }
}
