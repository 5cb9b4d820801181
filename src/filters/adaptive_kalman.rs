//! Kalman filter whose noise follows the recent gaze velocity.
//!
//! While the gaze dwells the measurement noise is inflated so the filter leans
//! on its prediction and holds a fixation steady; during a saccade the noise is
//! deflated so the estimate follows the eye with little lag. Between the two
//! thresholds the multiplier is blended with a smoothstep, which has zero slope
//! at both ends.

use std::collections::VecDeque;

use log::trace;
use nalgebra::{Matrix2, Matrix4, Vector2, Vector4};

use super::{kalman::positive_noise, kalman::KalmanState, GazeFilter};
use crate::{
    config::TrackerConfig,
    constants::{
        DEFAULT_DWELL_MULTIPLIER, DEFAULT_HIGH_VELOCITY_THRESHOLD, DEFAULT_LOW_VELOCITY_THRESHOLD,
        DEFAULT_RAPID_MULTIPLIER, MAX_NOISE_MULTIPLIER, MIN_NOISE, MIN_NOISE_MULTIPLIER, MIN_THRESHOLD_GAP,
        PROCESS_NOISE_SCALE_MAX, PROCESS_NOISE_SCALE_MIN, VELOCITY_HISTORY_SIZE,
    },
};

/// Velocity thresholds and noise multipliers of the adaptive filter.
///
/// Constructed only through [`AdaptiveSchedule::new`], which enforces
/// `0 < low < high`, `dwell >= 1` and `0 < rapid <= 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveSchedule {
    low_threshold: f64,
    high_threshold: f64,
    dwell_multiplier: f64,
    rapid_multiplier: f64,
}

impl AdaptiveSchedule {
    /// Build a schedule, clamping each parameter into its valid range
    #[must_use]
    pub fn new(low_threshold: f64, high_threshold: f64, dwell_multiplier: f64, rapid_multiplier: f64) -> Self {
        let low = finite_or(low_threshold, DEFAULT_LOW_VELOCITY_THRESHOLD).max(MIN_NOISE);
        let high = finite_or(high_threshold, DEFAULT_HIGH_VELOCITY_THRESHOLD).max(low + MIN_THRESHOLD_GAP);
        let dwell = finite_or(dwell_multiplier, DEFAULT_DWELL_MULTIPLIER).clamp(1.0, MAX_NOISE_MULTIPLIER);
        let rapid = finite_or(rapid_multiplier, DEFAULT_RAPID_MULTIPLIER).clamp(MIN_NOISE_MULTIPLIER, 1.0);

        Self {
            low_threshold: low,
            high_threshold: high,
            dwell_multiplier: dwell,
            rapid_multiplier: rapid,
        }
    }

    pub fn low_threshold(&self) -> f64 {
        self.low_threshold
    }

    pub fn high_threshold(&self) -> f64 {
        self.high_threshold
    }

    pub fn dwell_multiplier(&self) -> f64 {
        self.dwell_multiplier
    }

    pub fn rapid_multiplier(&self) -> f64 {
        self.rapid_multiplier
    }

    /// Measurement noise multiplier for a given velocity
    pub fn measurement_multiplier(&self, velocity: f64) -> f64 {
        if velocity <= self.low_threshold {
            self.dwell_multiplier
        } else if velocity >= self.high_threshold {
            self.rapid_multiplier
        } else {
            let t = (velocity - self.low_threshold) / (self.high_threshold - self.low_threshold);
            let smooth_t = t * t * (3.0 - 2.0 * t);
            self.dwell_multiplier + smooth_t * (self.rapid_multiplier - self.dwell_multiplier)
        }
    }

    /// Process noise scale for a given velocity
    pub fn process_scale(&self, velocity: f64) -> f64 {
        (velocity / self.high_threshold).clamp(PROCESS_NOISE_SCALE_MIN, PROCESS_NOISE_SCALE_MAX)
    }
}

impl Default for AdaptiveSchedule {
    fn default() -> Self {
        Self {
            low_threshold: DEFAULT_LOW_VELOCITY_THRESHOLD,
            high_threshold: DEFAULT_HIGH_VELOCITY_THRESHOLD,
            dwell_multiplier: DEFAULT_DWELL_MULTIPLIER,
            rapid_multiplier: DEFAULT_RAPID_MULTIPLIER,
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Constant-velocity Kalman filter with velocity-scheduled noise
#[derive(Debug, Clone)]
pub struct AdaptiveKalmanFilter {
    kalman: KalmanState,
    base_process_noise: f64,
    base_measurement_noise: f64,
    schedule: AdaptiveSchedule,
    velocity_history: VecDeque<f64>,
    current_process_noise: f64,
    current_measurement_noise: f64,
}

impl AdaptiveKalmanFilter {
    /// Create a filter with the given noise bases and schedule
    #[must_use]
    pub fn new(base_process_noise: f64, base_measurement_noise: f64, schedule: AdaptiveSchedule) -> Self {
        let q = positive_noise(base_process_noise);
        let r = positive_noise(base_measurement_noise);
        Self {
            kalman: KalmanState::new(),
            base_process_noise: q,
            base_measurement_noise: r,
            schedule,
            velocity_history: VecDeque::with_capacity(VELOCITY_HISTORY_SIZE),
            current_process_noise: q,
            current_measurement_noise: r,
        }
    }

    /// Create a filter from the tracker's noise bases and schedule
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.process_noise(), config.measurement_noise(), config.schedule())
    }

    /// Mean of the recent velocity magnitudes, or the current velocity when
    /// no history has been recorded yet
    pub fn smoothed_velocity(&self) -> f64 {
        if self.velocity_history.is_empty() {
            return self.kalman.velocity();
        }
        self.velocity_history.iter().sum::<f64>() / self.velocity_history.len() as f64
    }

    /// Measurement noise multiplier this filter applies at `velocity`
    pub fn measurement_noise_multiplier(&self, velocity: f64) -> f64 {
        self.schedule.measurement_multiplier(velocity)
    }

    /// Advance the state one frame with velocity-scaled process noise
    pub fn predict(&mut self) -> Vector2<f64> {
        if !self.kalman.is_initialized() {
            return self.kalman.position();
        }

        let velocity = self.smoothed_velocity();
        self.current_process_noise = self.base_process_noise * self.schedule.process_scale(velocity);
        let process_noise = Matrix4::identity() * self.current_process_noise;
        self.kalman.predict(&process_noise);

        self.kalman.position()
    }

    /// Fold in a measurement and return the filtered position.
    ///
    /// The first measurement after construction or reset is returned as-is.
    pub fn update(&mut self, measurement: Vector2<f64>) -> Vector2<f64> {
        if !self.kalman.is_initialized() {
            self.kalman.initialize(measurement);
            return measurement;
        }

        self.predict();

        let velocity = self.smoothed_velocity();
        self.current_measurement_noise = self.base_measurement_noise * self.schedule.measurement_multiplier(velocity);
        let measurement_noise = Matrix2::identity() * self.current_measurement_noise;
        self.kalman.correct(measurement, &measurement_noise);

        self.record_velocity();
        trace!(
            "adaptive kalman: velocity={:.4} R={:.3e} Q={:.3e}",
            velocity,
            self.current_measurement_noise,
            self.current_process_noise
        );

        self.kalman.position()
    }

    fn record_velocity(&mut self) {
        if self.velocity_history.len() >= VELOCITY_HISTORY_SIZE {
            self.velocity_history.pop_front();
        }
        self.velocity_history.push_back(self.kalman.velocity());
    }

    /// Clear state, velocity history and adaptive noise values
    pub fn reset(&mut self) {
        self.kalman.reset();
        self.velocity_history.clear();
        self.current_process_noise = self.base_process_noise;
        self.current_measurement_noise = self.base_measurement_noise;
    }

    /// True while the smoothed velocity is at or below the low threshold
    pub fn is_dwelling(&self) -> bool {
        self.smoothed_velocity() <= self.schedule.low_threshold()
    }

    /// Measurement noise used by the most recent update
    pub fn current_measurement_noise(&self) -> f64 {
        self.current_measurement_noise
    }

    /// Process noise used by the most recent prediction
    pub fn current_process_noise(&self) -> f64 {
        self.current_process_noise
    }

    pub fn schedule(&self) -> &AdaptiveSchedule {
        &self.schedule
    }

    /// Current velocity magnitude
    pub fn velocity(&self) -> f64 {
        self.kalman.velocity()
    }

    /// Full state vector `[x, y, vx, vy]`
    pub fn state(&self) -> &Vector4<f64> {
        self.kalman.state()
    }

    /// State covariance
    pub fn covariance(&self) -> &Matrix4<f64> {
        self.kalman.covariance()
    }

    pub fn is_initialized(&self) -> bool {
        self.kalman.is_initialized()
    }
}

impl Default for AdaptiveKalmanFilter {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

impl GazeFilter for AdaptiveKalmanFilter {
    fn update(&mut self, measurement: Vector2<f64>) -> Vector2<f64> {
        Self::update(self, measurement)
    }

    fn predict(&mut self) -> Vector2<f64> {
        Self::predict(self)
    }

    fn reset(&mut self) {
        Self::reset(self);
    }

    fn velocity(&self) -> f64 {
        Self::velocity(self)
    }

    fn is_initialized(&self) -> bool {
        Self::is_initialized(self)
    }

    fn is_dwelling(&self) -> Option<bool> {
        Some(Self::is_dwelling(self))
    }

    fn name(&self) -> &str {
        "AdaptiveKalmanFilter"
    }
}
