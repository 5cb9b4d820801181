use log::warn;
use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};

use super::GazeFilter;
use crate::{config::TrackerConfig, constants::MIN_NOISE};

/// State, covariance and model matrices of a constant-velocity filter.
///
/// Each filter instance owns one of these; nothing is shared between
/// instances.
#[derive(Debug, Clone)]
pub(crate) struct KalmanState {
    // State: [x, y, vx, vy]
    state: Vector4<f64>,
    // State covariance
    covariance: Matrix4<f64>,
    // State transition matrix
    transition: Matrix4<f64>,
    // Measurement matrix
    observation: Matrix2x4<f64>,
    initialized: bool,
}

impl KalmanState {
    pub(crate) fn new() -> Self {
        // Unit time step: one frame
        let transition = Matrix4::new(
            1.0, 0.0, 1.0, 0.0,
            0.0, 1.0, 0.0, 1.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        // We only measure position
        let observation = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        );

        Self {
            state: Vector4::zeros(),
            covariance: Matrix4::identity(),
            transition,
            observation,
            initialized: false,
        }
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn position(&self) -> Vector2<f64> {
        Vector2::new(self.state[0], self.state[1])
    }

    pub(crate) fn velocity(&self) -> f64 {
        self.state[2].hypot(self.state[3])
    }

    pub(crate) fn state(&self) -> &Vector4<f64> {
        &self.state
    }

    pub(crate) fn covariance(&self) -> &Matrix4<f64> {
        &self.covariance
    }

    /// Seed the position from a raw measurement with zero velocity
    pub(crate) fn initialize(&mut self, measurement: Vector2<f64>) {
        self.state = Vector4::new(measurement.x, measurement.y, 0.0, 0.0);
        self.initialized = true;
    }

    pub(crate) fn predict(&mut self, process_noise: &Matrix4<f64>) {
        self.state = self.transition * self.state;
        self.covariance = self.transition * self.covariance * self.transition.transpose() + process_noise;
    }

    pub(crate) fn correct(&mut self, measurement: Vector2<f64>, measurement_noise: &Matrix2<f64>) {
        let innovation = measurement - self.observation * self.state;

        let innovation_cov = self.observation * self.covariance * self.observation.transpose() + measurement_noise;

        // R is positive definite, so this only fails on non-finite input
        let Some(innovation_inv) = innovation_cov.try_inverse() else {
            warn!("Singular innovation covariance, skipping measurement update");
            return;
        };

        let gain = self.covariance * self.observation.transpose() * innovation_inv;

        self.state += gain * innovation;

        let identity = Matrix4::identity();
        self.covariance = (identity - gain * self.observation) * self.covariance;
    }

    pub(crate) fn reset(&mut self) {
        self.state = Vector4::zeros();
        self.covariance = Matrix4::identity();
        self.initialized = false;
    }
}

/// Constant-velocity Kalman filter with fixed process and measurement noise
#[derive(Debug, Clone)]
pub struct ConstantVelocityKalmanFilter {
    kalman: KalmanState,
    // Process noise Q = I * q
    process_noise: Matrix4<f64>,
    // Measurement noise R = I * r
    measurement_noise: Matrix2<f64>,
}

impl ConstantVelocityKalmanFilter {
    /// Create a filter with the given noise bases (kept strictly positive)
    #[must_use]
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        let q = positive_noise(process_noise);
        let r = positive_noise(measurement_noise);
        Self {
            kalman: KalmanState::new(),
            process_noise: Matrix4::identity() * q,
            measurement_noise: Matrix2::identity() * r,
        }
    }

    /// Create a filter from the tracker's noise bases
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.process_noise(), config.measurement_noise())
    }

    /// Advance the state one frame. Returns the predicted position, or the
    /// current position unchanged if no measurement has been seen yet.
    pub fn predict(&mut self) -> Vector2<f64> {
        if self.kalman.is_initialized() {
            self.kalman.predict(&self.process_noise);
        }
        self.kalman.position()
    }

    /// Fold in a measurement and return the filtered position.
    ///
    /// The first measurement after construction or [`reset`](Self::reset) is
    /// returned as-is.
    pub fn update(&mut self, measurement: Vector2<f64>) -> Vector2<f64> {
        if !self.kalman.is_initialized() {
            self.kalman.initialize(measurement);
            return measurement;
        }

        self.predict();
        self.kalman.correct(measurement, &self.measurement_noise);

        self.kalman.position()
    }

    /// Clear state: zero state, identity covariance, uninitialized
    pub fn reset(&mut self) {
        self.kalman.reset();
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

    /// Whether a measurement has been received since the last reset
    pub fn is_initialized(&self) -> bool {
        self.kalman.is_initialized()
    }
}

impl Default for ConstantVelocityKalmanFilter {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

impl GazeFilter for ConstantVelocityKalmanFilter {
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

    fn name(&self) -> &str {
        "ConstantVelocityKalmanFilter"
    }
}

pub(crate) fn positive_noise(value: f64) -> f64 {
    if value.is_nan() {
        MIN_NOISE
    } else {
        value.max(MIN_NOISE)
    }
}
