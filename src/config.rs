//! Configuration management for the gaze tracker.
//!
//! Two layers live here:
//! - [`TrackerConfig`], the runtime tuning surface. Every setter clamps its
//!   input into the documented range, so out-of-range values never reach the
//!   estimator or the filters.
//! - [`Config`], the YAML application configuration the binary loads. It is
//!   plain data; [`Config::tracker_config`] funnels it through the clamping
//!   setters.

use crate::{
    calibration::CalibrationMode,
    constants::{
        DEFAULT_CALIBRATION_MARGIN, DEFAULT_CALIBRATION_POINTS, DEFAULT_MEASUREMENT_NOISE, DEFAULT_OFFSET_X,
        DEFAULT_OFFSET_Y, DEFAULT_PROCESS_NOISE, DEFAULT_QUICK_SAMPLES_PER_POINT, DEFAULT_SAMPLES_PER_POINT,
        DEFAULT_SCREEN_HEIGHT, DEFAULT_SCREEN_WIDTH, DEFAULT_SENSITIVITY_X, DEFAULT_SENSITIVITY_Y,
        DEFAULT_SMOOTHING_FACTOR, DEFAULT_VERTICAL_SPAN_RATIO, MIN_NOISE, OFFSET_MAX, OFFSET_MIN, SENSITIVITY_MAX,
        SENSITIVITY_MIN, VERTICAL_SPAN_RATIO_MAX, VERTICAL_SPAN_RATIO_MIN,
    },
    filters::{adaptive_kalman::AdaptiveSchedule, FilterKind},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-instance tunables for the estimator and the filters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    sensitivity_x: f64,
    sensitivity_y: f64,
    offset_x: f64,
    offset_y: f64,
    process_noise: f64,
    measurement_noise: f64,
    vertical_span_ratio: f64,
    schedule: AdaptiveSchedule,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sensitivity_x: DEFAULT_SENSITIVITY_X,
            sensitivity_y: DEFAULT_SENSITIVITY_Y,
            offset_x: DEFAULT_OFFSET_X,
            offset_y: DEFAULT_OFFSET_Y,
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            vertical_span_ratio: DEFAULT_VERTICAL_SPAN_RATIO,
            schedule: AdaptiveSchedule::default(),
        }
    }
}

impl TrackerConfig {
    /// Create a configuration with default tunables
    pub fn new() -> Self {
        Self::default()
    }

    /// Current (horizontal, vertical) sensitivity
    pub fn sensitivity(&self) -> (f64, f64) {
        (self.sensitivity_x, self.sensitivity_y)
    }

    /// Current (horizontal, vertical) offset
    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    pub fn process_noise(&self) -> f64 {
        self.process_noise
    }

    pub fn measurement_noise(&self) -> f64 {
        self.measurement_noise
    }

    /// Vertical iris travel as a fraction of eye width
    pub fn vertical_span_ratio(&self) -> f64 {
        self.vertical_span_ratio
    }

    /// Velocity schedule used by adaptive filters
    pub fn schedule(&self) -> AdaptiveSchedule {
        self.schedule
    }

    /// Set both sensitivities, clamped to `[0.5, 5.0]`
    pub fn set_sensitivity(&mut self, x: f64, y: f64) {
        self.set_sensitivity_x(x);
        self.set_sensitivity_y(y);
    }

    /// Set horizontal sensitivity, clamped to `[0.5, 5.0]`
    pub fn set_sensitivity_x(&mut self, x: f64) {
        self.sensitivity_x = clamp_or(x, SENSITIVITY_MIN, SENSITIVITY_MAX, self.sensitivity_x);
    }

    /// Set vertical sensitivity, clamped to `[0.5, 5.0]`
    pub fn set_sensitivity_y(&mut self, y: f64) {
        self.sensitivity_y = clamp_or(y, SENSITIVITY_MIN, SENSITIVITY_MAX, self.sensitivity_y);
    }

    /// Shift both sensitivities by `delta`
    pub fn adjust_sensitivity(&mut self, delta: f64) {
        self.set_sensitivity(self.sensitivity_x + delta, self.sensitivity_y + delta);
    }

    /// Set both offsets, clamped to `[-1, 1]`
    pub fn set_offset(&mut self, x: f64, y: f64) {
        self.set_offset_x(x);
        self.set_offset_y(y);
    }

    /// Set horizontal offset, clamped to `[-1, 1]`
    pub fn set_offset_x(&mut self, x: f64) {
        self.offset_x = clamp_or(x, OFFSET_MIN, OFFSET_MAX, self.offset_x);
    }

    /// Set vertical offset, clamped to `[-1, 1]`
    pub fn set_offset_y(&mut self, y: f64) {
        self.offset_y = clamp_or(y, OFFSET_MIN, OFFSET_MAX, self.offset_y);
    }

    /// Shift the offsets by `(dx, dy)`
    pub fn nudge_offset(&mut self, dx: f64, dy: f64) {
        self.set_offset(self.offset_x + dx, self.offset_y + dy);
    }

    /// Set filter noise bases; both are kept strictly positive
    pub fn set_noise(&mut self, process_noise: f64, measurement_noise: f64) {
        self.process_noise = clamp_or(process_noise, MIN_NOISE, f64::MAX, self.process_noise);
        self.measurement_noise = clamp_or(measurement_noise, MIN_NOISE, f64::MAX, self.measurement_noise);
    }

    /// Set the vertical span ratio, clamped to `[0.05, 1.0]`
    pub fn set_vertical_span_ratio(&mut self, ratio: f64) {
        self.vertical_span_ratio =
            clamp_or(ratio, VERTICAL_SPAN_RATIO_MIN, VERTICAL_SPAN_RATIO_MAX, self.vertical_span_ratio);
    }

    /// Replace the adaptive schedule
    pub fn set_schedule(&mut self, schedule: AdaptiveSchedule) {
        self.schedule = schedule;
    }
}

/// Clamp a tunable, keeping the previous value when the input is NaN
fn clamp_or(value: f64, min: f64, max: f64, previous: f64) -> f64 {
    if value.is_nan() {
        previous
    } else {
        value.clamp(min, max)
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target screen
    pub screen: ScreenConfig,

    /// Gaze vector estimation tunables
    pub estimator: EstimatorConfig,

    /// Filter configuration
    pub filter: FilterConfig,

    /// Combination and screen smoothing
    pub combiner: CombinerConfig,

    /// Calibration session configuration
    pub calibration: CalibrationConfig,
}

/// Target screen dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Screen width in pixels
    pub width: u32,

    /// Screen height in pixels
    pub height: u32,
}

/// Gaze vector estimation tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Horizontal sensitivity (0.5-5.0)
    pub sensitivity_x: f64,

    /// Vertical sensitivity (0.5-5.0)
    pub sensitivity_y: f64,

    /// Horizontal offset (-1.0-1.0, positive shifts right)
    pub offset_x: f64,

    /// Vertical offset (-1.0-1.0, positive shifts down)
    pub offset_y: f64,

    /// Vertical iris travel as a fraction of eye width
    pub vertical_span_ratio: f64,
}

/// Filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Filter used for the per-eye and combined instances
    pub kind: FilterKind,

    /// Base process noise
    pub process_noise: f64,

    /// Base measurement noise
    pub measurement_noise: f64,

    /// Velocity at or below which the gaze is dwelling
    pub low_velocity_threshold: f64,

    /// Velocity at or above which the gaze is in a saccade
    pub high_velocity_threshold: f64,

    /// Measurement noise multiplier while dwelling
    pub dwell_multiplier: f64,

    /// Measurement noise multiplier during saccades
    pub rapid_multiplier: f64,
}

/// Combination and screen smoothing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinerConfig {
    /// Weight of the newest screen point (0-1)
    pub smoothing_factor: f64,
}

/// Calibration session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Regression mode
    pub mode: CalibrationMode,

    /// Number of targets (5 or 9)
    pub num_points: usize,

    /// Samples averaged per target
    pub samples_per_point: usize,

    /// Target margin as a fraction of the screen size
    pub margin: f64,

    /// Samples averaged per target in quick offset calibration
    pub quick_samples_per_point: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_SCREEN_WIDTH,
            height: DEFAULT_SCREEN_HEIGHT,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            sensitivity_x: DEFAULT_SENSITIVITY_X,
            sensitivity_y: DEFAULT_SENSITIVITY_Y,
            offset_x: DEFAULT_OFFSET_X,
            offset_y: DEFAULT_OFFSET_Y,
            vertical_span_ratio: DEFAULT_VERTICAL_SPAN_RATIO,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        let schedule = AdaptiveSchedule::default();
        Self {
            kind: FilterKind::Kalman,
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            low_velocity_threshold: schedule.low_threshold(),
            high_velocity_threshold: schedule.high_threshold(),
            dwell_multiplier: schedule.dwell_multiplier(),
            rapid_multiplier: schedule.rapid_multiplier(),
        }
    }
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            mode: CalibrationMode::Polynomial,
            num_points: DEFAULT_CALIBRATION_POINTS,
            samples_per_point: DEFAULT_SAMPLES_PER_POINT,
            margin: DEFAULT_CALIBRATION_MARGIN,
            quick_samples_per_point: DEFAULT_QUICK_SAMPLES_PER_POINT,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build the runtime tuning surface; out-of-range values are clamped
    pub fn tracker_config(&self) -> TrackerConfig {
        let mut config = TrackerConfig::new();
        config.set_sensitivity(self.estimator.sensitivity_x, self.estimator.sensitivity_y);
        config.set_offset(self.estimator.offset_x, self.estimator.offset_y);
        config.set_vertical_span_ratio(self.estimator.vertical_span_ratio);
        config.set_noise(self.filter.process_noise, self.filter.measurement_noise);
        config.set_schedule(AdaptiveSchedule::new(
            self.filter.low_velocity_threshold,
            self.filter.high_velocity_threshold,
            self.filter.dwell_multiplier,
            self.filter.rapid_multiplier,
        ));
        config
    }

    /// Validate the structural parts of the configuration.
    ///
    /// Tuning values are clamped rather than rejected; only settings with no
    /// meaningful clamp (screen size, target count, sample counts) fail here.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(Error::ConfigError("Screen dimensions must be greater than 0".to_string()));
        }
        if self.calibration.num_points != 5 && self.calibration.num_points != 9 {
            return Err(Error::ConfigError(format!(
                "Calibration supports 5 or 9 points, got {}",
                self.calibration.num_points
            )));
        }
        if self.calibration.samples_per_point == 0 || self.calibration.quick_samples_per_point == 0 {
            return Err(Error::ConfigError(
                "Samples per calibration point must be greater than 0".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&self.calibration.margin) {
            return Err(Error::ConfigError(
                "Calibration margin must be in [0.0, 0.5)".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Eye Gaze Tracking Configuration

# Target screen
screen:
  width: 1920
  height: 1080

# Gaze vector estimation
estimator:
  sensitivity_x: 2.5
  sensitivity_y: 3.0
  offset_x: 0.0
  offset_y: 0.3
  vertical_span_ratio: 0.25

# Filters: "kalman" or "adaptive"
filter:
  kind: "kalman"
  process_noise: 0.0001
  measurement_noise: 0.01
  low_velocity_threshold: 0.02
  high_velocity_threshold: 0.15
  dwell_multiplier: 3.0
  rapid_multiplier: 0.3

# Second smoothing stage on screen points
combiner:
  smoothing_factor: 0.3

# Calibration: "affine" or "polynomial"
calibration:
  mode: "polynomial"
  num_points: 9
  samples_per_point: 30
  margin: 0.1
  quick_samples_per_point: 20
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_example_config_parses() {
        let config: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.screen.width, 1920);
        assert_eq!(config.filter.kind, FilterKind::Kalman);
        assert_eq!(config.calibration.mode, CalibrationMode::Polynomial);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("screen:\n  width: 800\n").unwrap();
        assert_eq!(config.screen.width, 800);
        assert_eq!(config.screen.height, DEFAULT_SCREEN_HEIGHT);
        assert_eq!(config.calibration.samples_per_point, DEFAULT_SAMPLES_PER_POINT);
    }

    #[test]
    fn test_validate_rejects_structural_errors() {
        let mut config = Config::default();
        config.screen.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.calibration.num_points = 7;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.calibration.samples_per_point = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tracker_config_clamps_out_of_range_values() {
        let mut config = Config::default();
        config.estimator.sensitivity_x = 10.0;
        config.estimator.sensitivity_y = 0.1;
        config.estimator.offset_x = -3.0;
        config.estimator.offset_y = 2.0;
        config.filter.process_noise = -1.0;

        let tracker = config.tracker_config();
        assert_eq!(tracker.sensitivity(), (SENSITIVITY_MAX, SENSITIVITY_MIN));
        assert_eq!(tracker.offset(), (OFFSET_MIN, OFFSET_MAX));
        assert!(tracker.process_noise() > 0.0);
    }

    #[test]
    fn test_nan_keeps_previous_value() {
        let mut tracker = TrackerConfig::new();
        tracker.set_sensitivity_x(f64::NAN);
        assert_eq!(tracker.sensitivity().0, DEFAULT_SENSITIVITY_X);
    }

    #[test]
    fn test_adjust_and_nudge() {
        let mut tracker = TrackerConfig::new();
        tracker.adjust_sensitivity(0.2);
        let (sx, sy) = tracker.sensitivity();
        assert!((sx - 2.7).abs() < 1e-12);
        assert!((sy - 3.2).abs() < 1e-12);

        tracker.nudge_offset(-0.05, 0.05);
        let (ox, oy) = tracker.offset();
        assert!((ox + 0.05).abs() < 1e-12);
        assert!((oy - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = Config::default();
        config.filter.kind = FilterKind::Adaptive;
        config.combiner.smoothing_factor = 0.4;
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.filter.kind, FilterKind::Adaptive);
        assert!((loaded.combiner.smoothing_factor - 0.4).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_setters_keep_values_in_range(sx in any::<f64>(), sy in any::<f64>(), ox in any::<f64>(), oy in any::<f64>()) {
            let mut tracker = TrackerConfig::new();
            tracker.set_sensitivity(sx, sy);
            tracker.set_offset(ox, oy);
            let (sx, sy) = tracker.sensitivity();
            let (ox, oy) = tracker.offset();
            prop_assert!((SENSITIVITY_MIN..=SENSITIVITY_MAX).contains(&sx));
            prop_assert!((SENSITIVITY_MIN..=SENSITIVITY_MAX).contains(&sy));
            prop_assert!((OFFSET_MIN..=OFFSET_MAX).contains(&ox));
            prop_assert!((OFFSET_MIN..=OFFSET_MAX).contains(&oy));
        }
    }
}
