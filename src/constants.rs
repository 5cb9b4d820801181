//! Constants used throughout the library

/// Eye corners closer than this (pixels) cannot be normalized
pub const MIN_EYE_WIDTH_PX: f64 = 1.0;

/// Vertical eyelid gap (pixels) below which an eye is treated as closed
pub const BLINK_THRESHOLD_PX: f64 = 5.0;

/// Horizontal iris travel as a fraction of eye width (divisor = width / 2)
pub const HORIZONTAL_SPAN_RATIO: f64 = 0.5;

/// Vertical iris travel as a fraction of eye width (divisor = width / 4)
pub const DEFAULT_VERTICAL_SPAN_RATIO: f64 = 0.25;

/// Bounds for the vertical span ratio tunable
pub const VERTICAL_SPAN_RATIO_MIN: f64 = 0.05;
pub const VERTICAL_SPAN_RATIO_MAX: f64 = 1.0;

/// Gaze sensitivity bounds and defaults
pub const SENSITIVITY_MIN: f64 = 0.5;
pub const SENSITIVITY_MAX: f64 = 5.0;
pub const DEFAULT_SENSITIVITY_X: f64 = 2.5;
pub const DEFAULT_SENSITIVITY_Y: f64 = 3.0;
pub const SENSITIVITY_STEP: f64 = 0.2;

/// Gaze offset bounds and defaults
pub const OFFSET_MIN: f64 = -1.0;
pub const OFFSET_MAX: f64 = 1.0;
pub const DEFAULT_OFFSET_X: f64 = 0.0;
pub const DEFAULT_OFFSET_Y: f64 = 0.3;
pub const OFFSET_STEP: f64 = 0.05;

/// Kalman filter noise defaults
pub const DEFAULT_PROCESS_NOISE: f64 = 1e-4;
pub const DEFAULT_MEASUREMENT_NOISE: f64 = 1e-2;

/// Smallest admissible noise base; keeps the innovation covariance invertible
pub const MIN_NOISE: f64 = 1e-12;

/// Adaptive Kalman schedule defaults
pub const DEFAULT_LOW_VELOCITY_THRESHOLD: f64 = 0.02;
pub const DEFAULT_HIGH_VELOCITY_THRESHOLD: f64 = 0.15;
pub const DEFAULT_DWELL_MULTIPLIER: f64 = 3.0;
pub const DEFAULT_RAPID_MULTIPLIER: f64 = 0.3;

/// Multiplier bounds for the adaptive schedule
pub const MIN_NOISE_MULTIPLIER: f64 = 0.01;
pub const MAX_NOISE_MULTIPLIER: f64 = 100.0;

/// Minimum separation between the low and high velocity thresholds
pub const MIN_THRESHOLD_GAP: f64 = 1e-6;

/// Number of velocity magnitudes averaged by the adaptive filter
pub const VELOCITY_HISTORY_SIZE: usize = 5;

/// Process noise scale bounds (velocity / high threshold is clipped to this range)
pub const PROCESS_NOISE_SCALE_MIN: f64 = 0.5;
pub const PROCESS_NOISE_SCALE_MAX: f64 = 2.0;

/// Confidence when both eyes contribute to the estimate
pub const BINOCULAR_CONFIDENCE: f64 = 1.0;

/// Confidence when only one eye contributes
pub const MONOCULAR_CONFIDENCE: f64 = 0.7;

/// Default weight of the newest screen point in the second smoothing stage
pub const DEFAULT_SMOOTHING_FACTOR: f64 = 0.3;

/// Lower bound for the smoothing factor; zero would freeze the screen point
pub const MIN_SMOOTHING_FACTOR: f64 = 0.01;

/// Default screen dimensions
pub const DEFAULT_SCREEN_WIDTH: u32 = 1920;
pub const DEFAULT_SCREEN_HEIGHT: u32 = 1080;

/// Calibration session defaults
pub const DEFAULT_CALIBRATION_POINTS: usize = 9;
pub const DEFAULT_SAMPLES_PER_POINT: usize = 30;
pub const DEFAULT_CALIBRATION_MARGIN: f64 = 0.1;

/// Minimum calibration points per regression mode
pub const MIN_AFFINE_POINTS: usize = 4;
pub const MIN_POLYNOMIAL_POINTS: usize = 6;

/// Mean calibration error (pixels) above which the fit is reported as poor
pub const POOR_CALIBRATION_ERROR_PX: f64 = 50.0;

/// Quick offset calibration defaults
pub const QUICK_CALIBRATION_MARGIN_PX: i32 = 150;
pub const DEFAULT_QUICK_SAMPLES_PER_POINT: usize = 20;

/// Expected normalized gaze_y when looking at the top of the screen
pub const VERTICAL_TOP_EXPECTED_Y: f64 = -0.8;
pub const DEFAULT_VERTICAL_SAMPLES: usize = 15;

/// Frames averaged for the latency statistic
pub const LATENCY_WINDOW: usize = 30;
