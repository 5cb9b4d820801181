//! Eye gaze tracking library for estimating on-screen gaze from face landmarks.
//!
//! This library turns per-frame eye landmarks into a smoothed screen position:
//! - Normalized per-eye gaze vectors from iris position relative to the eye corners
//! - Constant-velocity and velocity-adaptive Kalman filtering
//! - Bi-ocular combination with confidence scoring and screen smoothing
//! - Least-squares affine/polynomial calibration and quick offset correction
//!
//! The estimation pipeline consists of:
//! 1. Landmark lookup and blink gating per eye
//! 2. Gaze vector estimation with sensitivity and offset
//! 3. Per-eye filtering
//! 4. Combination, screen mapping and a second smoothing stage
//!
//! # Examples
//!
//! ## Tracking a Recording
//!
//! ```no_run
//! use eye_gaze_tracking::{
//!     config::Config,
//!     source::{LandmarkSource, ReplaySource},
//!     tracker::GazeTracker,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut tracker = GazeTracker::from_config(&config);
//! let mut source = ReplaySource::open("session.jsonl")?;
//!
//! while let Some(frame) = source.next_frame()? {
//!     if let Some(estimate) = tracker.process_frame(&frame) {
//!         println!(
//!             "Gaze ({:+.2}, {:+.2}) -> {:?} (confidence {:.1})",
//!             estimate.combined.x, estimate.combined.y, estimate.screen_point, estimate.confidence
//!         );
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Using Filters
//!
//! ```no_run
//! use eye_gaze_tracking::{config::TrackerConfig, filters::create_filter};
//! use nalgebra::Vector2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut filter = create_filter("adaptive", &TrackerConfig::default())?;
//!
//! // The first measurement passes through unfiltered
//! let first = filter.update(Vector2::new(0.1, -0.2));
//! let smoothed = filter.update(Vector2::new(0.12, -0.21));
//! println!("{first:?} -> {smoothed:?}, dwelling: {:?}", filter.is_dwelling());
//!
//! filter.reset();
//! # Ok(())
//! # }
//! ```
//!
//! ## Calibration
//!
//! ```no_run
//! use eye_gaze_tracking::calibration::{CalibrationFitter, CalibrationMode, CalibrationPoint};
//! use nalgebra::Vector2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let points = vec![
//!     CalibrationPoint::new((192, 108), vec![Vector2::new(-0.8, -0.6)]),
//!     CalibrationPoint::new((1728, 108), vec![Vector2::new(0.8, -0.6)]),
//!     CalibrationPoint::new((960, 540), vec![Vector2::new(0.0, 0.1)]),
//!     CalibrationPoint::new((192, 972), vec![Vector2::new(-0.8, 0.7)]),
//!     CalibrationPoint::new((1728, 972), vec![Vector2::new(0.8, 0.7)]),
//! ];
//!
//! let mut fitter = CalibrationFitter::new(CalibrationMode::Affine, 1920, 1080);
//! let report = fitter.fit(&points)?;
//! println!("Mean error: {:.1}px", report.mean_error_px);
//!
//! fitter.save_calibration("gaze_calibration.json")?;
//! println!("{:?}", fitter.gaze_to_screen(&Vector2::new(0.3, 0.2)));
//! # Ok(())
//! # }
//! ```

/// Face-mesh landmark indices and eye geometry
pub mod landmarks;

/// Per-eye gaze vector estimation
pub mod gaze_vector;

/// Signal filtering algorithms for smoothing gaze vectors
pub mod filters;

/// Bi-ocular combination and screen mapping
pub mod combiner;

/// Gaze-to-screen calibration
pub mod calibration;

/// Landmark frame sources
pub mod source;

/// Tracking session
pub mod tracker;

/// Utility functions for numeric conversions and averaging
pub mod utils;

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
