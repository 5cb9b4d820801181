use log::trace;
use nalgebra::Vector2;

use crate::{
    config::TrackerConfig,
    constants::{HORIZONTAL_SPAN_RATIO, MIN_EYE_WIDTH_PX},
    landmarks::EyeGeometry,
    utils::clamp_vector,
    Error, Result,
};

/// Normalized 2D gaze direction, both components in `[-1, 1]`
pub type GazeVector = Vector2<f64>;

/// Converts eye geometry into a sensitivity/offset adjusted gaze vector
#[derive(Debug, Clone, Copy)]
pub struct GazeVectorEstimator<'a> {
    config: &'a TrackerConfig,
}

impl<'a> GazeVectorEstimator<'a> {
    pub fn new(config: &'a TrackerConfig) -> Self {
        Self { config }
    }

    /// Estimate the gaze vector of one eye.
    ///
    /// The iris offset from the eye center is normalized by half the eye
    /// width horizontally and by `vertical_span_ratio` of the eye width
    /// vertically, scaled by the sensitivities, shifted by the offsets and
    /// clamped to `[-1, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DegenerateEyeGeometry` when the eye corners are less
    /// than one pixel apart or not finite, and `Error::InvalidInput` for a
    /// non-finite iris position
    pub fn estimate(&self, eye: &EyeGeometry) -> Result<GazeVector> {
        let width = eye.width();
        if !width.is_finite() || width < MIN_EYE_WIDTH_PX {
            return Err(Error::DegenerateEyeGeometry { width });
        }

        let center = eye.center();
        let (sensitivity_x, sensitivity_y) = self.config.sensitivity();
        let (offset_x, offset_y) = self.config.offset();

        let gaze_x = (eye.iris.x - center.x) / (width * HORIZONTAL_SPAN_RATIO) * sensitivity_x;
        let gaze_y = (eye.iris.y - center.y) / (width * self.config.vertical_span_ratio()) * sensitivity_y;

        let raw = Vector2::new(gaze_x + offset_x, gaze_y + offset_y);
        if !raw.iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "Non-finite iris position ({}, {})",
                eye.iris.x, eye.iris.y
            )));
        }

        let gaze = clamp_vector(raw, -1.0, 1.0);
        trace!("Eye width {width:.1}px, gaze ({:.3}, {:.3})", gaze.x, gaze.y);

        Ok(gaze)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use proptest::prelude::*;

    fn eye(iris: (f64, f64)) -> EyeGeometry {
        let mut geometry = EyeGeometry::from_contour(
            Point2::new(100.0, 200.0),
            Point2::new(140.0, 200.0),
            Point2::new(120.0, 192.0),
            Point2::new(120.0, 208.0),
        );
        geometry.iris = Point2::new(iris.0, iris.1);
        geometry
    }

    fn neutral_config() -> TrackerConfig {
        let mut config = TrackerConfig::new();
        config.set_sensitivity(1.0, 1.0);
        config.set_offset(0.0, 0.0);
        config
    }

    #[test]
    fn test_centered_iris_yields_offset_only() {
        let config = TrackerConfig::new();
        let gaze = GazeVectorEstimator::new(&config).estimate(&eye((120.0, 200.0))).unwrap();
        assert!(gaze.x.abs() < 1e-12);
        assert!((gaze.y - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_anisotropic_scaling() {
        let config = neutral_config();
        let estimator = GazeVectorEstimator::new(&config);

        // Eye width 40: horizontal divisor 20, vertical divisor 10
        let gaze = estimator.estimate(&eye((124.0, 204.0))).unwrap();
        assert!((gaze.x - 0.2).abs() < 1e-12);
        assert!((gaze.y - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_sensitivity_and_clamp() {
        let config = TrackerConfig::new();
        let gaze = GazeVectorEstimator::new(&config).estimate(&eye((139.0, 215.0))).unwrap();
        assert_eq!(gaze, Vector2::new(1.0, 1.0));
    }

    #[test]
    fn test_vertical_span_ratio_is_tunable() {
        let mut config = neutral_config();
        config.set_vertical_span_ratio(0.5);
        let gaze = GazeVectorEstimator::new(&config).estimate(&eye((120.0, 204.0))).unwrap();
        assert!((gaze.y - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_geometry() {
        let config = TrackerConfig::new();
        let mut geometry = eye((120.0, 200.0));
        geometry.inner = Point2::new(100.5, 200.0);
        match GazeVectorEstimator::new(&config).estimate(&geometry) {
            Err(Error::DegenerateEyeGeometry { width }) => assert!((width - 0.5).abs() < 1e-12),
            other => panic!("expected degenerate geometry, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_iris_rejected() {
        let config = TrackerConfig::new();
        let estimator = GazeVectorEstimator::new(&config);
        assert!(matches!(
            estimator.estimate(&eye((f64::NAN, 200.0))),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            estimator.estimate(&eye((120.0, f64::INFINITY))),
            Err(Error::InvalidInput(_))
        ));

        let mut geometry = eye((120.0, 200.0));
        geometry.outer = Point2::new(f64::NEG_INFINITY, 200.0);
        assert!(matches!(
            estimator.estimate(&geometry),
            Err(Error::DegenerateEyeGeometry { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_gaze_always_clamped(
            ix in -1e4f64..1e4,
            iy in -1e4f64..1e4,
            sx in 0.0f64..10.0,
            sy in 0.0f64..10.0,
            ox in -3.0f64..3.0,
            oy in -3.0f64..3.0,
        ) {
            let mut config = TrackerConfig::new();
            config.set_sensitivity(sx, sy);
            config.set_offset(ox, oy);
            let gaze = GazeVectorEstimator::new(&config).estimate(&eye((ix, iy))).unwrap();
            prop_assert!((-1.0..=1.0).contains(&gaze.x));
            prop_assert!((-1.0..=1.0).contains(&gaze.y));
        }
    }
}
