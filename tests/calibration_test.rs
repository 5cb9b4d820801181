//! Tests for least-squares calibration, persistence and quick offset correction

use eye_gaze_tracking::{
    calibration::{
        CalibrationFitter, CalibrationMode, CalibrationPoint, CalibrationRecord, OffsetMeasurement,
        QuickOffsetCalibrator,
    },
    Error,
};
use nalgebra::Vector2;
use proptest::prelude::*;

/// Calibration points that exactly satisfy x = 960 + 400 gx, y = 540 + 300 gy
fn affine_points() -> Vec<CalibrationPoint> {
    [(-0.5, -0.5), (0.5, -0.5), (-0.5, 0.5), (0.5, 0.5)]
        .iter()
        .map(|&(gx, gy)| {
            let target = ((960.0 + 400.0 * gx) as i32, (540.0 + 300.0 * gy) as i32);
            CalibrationPoint::new(target, vec![Vector2::new(gx, gy)])
        })
        .collect()
}

/// Nine-point grid following a quadratic map
fn quadratic_points() -> Vec<CalibrationPoint> {
    let mut points = Vec::new();
    for gy in [-0.6, 0.0, 0.6] {
        for gx in [-0.8, 0.0, 0.8] {
            let x: f64 = 960.0 + 700.0 * gx + 120.0 * gx * gx;
            let y: f64 = 540.0 + 400.0 * gy - 80.0 * gy * gy + 50.0 * gx * gy;
            // Samples scatter symmetrically around the representative vector
            let samples = vec![Vector2::new(gx - 0.01, gy), Vector2::new(gx + 0.01, gy)];
            points.push(CalibrationPoint::new((x.round() as i32, y.round() as i32), samples));
        }
    }
    points
}

#[test]
fn test_affine_fit_recovers_coefficients() {
    let mut fitter = CalibrationFitter::new(CalibrationMode::Affine, 1920, 1080);
    let report = fitter.fit(&affine_points()).unwrap();

    let model = fitter.model().unwrap();
    let expected_x = [960.0, 400.0, 0.0];
    let expected_y = [540.0, 0.0, 300.0];
    for (got, want) in model.coefficients().x().iter().zip(expected_x) {
        assert!((got - want).abs() < 1e-6, "x coefficient {got} != {want}");
    }
    for (got, want) in model.coefficients().y().iter().zip(expected_y) {
        assert!((got - want).abs() < 1e-6, "y coefficient {got} != {want}");
    }

    assert_eq!(report.points_used, 4);
    assert!(report.mean_error_px < 1e-6);
    assert!(!report.is_poor());
}

#[test]
fn test_polynomial_fit_on_nine_points() {
    let mut fitter = CalibrationFitter::new(CalibrationMode::Polynomial, 1920, 1080);
    let report = fitter.fit(&quadratic_points()).unwrap();

    assert_eq!(fitter.model().unwrap().mode(), CalibrationMode::Polynomial);
    assert_eq!(fitter.model().unwrap().coefficients().x().len(), 6);
    // Only target rounding remains
    assert!(report.mean_error_px < 1.0);

    let (x, y) = fitter.gaze_to_screen(&Vector2::new(0.0, 0.0));
    assert!((x - 960).abs() <= 1);
    assert!((y - 540).abs() <= 1);
}

#[test]
fn test_affine_fit_on_quadratic_data_reports_error() {
    let mut fitter = CalibrationFitter::new(CalibrationMode::Affine, 1920, 1080);
    let report = fitter.fit(&quadratic_points()).unwrap();
    // The affine model cannot absorb the curvature
    assert!(report.mean_error_px > 1.0);
    assert_eq!(report.point_errors.len(), 9);
}

#[test]
fn test_too_few_points_preserves_model() {
    let mut fitter = CalibrationFitter::new(CalibrationMode::Affine, 1920, 1080);
    fitter.fit(&affine_points()).unwrap();
    let before = fitter.model().cloned();

    fitter.set_mode(CalibrationMode::Polynomial);
    let three = &affine_points()[..3];
    match fitter.fit(three) {
        Err(Error::InsufficientPoints {
            mode,
            required,
            available,
        }) => {
            assert_eq!(mode, CalibrationMode::Polynomial);
            assert_eq!(required, 6);
            assert_eq!(available, 3);
        }
        other => panic!("expected InsufficientPoints, got {other:?}"),
    }

    assert_eq!(fitter.model().cloned(), before);
    assert_eq!(fitter.model().unwrap().mode(), CalibrationMode::Affine);
}

#[test]
fn test_points_without_samples_do_not_count() {
    let mut fitter = CalibrationFitter::new(CalibrationMode::Affine, 1920, 1080);
    let mut points = affine_points();
    points[0].samples.clear();
    assert!(matches!(fitter.fit(&points), Err(Error::InsufficientPoints { available: 3, .. })));
    assert!(!fitter.is_calibrated());
}

#[test]
fn test_rank_deficient_fit_does_not_fail() {
    // Every target sampled at the same gaze vector
    let points: Vec<CalibrationPoint> = [(100, 100), (1800, 100), (100, 1000), (1800, 1000), (960, 540), (500, 500)]
        .iter()
        .map(|&t| CalibrationPoint::new(t, vec![Vector2::new(0.1, 0.2)]))
        .collect();

    let mut fitter = CalibrationFitter::new(CalibrationMode::Polynomial, 1920, 1080);
    let report = fitter.fit(&points).unwrap();

    assert!(report.mean_error_px.is_finite());
    assert!(report.is_poor());
    let (x, y) = fitter.gaze_to_screen(&Vector2::new(0.1, 0.2));
    assert!((0..1920).contains(&x));
    assert!((0..1080).contains(&y));
}

#[test]
fn test_gaze_to_screen_out_of_domain() {
    let mut fitter = CalibrationFitter::new(CalibrationMode::Affine, 1920, 1080);
    assert_eq!(fitter.gaze_to_screen(&Vector2::new(5.0, -5.0)), (1919, 0));

    fitter.fit(&affine_points()).unwrap();
    assert_eq!(fitter.gaze_to_screen(&Vector2::new(5.0, -5.0)), (1919, 0));
}

proptest! {
    #[test]
    fn prop_gaze_to_screen_within_bounds(gx in -1e3f64..1e3, gy in -1e3f64..1e3) {
        let mut fitter = CalibrationFitter::new(CalibrationMode::Polynomial, 1920, 1080);
        let (x, y) = fitter.gaze_to_screen(&Vector2::new(gx, gy));
        prop_assert!((0..1920).contains(&x) && (0..1080).contains(&y));

        fitter.fit(&quadratic_points()).unwrap();
        let (x, y) = fitter.gaze_to_screen(&Vector2::new(gx, gy));
        prop_assert!((0..1920).contains(&x) && (0..1080).contains(&y));
    }
}

#[test]
fn test_save_and_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gaze_calibration.json");

    let mut fitter = CalibrationFitter::new(CalibrationMode::Polynomial, 1920, 1080);
    fitter.fit(&quadratic_points()).unwrap();
    fitter.save_calibration(&path).unwrap();

    let mut loaded = CalibrationFitter::new(CalibrationMode::Affine, 1920, 1080);
    loaded.load_calibration(&path).unwrap();

    assert_eq!(loaded.mode(), CalibrationMode::Polynomial);
    assert_eq!(loaded.model(), fitter.model());
    assert_eq!(loaded.targets(), fitter.targets());

    let record = CalibrationRecord::load(&path).unwrap();
    assert_eq!(record.mode, Some(CalibrationMode::Polynomial));
    assert_eq!(record.calibration_points.len(), 9);
}

#[test]
fn test_load_legacy_record_without_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    std::fs::write(
        &path,
        r#"{"transform_x":[960.0,400.0,0.0],"transform_y":[540.0,0.0,300.0],"screen_width":1920,"screen_height":1080}"#,
    )
    .unwrap();

    let mut fitter = CalibrationFitter::new(CalibrationMode::Polynomial, 1920, 1080);
    fitter.load_calibration(&path).unwrap();
    assert_eq!(fitter.mode(), CalibrationMode::Affine);
    assert_eq!(fitter.gaze_to_screen(&Vector2::new(0.5, 0.5)), (1160, 690));
}

#[test]
fn test_failed_load_keeps_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(
        &path,
        r#"{"mode":"polynomial","transform_x":[1.0,2.0,3.0],"transform_y":[1.0,2.0,3.0],"screen_width":1920,"screen_height":1080}"#,
    )
    .unwrap();

    let mut fitter = CalibrationFitter::new(CalibrationMode::Affine, 1920, 1080);
    fitter.fit(&affine_points()).unwrap();
    let before = fitter.model().cloned();

    assert!(fitter.load_calibration(&path).is_err());
    assert!(fitter.load_calibration(dir.path().join("missing.json")).is_err());
    assert_eq!(fitter.model().cloned(), before);
}

#[test]
fn test_quick_offset_zero_error_keeps_offset() {
    let calibrator = QuickOffsetCalibrator::new(1920, 1080).unwrap();
    let measurements: Vec<OffsetMeasurement> = calibrator
        .points()
        .iter()
        .map(|&(name, target)| {
            let exact = calibrator.expected_gaze(target);
            calibrator.measure(name, target, &[exact, exact]).unwrap()
        })
        .collect();

    for current in [(0.0, 0.3), (-0.4, 0.9), (1.0, -1.0)] {
        let (ox, oy) = calibrator.compute_offsets(&measurements, current);
        assert!((ox - current.0).abs() < 1e-12);
        assert!((oy - current.1).abs() < 1e-12);
    }
}
