//! Accuracy tests for the gaze filters against synthetic trajectories


use eye_gaze_tracking::{
    config::TrackerConfig,
    filters::{
        adaptive_kalman::{AdaptiveKalmanFilter, AdaptiveSchedule},
        create_filter,
        kalman::ConstantVelocityKalmanFilter,
        GazeFilter,
    },
};
use nalgebra::Vector2;
use proptest::prelude::*;
use test_helpers::{mean_square, variance, Lcg};

fn all_filters() -> Vec<Box<dyn GazeFilter>> {
    let config = TrackerConfig::default();
    vec![
        create_filter("kalman", &config).unwrap(),
        create_filter("adaptive", &config).unwrap(),
    ]
}

proptest! {
    #[test]
    fn prop_first_update_returns_measurement(x in -1.0f64..1.0, y in -1.0f64..1.0) {
        for mut filter in all_filters() {
            let m = Vector2::new(x, y);
            prop_assert_eq!(filter.update(m), m);
        }
    }

    #[test]
    fn prop_first_update_after_reset_returns_measurement(a in -1.0f64..1.0, b in -1.0f64..1.0) {
        for mut filter in all_filters() {
            filter.update(Vector2::new(b, a));
            filter.update(Vector2::new(a, b));
            filter.reset();
            let m = Vector2::new(a, a);
            prop_assert_eq!(filter.update(m), m);
        }
    }
}

/// Repeating the measurement a filter was seeded with never moves it away
#[test]
fn test_repeated_measurement_residual_never_increases() {
    for mut filter in all_filters() {
        let m = Vector2::new(0.42, -0.17);
        let mut previous = (filter.update(m) - m).norm();
        for _ in 0..50 {
            let residual = (filter.update(m) - m).norm();
            assert!(
                residual <= previous,
                "{} residual grew from {previous} to {residual}",
                filter.name()
            );
            previous = residual;
        }
        assert!(previous < 1e-12);
    }
}

#[test]
fn test_converges_to_constant_measurement() {
    for mut filter in all_filters() {
        filter.update(Vector2::new(0.0, 0.0));
        let target = Vector2::new(0.5, -0.25);
        let mut output = Vector2::zeros();
        for _ in 0..150 {
            output = filter.update(target);
        }
        assert!(
            (output - target).norm() < 1e-6,
            "{} did not converge: {output:?}",
            filter.name()
        );
    }
}

#[test]
fn test_constant_velocity_trajectory_reduces_noise() {
    let mut rng = Lcg::new(12345);
    let mut filter = ConstantVelocityKalmanFilter::default();

    let mut raw_x = Vec::new();
    let mut raw_y = Vec::new();
    let mut filtered_x = Vec::new();
    let mut filtered_y = Vec::new();

    for t in 0..200 {
        let t_f = f64::from(t);
        let truth = Vector2::new(-0.5 + 0.005 * t_f, 0.3 - 0.002 * t_f);
        let noise = Vector2::new(rng.noise(0.1), rng.noise(0.1));
        let output = filter.update(truth + noise);

        // Skip the warm-up
        if t >= 50 {
            raw_x.push(noise.x);
            raw_y.push(noise.y);
            filtered_x.push(output.x - truth.x);
            filtered_y.push(output.y - truth.y);
        }
    }

    assert!(variance(&filtered_x) < variance(&raw_x));
    assert!(variance(&filtered_y) < variance(&raw_y));
    // Roughly a fourfold reduction with the default noise settings
    assert!(variance(&filtered_x) < 0.5 * variance(&raw_x));
}

#[test]
fn test_adaptive_smooths_fixation_harder() {
    let mut rng = Lcg::new(12345);
    let mut fixed = ConstantVelocityKalmanFilter::default();
    let mut adaptive = AdaptiveKalmanFilter::default();
    let truth = Vector2::new(0.2, -0.1);

    let mut raw_err = Vec::new();
    let mut fixed_err = Vec::new();
    let mut adaptive_err = Vec::new();

    for t in 0..200 {
        let noise = Vector2::new(rng.noise(0.1), rng.noise(0.1));
        let m = truth + noise;
        let a = fixed.update(m);
        let b = adaptive.update(m);
        if t >= 50 {
            raw_err.push(noise.x);
            fixed_err.push(a.x - truth.x);
            adaptive_err.push(b.x - truth.x);
        }
    }

    assert!(mean_square(&fixed_err) < mean_square(&raw_err));
    assert!(mean_square(&adaptive_err) < mean_square(&fixed_err));
    assert!(adaptive.is_dwelling());
    assert!((adaptive.current_measurement_noise() - 3.0 * 1e-2).abs() < 1e-12);
}

#[test]
fn test_adaptive_schedule_reference_points() {
    let schedule = AdaptiveSchedule::new(0.02, 0.15, 3.0, 0.3);
    let filter = AdaptiveKalmanFilter::new(1e-4, 1e-2, schedule);

    assert!((filter.measurement_noise_multiplier(0.01) - 3.0).abs() < 1e-12);
    assert!((filter.measurement_noise_multiplier(0.20) - 0.3).abs() < 1e-12);

    let t: f64 = 0.5;
    let expected = 3.0 + t * t * (3.0 - 2.0 * t) * (0.3 - 3.0);
    let mid = filter.measurement_noise_multiplier(0.085);
    assert!((mid - expected).abs() < 1e-12);
    assert!(mid > 0.3 && mid < 3.0);
}

#[test]
fn test_adaptive_tracks_saccade_with_less_lag() {
    let mut fixed = ConstantVelocityKalmanFilter::default();
    let mut adaptive = AdaptiveKalmanFilter::default();

    let mut fixed_out = Vector2::zeros();
    let mut adaptive_out = Vector2::zeros();
    for i in 0..6 {
        let m = Vector2::new(-0.9 + 0.3 * f64::from(i), 0.0);
        fixed_out = fixed.update(m);
        adaptive_out = adaptive.update(m);
    }

    assert!(!adaptive.is_dwelling());
    assert!((adaptive.current_measurement_noise() - 0.3 * 1e-2).abs() < 1e-12);
    let target = 0.6;
    assert!((adaptive_out.x - target).abs() <= (fixed_out.x - target).abs());
}
