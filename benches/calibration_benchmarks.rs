//! Benchmarks for calibration fitting and screen mapping

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eye_gaze_tracking::calibration::{
    calibration_targets, fitter::solve_least_squares, CalibrationFitter, CalibrationMode, CalibrationPoint,
};
use nalgebra::{DMatrix, DVector, Vector2};

fn calibration_points(num_points: usize, samples: usize) -> Vec<CalibrationPoint> {
    calibration_targets(num_points, 1920, 1080, 0.1)
        .unwrap_or_default()
        .into_iter()
        .map(|target| {
            let gx = f64::from(target.0 - 960) / 800.0;
            let gy = f64::from(target.1 - 540) / 450.0;
            let samples = (0..samples)
                .map(|_| {
                    Vector2::new(
                        gx + 0.02 * (rand::random::<f64>() - 0.5),
                        gy + 0.02 * (rand::random::<f64>() - 0.5),
                    )
                })
                .collect();
            CalibrationPoint::new(target, samples)
        })
        .collect()
}

fn benchmark_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibration_fit");

    for (mode, num_points) in [
        (CalibrationMode::Affine, 5),
        (CalibrationMode::Affine, 9),
        (CalibrationMode::Polynomial, 9),
    ] {
        let points = calibration_points(num_points, 30);
        let mut fitter = CalibrationFitter::new(mode, 1920, 1080);

        group.bench_with_input(
            BenchmarkId::new(mode.to_string(), num_points),
            &points,
            |b, points| {
                b.iter(|| black_box(fitter.fit(black_box(points))));
            },
        );
    }

    group.finish();
}

fn benchmark_least_squares(c: &mut Criterion) {
    let mut group = c.benchmark_group("least_squares");

    for rows in [9, 50, 200] {
        let design = DMatrix::from_fn(rows, 6, |_, _| rand::random::<f64>());
        let targets = DVector::from_fn(rows, |_, _| rand::random::<f64>() * 1920.0);

        group.bench_with_input(BenchmarkId::new("svd_solve", rows), &rows, |b, _| {
            b.iter(|| black_box(solve_least_squares(black_box(&design), black_box(&targets))));
        });
    }

    group.finish();
}

fn benchmark_gaze_to_screen(c: &mut Criterion) {
    let mut group = c.benchmark_group("gaze_to_screen");
    let gaze: Vec<Vector2<f64>> = (0..100)
        .map(|_| Vector2::new(rand::random::<f64>() * 2.0 - 1.0, rand::random::<f64>() * 2.0 - 1.0))
        .collect();

    for mode in [CalibrationMode::Affine, CalibrationMode::Polynomial] {
        let mut fitter = CalibrationFitter::new(mode, 1920, 1080);
        let _ = fitter.fit(&calibration_points(9, 10));

        group.bench_with_input(BenchmarkId::new("map_100", mode.to_string()), &gaze, |b, gaze| {
            b.iter(|| {
                for g in gaze {
                    black_box(fitter.gaze_to_screen(black_box(g)));
                }
            });
        });
    }

    let uncalibrated = CalibrationFitter::new(CalibrationMode::Affine, 1920, 1080);
    group.bench_with_input(BenchmarkId::new("map_100", "linear"), &gaze, |b, gaze| {
        b.iter(|| {
            for g in gaze {
                black_box(uncalibrated.gaze_to_screen(black_box(g)));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_fit, benchmark_least_squares, benchmark_gaze_to_screen);
criterion_main!(benches);
