//! Small numeric helpers shared by the estimator, combiner and calibration code.

pub mod safe_cast;

use nalgebra::Vector2;

/// Component-wise mean of a set of 2D vectors, `None` for an empty set
#[allow(clippy::cast_precision_loss)] // Sample counts are far below 2^52
pub fn mean_vector(samples: &[Vector2<f64>]) -> Option<Vector2<f64>> {
    if samples.is_empty() {
        return None;
    }
    let sum = samples.iter().fold(Vector2::zeros(), |acc, s| acc + s);
    Some(sum / samples.len() as f64)
}

/// Arithmetic mean of a slice, `None` for an empty slice
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Clamp both components of a vector into `[min, max]`
pub fn clamp_vector(v: Vector2<f64>, min: f64, max: f64) -> Vector2<f64> {
    Vector2::new(v.x.clamp(min, max), v.y.clamp(min, max))
}
