use crate::{constants::MIN_SMOOTHING_FACTOR, utils::safe_cast::f64_to_i32_clamp};

/// Exponential smoothing of integer screen points.
///
/// `new = alpha * new + (1 - alpha) * previous`, truncated to whole pixels.
#[derive(Debug, Clone)]
pub struct ExponentialSmoother {
    alpha: f64,
    previous: Option<(i32, i32)>,
}

impl ExponentialSmoother {
    /// Create a smoother; `alpha` is clamped into `[0.01, 1.0]`
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_nan() { 1.0 } else { alpha.clamp(MIN_SMOOTHING_FACTOR, 1.0) };
        Self { alpha, previous: None }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn previous(&self) -> Option<(i32, i32)> {
        self.previous
    }

    /// Smooth a point against the previous output
    pub fn apply(&mut self, point: (i32, i32)) -> (i32, i32) {
        let smoothed = match self.previous {
            Some((px, py)) => (
                self.blend(point.0, px),
                self.blend(point.1, py),
            ),
            None => point,
        };

        self.previous = Some(smoothed);
        smoothed
    }

    fn blend(&self, current: i32, previous: i32) -> i32 {
        let value = self.alpha * f64::from(current) + (1.0 - self.alpha) * f64::from(previous);
        f64_to_i32_clamp(value, i32::MIN, i32::MAX)
    }

    /// Forget the previous point
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_smoother() {
        let mut smoother = ExponentialSmoother::new(0.5);

        // First point passes through
        assert_eq!(smoother.apply((100, 200)), (100, 200));

        // Second point is smoothed
        assert_eq!(smoother.apply((200, 300)), (150, 250));
    }

    #[test]
    fn test_truncates_toward_zero() {
        let mut smoother = ExponentialSmoother::new(0.3);
        smoother.apply((0, 0));
        // 0.3 * 5 = 1.5 -> 1
        assert_eq!(smoother.apply((5, 5)), (1, 1));
    }

    #[test]
    fn test_alpha_bounds() {
        assert_eq!(ExponentialSmoother::new(0.0).alpha(), MIN_SMOOTHING_FACTOR);
        assert_eq!(ExponentialSmoother::new(1.5).alpha(), 1.0);

        // Alpha of one disables smoothing
        let mut smoother = ExponentialSmoother::new(1.0);
        smoother.apply((10, 10));
        assert_eq!(smoother.apply((500, 20)), (500, 20));
    }

    #[test]
    fn test_reset() {
        let mut smoother = ExponentialSmoother::new(0.4);
        smoother.apply((10, 10));
        smoother.reset();
        assert!(smoother.previous().is_none());
        assert_eq!(smoother.apply((900, 40)), (900, 40));
    }
}
