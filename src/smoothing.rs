//! Exponential moving average used to damp noisy per-frame signals.
//!
//! The smoothing constant is expressed in "generations": the number of
//! samples that carry most of the weight. The blend factor is
//! `alpha = 2 / (n + 1)`, so `n = 1` replaces the average outright and
//! larger values respond more slowly.
//!
//! ```ignore
//! use fyreware::smoothing::exp_mov_avg;
//!
//! let mut fps = 60.0_f32;
//! exp_mov_avg(&mut fps, 30.0, 8.0);
//! ```

use glam::{Quat, Vec3};

/// Blend factor for a smoothing window of `generations` samples.
///
/// Values below one are treated as one.
#[inline]
pub fn alpha(generations: f32) -> f32 {
    2.0 / (generations.max(1.0) + 1.0)
}

/// Values that can be blended by an exponential moving average.
pub trait Smooth: Copy {
    /// Blend `new_value` into `self` with weight `alpha`.
    fn blend(self, new_value: Self, alpha: f32) -> Self;
}

impl Smooth for f32 {
    #[inline]
    fn blend(self, new_value: Self, alpha: f32) -> Self {
        new_value * alpha + self * (1.0 - alpha)
    }
}

impl Smooth for f64 {
    #[inline]
    fn blend(self, new_value: Self, alpha: f32) -> Self {
        let alpha = alpha as f64;
        new_value * alpha + self * (1.0 - alpha)
    }
}

impl Smooth for Vec3 {
    #[inline]
    fn blend(self, new_value: Self, alpha: f32) -> Self {
        new_value * alpha + self * (1.0 - alpha)
    }
}

impl Smooth for Quat {
    /// Normalized lerp along the shortest arc.
    #[inline]
    fn blend(self, new_value: Self, alpha: f32) -> Self {
        self.lerp(new_value, alpha)
    }
}

/// Mix `new_value` into the running average `avg` in place.
#[inline]
pub fn exp_mov_avg<T: Smooth>(avg: &mut T, new_value: T, generations: f32) {
    *avg = avg.blend(new_value, alpha(generations));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_bounds() {
        assert_eq!(alpha(1.0), 1.0);
        assert!((alpha(8.0) - 2.0 / 9.0).abs() < 1e-6);
        // Sub-unit windows are clamped rather than overshooting
        assert_eq!(alpha(0.25), 1.0);
    }

    #[test]
    fn test_converges_to_constant_input() {
        for generations in [1.0, 1.5, 8.0, 60.0, 120.0] {
            let mut avg = 0.0_f32;
            for _ in 0..5_000 {
                exp_mov_avg(&mut avg, 3.5, generations);
            }
            assert!((avg - 3.5).abs() < 1e-3, "n={} avg={}", generations, avg);
        }
    }

    #[test]
    fn test_larger_window_converges_slower() {
        let mut fast = 0.0_f32;
        let mut slow = 0.0_f32;
        for _ in 0..10 {
            exp_mov_avg(&mut fast, 1.0, 2.0);
            exp_mov_avg(&mut slow, 1.0, 30.0);
        }
        assert!(fast > slow);
    }

    #[test]
    fn test_vec3_converges() {
        let target = Vec3::new(1.0, -2.0, 3.0);
        let mut avg = Vec3::ZERO;
        for _ in 0..500 {
            exp_mov_avg(&mut avg, target, 8.0);
        }
        assert!(avg.abs_diff_eq(target, 1e-4));
    }

    #[test]
    fn test_quat_stays_normalized() {
        let target = Quat::from_rotation_y(1.2);
        let mut avg = Quat::IDENTITY;
        for _ in 0..200 {
            exp_mov_avg(&mut avg, target, 8.0);
            assert!((avg.length() - 1.0).abs() < 1e-4);
        }
        assert!(avg.angle_between(target) < 1e-3);
    }
}
