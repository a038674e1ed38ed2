//! Frame timing for the simulation.
//!
//! The render timer fires at a fixed cadence but real frame deltas jitter.
//! [`Clock`] keeps both: the raw wall-clock delta (used for FPS statistics)
//! and an exponentially smoothed delta that every simulated quantity
//! (physics, shell and cluster ages) advances by.
//!
//! # Example
//!
//! ```ignore
//! use fyreware::time::Clock;
//!
//! let mut clock = Clock::new(60.0);
//!
//! // In the tick handler:
//! let delta = clock.tick(raw_seconds);
//! scene.advance(delta.smoothed);
//! ```

use crate::smoothing::exp_mov_avg;

/// Longest raw delta accepted in one tick, in seconds.
///
/// Longer stalls (window drags, debugger breaks) are clamped so a single
/// tick never launches shells through the floor.
pub const MAX_FRAME_DELTA: f32 = 0.25;

/// Raw and smoothed delta produced by one clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameDelta {
    /// Wall-clock seconds since the previous tick (clamped).
    pub raw: f32,
    /// Exponentially smoothed seconds, the simulation timestep.
    pub smoothed: f32,
}

/// Simulation clock with a smoothed timestep.
#[derive(Debug)]
pub struct Clock {
    /// Smoothing window in generations.
    generations: f32,
    /// Last raw delta in seconds.
    raw_delta: f32,
    /// Smoothed delta in seconds, `None` until the first tick seeds it.
    smoothed_delta: Option<f32>,
    /// Simulated seconds (sum of smoothed deltas).
    simulated: f64,
    /// Total ticks since start.
    frame_count: u64,
}

impl Clock {
    /// Create a clock whose smoothed delta averages over `generations` ticks.
    pub fn new(generations: f32) -> Self {
        Self {
            generations,
            raw_delta: 0.0,
            smoothed_delta: None,
            simulated: 0.0,
            frame_count: 0,
        }
    }

    /// Advance by an externally measured raw delta.
    ///
    /// The first positive delta seeds the average. Zero deltas before
    /// that leave it unseeded.
    pub fn tick(&mut self, raw: f32) -> FrameDelta {
        let raw = if raw.is_finite() { raw.max(0.0) } else { 0.0 };
        let raw = if raw > MAX_FRAME_DELTA {
            log::warn!(
                "Frame took {:.0}ms, clamping to {:.0}ms",
                raw * 1000.0,
                MAX_FRAME_DELTA * 1000.0
            );
            MAX_FRAME_DELTA
        } else {
            raw
        };

        let smoothed = match self.smoothed_delta {
            Some(mut avg) => {
                exp_mov_avg(&mut avg, raw, self.generations);
                self.smoothed_delta = Some(avg);
                avg
            }
            None if raw > 0.0 => {
                self.smoothed_delta = Some(raw);
                raw
            }
            None => 0.0,
        };

        self.raw_delta = raw;
        self.simulated += smoothed as f64;
        self.frame_count += 1;

        FrameDelta { raw, smoothed }
    }

    /// Last raw delta in seconds.
    #[inline]
    pub fn raw_delta(&self) -> f32 {
        self.raw_delta
    }

    /// Current smoothed delta in seconds.
    #[inline]
    pub fn smoothed_delta(&self) -> f32 {
        self.smoothed_delta.unwrap_or(0.0)
    }

    /// Simulated seconds since start.
    #[inline]
    pub fn simulated(&self) -> f64 {
        self.simulated
    }

    /// Total ticks since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_new() {
        let clock = Clock::new(30.0);
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.smoothed_delta(), 0.0);
    }

    #[test]
    fn test_first_tick_seeds_average() {
        let mut clock = Clock::new(60.0);
        let delta = clock.tick(0.016);
        assert_eq!(delta.raw, 0.016);
        assert_eq!(delta.smoothed, 0.016);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_smoothing_damps_spike() {
        let mut clock = Clock::new(60.0);
        for _ in 0..100 {
            clock.tick(0.016);
        }
        let delta = clock.tick(0.100);
        assert_eq!(delta.raw, 0.100);
        assert!(delta.smoothed < 0.020, "spike leaked through: {}", delta.smoothed);
    }

    #[test]
    fn test_clamps_long_stall() {
        let mut clock = Clock::new(1.0);
        let delta = clock.tick(3.0);
        assert_eq!(delta.raw, MAX_FRAME_DELTA);
        assert_eq!(delta.smoothed, MAX_FRAME_DELTA);
    }

    #[test]
    fn test_rejects_nan_delta() {
        let mut clock = Clock::new(8.0);
        let delta = clock.tick(f32::NAN);
        assert_eq!(delta.raw, 0.0);
        assert!(delta.smoothed.is_finite());
    }

    #[test]
    fn test_simulated_time_accumulates() {
        let mut clock = Clock::new(1.0);
        for _ in 0..10 {
            clock.tick(0.1);
        }
        assert!((clock.simulated() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_first_tick_does_not_seed() {
        let mut clock = Clock::new(60.0);
        let delta = clock.tick(0.0);
        assert_eq!(delta.smoothed, 0.0);

        let delta = clock.tick(1.0 / 60.0);
        assert!((delta.smoothed - 1.0 / 60.0).abs() < 1e-6, "{}", delta.smoothed);

        for _ in 0..59 {
            clock.tick(1.0 / 60.0);
        }
        assert!((clock.simulated() - 1.0).abs() < 1e-4, "{}", clock.simulated());
    }
}
