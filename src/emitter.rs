//! Star emission patterns for explosions.
//!
//! When a shell explodes, a [`StarEmitter`] populates the new cluster by
//! calling [`StarSink::emit`] once per star with a direction and a speed.
//! The sink normalizes the direction and stores `direction * speed` as the
//! star's initial velocity. After population the list is frozen.
//!
//! # Emitter Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Burst::Random`] | Directions sampled in a cube, speeds in a narrow band |
//! | [`Burst::Ring`] | Evenly spaced stars on a randomly tilted circle |
//! | [`ScriptedEmitter`] | Any closure driving `emit(direction, speed)` |
//!
//! # Example
//!
//! ```ignore
//! // Two stacked rings
//! let emitter = ScriptedEmitter::new(|_rng, sink: &mut dyn StarSink| {
//!     for i in 0..64 {
//!         let a = i as f32 / 64.0 * std::f32::consts::TAU;
//!         sink.emit(Vec3::new(a.cos(), 0.2, a.sin()), 12.0);
//!         sink.emit(Vec3::new(a.cos(), -0.2, a.sin()), 8.0);
//!     }
//! });
//! ```

use std::f32::consts::TAU;
use std::ops::Range;

use glam::Vec3;
use rand::RngCore;

use crate::random::{randf, sample};

/// Receives stars from an emitter.
pub trait StarSink {
    /// Add a star moving along `direction` (any length) at `speed`.
    fn emit(&mut self, direction: Vec3, speed: f32);
}

/// Populates a cluster's star list.
pub trait StarEmitter {
    fn populate(&mut self, rng: &mut dyn RngCore, sink: &mut dyn StarSink);
}

/// Initial velocities collected from an emitter.
#[derive(Debug, Clone, Default)]
pub struct StarList {
    velocities: Vec<Vec3>,
    rejected: usize,
}

impl StarList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `emitter` against a fresh list.
    pub fn collect(emitter: &mut dyn StarEmitter, rng: &mut dyn RngCore) -> Self {
        let mut list = Self::new();
        emitter.populate(rng, &mut list);
        if list.rejected > 0 {
            log::debug!("Emitter produced {} unusable stars", list.rejected);
        }
        list
    }

    pub fn len(&self) -> usize {
        self.velocities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.velocities.is_empty()
    }

    /// Stars skipped for a zero or non-finite direction, or a non-finite
    /// speed. Zero speed is kept.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn into_velocities(self) -> Vec<Vec3> {
        self.velocities
    }
}

impl StarSink for StarList {
    fn emit(&mut self, direction: Vec3, speed: f32) {
        match direction.try_normalize() {
            Some(unit) if speed.is_finite() => self.velocities.push(unit * speed),
            _ => self.rejected += 1,
        }
    }
}

/// Built-in procedural patterns.
#[derive(Debug, Clone)]
pub enum Burst {
    /// Uniform cube directions, rescaled into `speed`.
    Random { count: usize, speed: Range<f32> },

    /// A flat ring on a plane with a random normal.
    Ring { count: usize, speed: f32 },
}

impl Burst {
    /// Star count this pattern emits.
    pub fn count(&self) -> usize {
        match self {
            Burst::Random { count, .. } | Burst::Ring { count, .. } => *count,
        }
    }
}

/// Random direction in the unit cube, resampled if it lands on the origin.
fn cube_direction(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let d = Vec3::new(randf(rng, -1.0, 1.0), randf(rng, -1.0, 1.0), randf(rng, -1.0, 1.0));
        if d.length_squared() > 1e-12 {
            return d;
        }
    }
}

impl StarEmitter for Burst {
    fn populate(&mut self, rng: &mut dyn RngCore, sink: &mut dyn StarSink) {
        match self {
            Burst::Random { count, speed } => {
                for _ in 0..*count {
                    let direction = cube_direction(rng);
                    sink.emit(direction, sample(rng, speed));
                }
            }
            Burst::Ring { count, speed } => {
                let (u, v) = cube_direction(rng).normalize().any_orthonormal_pair();
                for i in 0..*count {
                    let angle = i as f32 / *count as f32 * TAU;
                    sink.emit(u * angle.cos() + v * angle.sin(), *speed);
                }
            }
        }
    }
}

/// Emission delegated to a closure.
pub struct ScriptedEmitter<F> {
    program: F,
}

impl<F> ScriptedEmitter<F>
where
    F: FnMut(&mut dyn RngCore, &mut dyn StarSink),
{
    pub fn new(program: F) -> Self {
        Self { program }
    }
}

impl<F> StarEmitter for ScriptedEmitter<F>
where
    F: FnMut(&mut dyn RngCore, &mut dyn StarSink),
{
    fn populate(&mut self, rng: &mut dyn RngCore, sink: &mut dyn StarSink) {
        (self.program)(rng, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sink_normalizes_direction() {
        let mut list = StarList::new();
        list.emit(Vec3::new(0.0, 3.0, 4.0), 10.0);
        let v = list.clone().into_velocities()[0];
        assert!((v - Vec3::new(0.0, 6.0, 8.0)).length() < 1e-5);
    }

    #[test]
    fn test_sink_rejects_degenerate_stars() {
        let mut list = StarList::new();
        list.emit(Vec3::ZERO, 10.0);
        list.emit(Vec3::new(f32::NAN, 0.0, 0.0), 10.0);
        list.emit(Vec3::X, f32::INFINITY);
        list.emit(Vec3::X, 0.0);
        assert_eq!(list.len(), 1);
        assert_eq!(list.rejected(), 3);
    }

    #[test]
    fn test_random_burst_speed_band() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut burst = Burst::Random {
            count: 1024,
            speed: 9.5..10.5,
        };
        let stars = StarList::collect(&mut burst, &mut rng);
        assert_eq!(stars.len(), 1024);
        for v in stars.into_velocities() {
            let speed = v.length();
            assert!((9.5 - 1e-4..10.5 + 1e-4).contains(&speed), "{}", speed);
        }
    }

    #[test]
    fn test_ring_is_planar() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut ring = Burst::Ring { count: 36, speed: 4.0 };
        let velocities = StarList::collect(&mut ring, &mut rng).into_velocities();
        assert_eq!(velocities.len(), 36);
        let normal = velocities[0].cross(velocities[9]).normalize();
        for v in &velocities {
            assert!((v.length() - 4.0).abs() < 1e-4);
            assert!(v.dot(normal).abs() < 1e-3);
        }
        // Evenly spaced stars cancel out
        let sum: Vec3 = velocities.iter().copied().sum();
        assert!(sum.length() < 1e-3);
    }

    #[test]
    fn test_empty_script_is_valid() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut silent = ScriptedEmitter::new(|_: &mut dyn RngCore, _: &mut dyn StarSink| {});
        let stars = StarList::collect(&mut silent, &mut rng);
        assert!(stars.is_empty());
    }

    #[test]
    fn test_script_drives_sink() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut script = ScriptedEmitter::new(|_: &mut dyn RngCore, sink: &mut dyn StarSink| {
            sink.emit(Vec3::Y, 2.0);
            sink.emit(-Vec3::Y, 3.0);
        });
        let velocities = StarList::collect(&mut script, &mut rng).into_velocities();
        assert_eq!(velocities, vec![Vec3::Y * 2.0, -Vec3::Y * 3.0]);
    }
}
