//! The particle cloud left by an exploding shell.
//!
//! A cluster never simulates its stars. Each star is nothing but an initial
//! velocity `v0`, and its position at cluster age `t` is the closed form
//!
//! ```text
//! p(t) = origin + v0 * t + 0.5 * g * t^2
//! ```
//!
//! with the same gravity the physics world uses for shells. The GPU pass
//! evaluates exactly this from the raw `v0` buffer plus the cluster's origin
//! and age, so positions are never uploaded per frame.
//! [`Cluster::star_position`] is the CPU twin used by tests and benches.

use std::ops::Range;

use glam::Vec3;
use rand::RngCore;

use crate::emitter::{StarEmitter, StarList};
use crate::random::sample;
use crate::visuals::StarColor;

/// Ballistic position after `t` seconds.
#[inline]
pub fn ballistic(origin: Vec3, v0: Vec3, gravity: Vec3, t: f32) -> Vec3 {
    origin + v0 * t + 0.5 * gravity * t * t
}

/// One explosion's worth of stars.
#[derive(Debug, Clone)]
pub struct Cluster {
    origin: Vec3,
    velocities: Vec<Vec3>,
    gravity: Vec3,
    age: f32,
    lifetime: f32,
    color: StarColor,
    expired: bool,
}

impl Cluster {
    pub fn new(origin: Vec3, velocities: Vec<Vec3>, gravity: Vec3, lifetime: f32, color: StarColor) -> Self {
        Self {
            origin,
            velocities,
            gravity,
            age: 0.0,
            lifetime,
            color,
            expired: false,
        }
    }

    /// Populate a cluster at `origin` from an emitter, with random
    /// lifetime and color.
    pub fn explode(
        origin: Vec3,
        gravity: Vec3,
        lifetime: &Range<f32>,
        emitter: &mut dyn StarEmitter,
        rng: &mut dyn RngCore,
    ) -> Self {
        let stars = StarList::collect(emitter, rng);
        let lifetime = sample(rng, lifetime);
        let color = StarColor::random(rng);
        log::trace!(
            "Cluster of {} {} stars at {} for {:.2}s",
            stars.len(),
            color.name(),
            origin,
            lifetime
        );
        Self::new(origin, stars.into_velocities(), gravity, lifetime, color)
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Initial star velocities, fixed for the cluster's life.
    #[inline]
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    #[inline]
    pub fn star_count(&self) -> usize {
        self.velocities.len()
    }

    #[inline]
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    #[inline]
    pub fn age(&self) -> f32 {
        self.age
    }

    #[inline]
    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }

    /// `age / lifetime`, within `0..=1`.
    pub fn normalized_age(&self) -> f32 {
        if self.lifetime > 0.0 {
            (self.age / self.lifetime).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    #[inline]
    pub fn color(&self) -> StarColor {
        self.color
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Age the cluster. Returns `true` on the update that expires it.
    ///
    /// An expired cluster ignores further updates.
    pub fn update(&mut self, dt: f32) -> bool {
        if self.expired {
            return false;
        }
        self.age += dt;
        if self.age >= self.lifetime {
            self.expired = true;
            return true;
        }
        false
    }

    /// Position of star `i` at the current age.
    pub fn star_position(&self, i: usize) -> Option<Vec3> {
        self.star_position_at(i, self.age)
    }

    /// Position of star `i` at age `t`.
    pub fn star_position_at(&self, i: usize, t: f32) -> Option<Vec3> {
        self.velocities
            .get(i)
            .map(|&v0| ballistic(self.origin, v0, self.gravity, t))
    }

    /// Every star position at the current age.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        let (origin, gravity, t) = (self.origin, self.gravity, self.age);
        self.velocities
            .iter()
            .map(move |&v0| ballistic(origin, v0, gravity, t))
    }
}
