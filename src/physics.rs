//! Rigid-body world for shells.
//!
//! A small sphere-only physics engine: bodies fall under a single global
//! gravity vector, take central impulses, and bounce off each other with a
//! restitution impulse. Time advances in fixed-size substeps; after every
//! substep the world writes each body's transform into the
//! [`StepListener`] (the motion-state path) and then calls
//! [`StepListener::substep`] exactly once, with the world settled.
//!
//! ```ignore
//! let mut world = PhysicsWorld::new(Vec3::new(0.0, -9.806, 0.0), 1.0 / 120.0, 8, 4096)?;
//! let body = world.add_sphere(SphereBody::new(Vec3::ZERO, 1.0, 1.0))?;
//! world.apply_central_impulse(body, Vec3::new(0.0, 70.0, 0.0))?;
//! world.step(1.0 / 60.0, &mut listener);
//! ```

use glam::{Quat, Vec3};

use crate::arena::{Arena, Index};
use crate::config::Config;
use crate::error::PhysicsError;

/// Fraction of the approach speed kept after two spheres collide.
const RESTITUTION: f32 = 0.5;

/// Position and orientation of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Handle to a body registered with a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(Index);

/// Description of a spherical rigid body.
#[derive(Debug, Clone, Copy)]
pub struct SphereBody {
    pub transform: Transform,
    pub radius: f32,
    pub mass: f32,
}

impl SphereBody {
    pub fn new(position: Vec3, radius: f32, mass: f32) -> Self {
        Self {
            transform: Transform::from_translation(position),
            radius,
            mass,
        }
    }
}

#[derive(Debug, Clone)]
struct RigidBody {
    transform: Transform,
    linear_velocity: Vec3,
    radius: f32,
    inverse_mass: f32,
}

impl RigidBody {
    /// Exact for constant acceleration.
    fn integrate(&mut self, gravity: Vec3, dt: f32) {
        self.transform.translation += self.linear_velocity * dt + 0.5 * gravity * dt * dt;
        self.linear_velocity += gravity * dt;
    }
}

/// Receives the results of each substep.
pub trait StepListener {
    /// Motion-state write: the body's transform after the substep.
    fn set_world_transform(&mut self, body: BodyHandle, transform: &Transform);

    /// Called once per substep after every transform was written.
    ///
    /// The world is settled, so bodies may be removed here.
    fn substep(&mut self, world: &mut PhysicsWorld, dt: f32);
}

impl StepListener for () {
    fn set_world_transform(&mut self, _body: BodyHandle, _transform: &Transform) {}
    fn substep(&mut self, _world: &mut PhysicsWorld, _dt: f32) {}
}

/// Outcome of [`PhysicsWorld::step`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepReport {
    /// Substeps taken.
    pub substeps: u32,
    /// Seconds actually simulated.
    pub simulated: f32,
    /// Seconds thrown away because the substep cap was reached.
    pub dropped: f32,
}

/// Sphere-only rigid-body world.
#[derive(Debug)]
pub struct PhysicsWorld {
    bodies: Arena<RigidBody>,
    gravity: Vec3,
    fixed_step: f32,
    max_substeps: u32,
    max_bodies: usize,
}

impl PhysicsWorld {
    pub fn new(
        gravity: Vec3,
        fixed_step: f32,
        max_substeps: u32,
        max_bodies: usize,
    ) -> Result<Self, PhysicsError> {
        if !gravity.is_finite() {
            return Err(PhysicsError::InvalidWorld(format!("gravity {} is not finite", gravity)));
        }
        if !(fixed_step.is_finite() && fixed_step > 0.0) {
            return Err(PhysicsError::InvalidWorld(format!(
                "fixed step {} must be positive",
                fixed_step
            )));
        }
        if max_substeps == 0 || max_bodies == 0 {
            return Err(PhysicsError::InvalidWorld(
                "substep and body limits must be at least 1".into(),
            ));
        }
        Ok(Self {
            bodies: Arena::new(),
            gravity,
            fixed_step,
            max_substeps,
            max_bodies,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, PhysicsError> {
        Self::new(
            config.gravity,
            config.physics_fixed_step,
            config.physics_max_substeps,
            config.max_bodies,
        )
    }

    #[inline]
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    #[inline]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn contains(&self, body: BodyHandle) -> bool {
        self.bodies.contains(body.0)
    }

    /// Register a sphere.
    pub fn add_sphere(&mut self, desc: SphereBody) -> Result<BodyHandle, PhysicsError> {
        if !(desc.mass.is_finite() && desc.mass > 0.0) {
            return Err(PhysicsError::InvalidBody(format!("mass {} must be positive", desc.mass)));
        }
        if !(desc.radius.is_finite() && desc.radius > 0.0) {
            return Err(PhysicsError::InvalidBody(format!(
                "radius {} must be positive",
                desc.radius
            )));
        }
        if !desc.transform.translation.is_finite() {
            return Err(PhysicsError::InvalidBody("position is not finite".into()));
        }
        if self.bodies.len() >= self.max_bodies {
            return Err(PhysicsError::CapacityExhausted(self.max_bodies));
        }

        let index = self.bodies.insert(RigidBody {
            transform: desc.transform,
            linear_velocity: Vec3::ZERO,
            radius: desc.radius,
            inverse_mass: 1.0 / desc.mass,
        });
        Ok(BodyHandle(index))
    }

    /// Deregister a body. Its handle is dead afterwards.
    pub fn remove_body(&mut self, body: BodyHandle) -> Result<(), PhysicsError> {
        self.bodies
            .remove(body.0)
            .map(|_| ())
            .ok_or(PhysicsError::UnknownBody)
    }

    /// Change velocity by `impulse / mass`.
    pub fn apply_central_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> Result<(), PhysicsError> {
        let rb = self.bodies.get_mut(body.0).ok_or(PhysicsError::UnknownBody)?;
        rb.linear_velocity += impulse * rb.inverse_mass;
        Ok(())
    }

    pub fn transform(&self, body: BodyHandle) -> Option<Transform> {
        self.bodies.get(body.0).map(|rb| rb.transform)
    }

    pub fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.bodies.get(body.0).map(|rb| rb.linear_velocity)
    }

    /// Advance by `dt` seconds in equal substeps no longer than the fixed step.
    ///
    /// When `dt` would need more than the substep cap, the world advances
    /// by `max_substeps` fixed steps and drops the rest.
    pub fn step<L>(&mut self, dt: f32, listener: &mut L) -> StepReport
    where
        L: StepListener + ?Sized,
    {
        if !(dt.is_finite() && dt > 0.0) {
            return StepReport::default();
        }

        // Tolerate rounding so dt == k * fixed_step takes exactly k substeps
        let needed = (dt / self.fixed_step - 1e-3).ceil().max(1.0) as u32;
        let (substeps, h) = if needed > self.max_substeps {
            (self.max_substeps, self.fixed_step)
        } else {
            (needed, dt / needed as f32)
        };
        let simulated = h * substeps as f32;
        let dropped = (dt - simulated).max(0.0);
        if dropped > 0.0 {
            log::warn!(
                "Physics computation far behind, dropping {}ms",
                (dropped * 1000.0).round()
            );
        }

        for _ in 0..substeps {
            self.integrate(h);
            self.resolve_contacts();
            for (index, rb) in self.bodies.iter() {
                listener.set_world_transform(BodyHandle(index), &rb.transform);
            }
            listener.substep(self, h);
        }

        StepReport {
            substeps,
            simulated,
            dropped,
        }
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.gravity;
        for (_, rb) in self.bodies.iter_mut() {
            rb.integrate(gravity, dt);
        }
    }

    /// Restitution impulses between overlapping, approaching spheres.
    fn resolve_contacts(&mut self) {
        let snapshot: Vec<(Index, Vec3, Vec3, f32, f32)> = self
            .bodies
            .iter()
            .map(|(index, rb)| {
                (
                    index,
                    rb.transform.translation,
                    rb.linear_velocity,
                    rb.radius,
                    rb.inverse_mass,
                )
            })
            .collect();
        let mut velocities: Vec<Vec3> = snapshot.iter().map(|b| b.2).collect();

        for a in 0..snapshot.len() {
            for b in (a + 1)..snapshot.len() {
                let (_, pa, _, ra, ima) = snapshot[a];
                let (_, pb, _, rb, imb) = snapshot[b];
                let offset = pb - pa;
                let reach = ra + rb;
                if offset.length_squared() >= reach * reach {
                    continue;
                }
                let Some(normal) = offset.try_normalize() else {
                    // Concentric
                    continue;
                };
                let approach = (velocities[a] - velocities[b]).dot(normal);
                if approach <= 0.0 {
                    // Already separating
                    continue;
                }
                let j = (1.0 + RESTITUTION) * approach / (ima + imb);
                velocities[a] -= normal * j * ima;
                velocities[b] += normal * j * imb;
            }
        }

        for ((index, ..), velocity) in snapshot.into_iter().zip(velocities) {
            if let Some(rb) = self.bodies.get_mut(index) {
                rb.linear_velocity = velocity;
            }
        }
    }
}
