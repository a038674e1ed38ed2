//! Ballistic shells.
//!
//! A shell is a sphere registered with the [`PhysicsWorld`]. It never moves
//! itself: the world writes its transform through
//! [`Shell::set_world_transform`] after every substep, and the shell only
//! counts its age. Once the age reaches the shell's lifetime it deregisters
//! its body and reports one explosion at its last written position.
//!
//! ```text
//! Flying --age >= lifetime--> Exploding --cluster built--> Destroyed
//! ```

use glam::{Mat4, Vec3};
use rand::RngCore;

use crate::config::Config;
use crate::error::PhysicsError;
use crate::physics::{BodyHandle, PhysicsWorld, SphereBody, Transform};
use crate::random::{randf, sample};

/// Where a shell is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    Flying,
    Exploding,
    Destroyed,
}

/// Launch parameters for one shell.
#[derive(Debug, Clone, Copy)]
pub struct ShellLaunch {
    pub origin: Vec3,
    pub impulse: Vec3,
    pub lifetime: f32,
    pub radius: f32,
    pub mass: f32,
}

impl ShellLaunch {
    /// Random pad position and upward-biased impulse from the config.
    pub fn random(config: &Config, rng: &mut dyn RngCore) -> Self {
        let area = config.launch_area;
        let spread = config.launch_spread;
        Self {
            origin: Vec3::new(randf(rng, -area, area), 0.0, randf(rng, -area, area)),
            impulse: Vec3::new(
                randf(rng, -spread, spread),
                sample(rng, &config.launch_speed),
                randf(rng, -spread, spread),
            ),
            lifetime: sample(rng, &config.shell_lifetime),
            radius: config.shell_radius,
            mass: config.shell_mass,
        }
    }
}

#[derive(Debug)]
pub struct Shell {
    body: Option<BodyHandle>,
    transform: Transform,
    radius: f32,
    age: f32,
    lifetime: f32,
    state: ShellState,
}

impl Shell {
    /// Register a body and fire it.
    pub fn launch(world: &mut PhysicsWorld, launch: ShellLaunch) -> Result<Self, PhysicsError> {
        let body = world.add_sphere(SphereBody::new(launch.origin, launch.radius, launch.mass))?;
        if let Err(e) = world.apply_central_impulse(body, launch.impulse) {
            let _ = world.remove_body(body);
            return Err(e);
        }
        log::trace!(
            "Shell launched from {} with impulse {} for {:.2}s",
            launch.origin,
            launch.impulse,
            launch.lifetime
        );
        Ok(Self {
            body: Some(body),
            transform: Transform::from_translation(launch.origin),
            radius: launch.radius,
            age: 0.0,
            lifetime: launch.lifetime,
            state: ShellState::Flying,
        })
    }

    /// Registered physics body, until the shell explodes.
    #[inline]
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    #[inline]
    pub fn state(&self) -> ShellState {
        self.state
    }

    #[inline]
    pub fn age(&self) -> f32 {
        self.age
    }

    #[inline]
    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Motion-state read.
    #[inline]
    pub fn world_transform(&self) -> Transform {
        self.transform
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    /// Motion-state write. The only way a shell moves.
    pub fn set_world_transform(&mut self, transform: &Transform) {
        if self.state == ShellState::Flying {
            self.transform = *transform;
        }
    }

    /// Model matrix of the stand-in mesh.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.radius),
            self.transform.rotation,
            self.transform.translation,
        )
    }

    /// Age a flying shell.
    ///
    /// Returns the explosion origin on the call that ends the flight, and
    /// `None` on every other call, including all calls after it.
    pub fn advance(&mut self, dt: f32, world: &mut PhysicsWorld) -> Option<Vec3> {
        if self.state != ShellState::Flying {
            return None;
        }
        self.age += dt;
        if self.age < self.lifetime {
            return None;
        }

        self.state = ShellState::Exploding;
        if let Some(body) = self.body.take() {
            if let Err(e) = world.remove_body(body) {
                log::warn!("Exploding shell had no body to remove: {}", e);
            }
        }
        log::trace!("Shell exploding at {} after {:.2}s", self.position(), self.age);
        Some(self.transform.translation)
    }

    /// Finish the explosion once its cluster exists.
    pub fn destroy(&mut self) {
        self.state = ShellState::Destroyed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::StepListener;

    const G: Vec3 = Vec3::new(0.0, -9.806, 0.0);

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(G, 1.0 / 120.0, 8, 64).unwrap()
    }

    fn straight_up(lifetime: f32) -> ShellLaunch {
        ShellLaunch {
            origin: Vec3::ZERO,
            impulse: Vec3::new(0.0, 70.0, 0.0),
            lifetime,
            radius: 1.0,
            mass: 1.0,
        }
    }

    struct One<'a> {
        shell: &'a mut Shell,
        explosions: Vec<Vec3>,
    }

    impl StepListener for One<'_> {
        fn set_world_transform(&mut self, body: BodyHandle, transform: &Transform) {
            if self.shell.body() == Some(body) {
                self.shell.set_world_transform(transform);
            }
        }

        fn substep(&mut self, world: &mut PhysicsWorld, dt: f32) {
            if let Some(origin) = self.shell.advance(dt, world) {
                self.explosions.push(origin);
                self.shell.destroy();
            }
        }
    }

    #[test]
    fn test_launch_registers_body() {
        let mut world = world();
        let shell = Shell::launch(&mut world, straight_up(1.0)).unwrap();
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.linear_velocity(shell.body().unwrap()), Some(Vec3::new(0.0, 70.0, 0.0)));
        assert_eq!(shell.state(), ShellState::Flying);
    }

    #[test]
    fn test_explodes_exactly_once() {
        let mut world = world();
        let mut shell = Shell::launch(&mut world, straight_up(0.5)).unwrap();
        let mut listener = One {
            shell: &mut shell,
            explosions: Vec::new(),
        };
        // Two simulated seconds, far past the lifetime
        for _ in 0..120 {
            world.step(1.0 / 60.0, &mut listener);
        }
        assert_eq!(listener.explosions.len(), 1);
        let origin = listener.explosions[0];
        assert_eq!(shell.state(), ShellState::Destroyed);
        assert_eq!(shell.body(), None);
        assert_eq!(world.body_count(), 0);

        // The explosion happens where the body was last written
        let t = shell.age();
        let expected = Vec3::new(0.0, 70.0, 0.0) * t + 0.5 * G * t * t;
        assert!((origin - expected).length() < 0.05, "{} vs {}", origin, expected);
        assert_eq!(origin, shell.position());
    }

    #[test]
    fn test_advance_after_explosion_is_noop() {
        let mut world = world();
        let mut shell = Shell::launch(&mut world, straight_up(0.1)).unwrap();
        assert!(shell.advance(0.2, &mut world).is_some());
        assert!(shell.advance(0.2, &mut world).is_none());
        assert!(shell.advance(10.0, &mut world).is_none());
        assert_eq!(shell.state(), ShellState::Exploding);
    }

    #[test]
    fn test_transform_frozen_after_flight() {
        let mut world = world();
        let mut shell = Shell::launch(&mut world, straight_up(0.1)).unwrap();
        shell.advance(0.2, &mut world);
        shell.set_world_transform(&Transform::from_translation(Vec3::splat(99.0)));
        assert_eq!(shell.position(), Vec3::ZERO);
    }

    #[test]
    fn test_full_world_is_an_error() {
        let mut world = PhysicsWorld::new(G, 0.01, 1, 1).unwrap();
        Shell::launch(&mut world, straight_up(1.0)).unwrap();
        assert_eq!(
            Shell::launch(&mut world, straight_up(1.0)).unwrap_err(),
            PhysicsError::CapacityExhausted(1)
        );
    }

    #[test]
    fn test_random_launch_respects_config() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..100 {
            let launch = ShellLaunch::random(&config, &mut rng);
            assert!(launch.origin.x.abs() <= config.launch_area);
            assert_eq!(launch.origin.y, 0.0);
            assert!(config.launch_speed.contains(&launch.impulse.y));
            assert!(launch.impulse.z.abs() <= config.launch_spread);
            assert!(config.shell_lifetime.contains(&launch.lifetime));
        }
    }
}
