//! Per-tick orchestration of the fireworks.
//!
//! A [`Scene`] owns everything the simulation needs: the clock, the
//! orbital camera, the smoothed spectrum, the physics world and an arena of
//! live [`Entity`] values. The audio layer is not owned; it is handed to
//! [`Scene::tick`] each time so the same scene runs against a real player,
//! [`NullAudio`](crate::audio::NullAudio) or a scripted test source.
//!
//! One tick runs these stages in order:
//!
//! 1. advance the clock (raw and smoothed delta)
//! 2. update the spectrum from the audio source
//! 3. ask the launch policy how many shells to launch, and launch them
//! 4. step the physics world by the smoothed delta; after every substep the
//!    world writes shell transforms and the scene advances every live
//!    shell and cluster, exploding shells into clusters
//! 5. sweep entities marked during the step
//! 6. advance the camera and update the audio listener
//!
//! Entities are only marked for destruction while the step is running and
//! removed once it has returned, so nothing is freed inside a broadcast.

use std::collections::HashMap;
use std::ops::Range;

use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::arena::{Arena, Index};
use crate::audio::{AudioSink, Listener, SpectrumSource};
use crate::camera::OrbitalCamera;
use crate::cluster::Cluster;
use crate::config::Config;
use crate::emitter::{Burst, StarEmitter};
use crate::error::{AppError, PhysicsError};
use crate::physics::{BodyHandle, PhysicsWorld, StepListener, StepReport, Transform};
use crate::shell::{Shell, ShellLaunch};
use crate::spectrum::{EnergyTrigger, LaunchPolicy, Launcher, Spectrum};
use crate::time::{Clock, FrameDelta};

/// Anything the scene advances each substep.
#[derive(Debug)]
pub enum Entity {
    Shell(Shell),
    Cluster(Cluster),
}

/// What happened during one [`Scene::tick`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    pub delta: FrameDelta,
    /// Shells launched this tick.
    pub launched: u32,
    /// Launch requests dropped because the world was full.
    pub skipped: u32,
    /// Shells that exploded into clusters.
    pub exploded: u32,
    /// Clusters that reached the end of their lifetime.
    pub expired: u32,
    pub step: StepReport,
}

pub struct Scene {
    config: Config,
    clock: Clock,
    camera: OrbitalCamera,
    spectrum: Spectrum,
    world: PhysicsWorld,
    entities: Arena<Entity>,
    bodies: HashMap<BodyHandle, Index>,
    policy: Box<dyn LaunchPolicy>,
    emitter: Box<dyn StarEmitter>,
    rng: StdRng,
    view: Mat4,
}

impl Scene {
    /// Build a scene from a validated config.
    ///
    /// The default launch policy is [`EnergyTrigger`] and the default
    /// emitter is a random [`Burst`] sized by the config.
    pub fn new(config: Config) -> Result<Self, AppError> {
        config.validate()?;
        let world = PhysicsWorld::from_config(&config)?;

        let mut camera = OrbitalCamera::new()
            .with_smoothing(config.camera_generations)
            .with_max_distance(config.camera_max_distance)
            .with_orbit(config.camera_distance, config.camera_altitude, config.camera_azimuth);
        let view = camera.invoke();

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        log::debug!(
            "Scene ready: gravity {}, {} stars per cluster, {} body capacity",
            config.gravity,
            config.star_count,
            config.max_bodies
        );

        Ok(Self {
            clock: Clock::new(config.clock_generations),
            spectrum: Spectrum::from_config(&config),
            policy: Box::new(EnergyTrigger::from_config(&config)),
            emitter: Box::new(Burst::Random {
                count: config.star_count,
                speed: config.star_speed.clone(),
            }),
            camera,
            world,
            entities: Arena::new(),
            bodies: HashMap::new(),
            rng,
            view,
            config,
        })
    }

    /// Replace the launch policy.
    pub fn with_launch_policy(mut self, policy: impl LaunchPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replace the star emission pattern used by every explosion.
    pub fn with_emitter(mut self, emitter: impl StarEmitter + 'static) -> Self {
        self.emitter = Box::new(emitter);
        self
    }

    pub fn set_launch_policy(&mut self, policy: Box<dyn LaunchPolicy>) {
        self.policy = policy;
    }

    pub fn set_emitter(&mut self, emitter: Box<dyn StarEmitter>) {
        self.emitter = emitter;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn camera(&self) -> &OrbitalCamera {
        &self.camera
    }

    /// Mutable camera for input handling.
    pub fn camera_mut(&mut self) -> &mut OrbitalCamera {
        &mut self.camera
    }

    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    /// Smoothed view matrix from the last tick.
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Right-handed perspective projection for the given aspect ratio.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        Mat4::perspective_rh(
            self.config.fov_y.to_radians(),
            aspect,
            self.config.near,
            self.config.far,
        )
    }

    /// Position to render from (smoothed).
    pub fn eye(&self) -> Vec3 {
        self.camera.camera().smoothed_position()
    }

    /// Live entities, including ones marked during the last step.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn shells(&self) -> impl Iterator<Item = &Shell> {
        self.entities.iter().filter_map(|(_, e)| match e {
            Entity::Shell(shell) => Some(shell),
            Entity::Cluster(_) => None,
        })
    }

    /// Live clusters with their stable indices.
    pub fn clusters(&self) -> impl Iterator<Item = (Index, &Cluster)> {
        self.entities.iter().filter_map(|(index, e)| match e {
            Entity::Cluster(cluster) => Some((index, cluster)),
            Entity::Shell(_) => None,
        })
    }

    pub fn shell_count(&self) -> usize {
        self.shells().count()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters().count()
    }

    /// Register a shell with the world and start advancing it.
    pub fn launch(&mut self, launch: ShellLaunch) -> Result<Index, PhysicsError> {
        let shell = Shell::launch(&mut self.world, launch)?;
        let body = shell.body();
        let index = self.entities.insert(Entity::Shell(shell));
        if let Some(body) = body {
            self.bodies.insert(body, index);
        }
        log::trace!("Launched shell from {} with impulse {}", launch.origin, launch.impulse);
        Ok(index)
    }

    /// Run one frame of simulation.
    ///
    /// `raw_dt` is the measured wall-clock time since the last tick.
    /// Errors only when the world rejects a shell for a reason other than
    /// being full, which means the config is unusable.
    pub fn tick(
        &mut self,
        raw_dt: f32,
        source: &mut dyn SpectrumSource,
        audio: &mut dyn AudioSink,
    ) -> Result<TickReport, PhysicsError> {
        let report = self.listen(raw_dt, source)?;
        Ok(self.advance(report, audio))
    }

    /// [`tick`](Self::tick) against one value that is both the spectrum
    /// source and the audio sink, such as a [`Player`](crate::audio::Player).
    pub fn tick_with<A>(&mut self, raw_dt: f32, audio: &mut A) -> Result<TickReport, PhysicsError>
    where
        A: SpectrumSource + AudioSink,
    {
        let report = self.listen(raw_dt, audio)?;
        Ok(self.advance(report, audio))
    }

    /// Clock, spectrum and launches.
    fn listen(&mut self, raw_dt: f32, source: &mut dyn SpectrumSource) -> Result<TickReport, PhysicsError> {
        let mut report = TickReport {
            delta: self.clock.tick(raw_dt),
            ..Default::default()
        };

        self.spectrum.update(source);

        if source.is_playing() {
            let mut launcher = Launcher::new();
            self.policy.evaluate(&self.spectrum, &mut self.rng, &mut launcher);
            for _ in 0..launcher.requested() {
                let launch = ShellLaunch::random(&self.config, &mut self.rng);
                match self.launch(launch) {
                    Ok(_) => report.launched += 1,
                    Err(PhysicsError::CapacityExhausted(max)) => {
                        log::warn!("Skipping launch, all {} bodies in use", max);
                        report.skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(report)
    }

    /// Physics step, sweep, camera and listener.
    fn advance(&mut self, mut report: TickReport, audio: &mut dyn AudioSink) -> TickReport {
        let mut broadcast = Broadcast {
            entities: &mut self.entities,
            bodies: &mut self.bodies,
            emitter: self.emitter.as_mut(),
            rng: &mut self.rng,
            audio: &mut *audio,
            gravity: self.config.gravity,
            cluster_lifetime: &self.config.cluster_lifetime,
            exploded: 0,
            expired: 0,
        };
        report.step = self.world.step(report.delta.smoothed, &mut broadcast);
        report.exploded = broadcast.exploded;
        report.expired = broadcast.expired;

        for (_, entity) in self.entities.sweep() {
            if let Entity::Shell(shell) = entity {
                log::trace!("Shell removed after {:.2}s", shell.age());
            }
        }

        self.view = self.camera.invoke();
        let camera = self.camera.camera();
        let velocity = if report.delta.raw > 0.0 {
            camera.velocity() / report.delta.raw
        } else {
            Vec3::ZERO
        };
        audio.set_listener(&Listener {
            position: camera.position(),
            velocity,
            forward: camera.forward(),
            up: camera.up(),
        });

        report
    }
}

/// Substep listener: routes transforms to shells and advances entities.
struct Broadcast<'a> {
    entities: &'a mut Arena<Entity>,
    bodies: &'a mut HashMap<BodyHandle, Index>,
    emitter: &'a mut dyn StarEmitter,
    rng: &'a mut StdRng,
    audio: &'a mut dyn AudioSink,
    gravity: Vec3,
    cluster_lifetime: &'a Range<f32>,
    exploded: u32,
    expired: u32,
}

impl StepListener for Broadcast<'_> {
    fn set_world_transform(&mut self, body: BodyHandle, transform: &Transform) {
        let Some(&index) = self.bodies.get(&body) else {
            return;
        };
        if let Some(Entity::Shell(shell)) = self.entities.get_mut(index) {
            shell.set_world_transform(transform);
        }
    }

    fn substep(&mut self, world: &mut PhysicsWorld, dt: f32) {
        let mut born = Vec::new();

        for index in self.entities.live_indices() {
            let Some(entity) = self.entities.get_mut(index) else {
                continue;
            };
            match entity {
                Entity::Shell(shell) => {
                    let body = shell.body();
                    let Some(origin) = shell.advance(dt, world) else {
                        continue;
                    };
                    if let Some(body) = body {
                        self.bodies.remove(&body);
                    }
                    born.push(Cluster::explode(
                        origin,
                        self.gravity,
                        self.cluster_lifetime,
                        &mut *self.emitter,
                        &mut *self.rng,
                    ));
                    self.audio.play_cue(origin);
                    shell.destroy();
                    self.entities.mark(index);
                    self.exploded += 1;
                }
                Entity::Cluster(cluster) => {
                    if cluster.update(dt) {
                        self.entities.mark(index);
                        self.expired += 1;
                    }
                }
            }
        }

        for cluster in born {
            self.entities.insert(Entity::Cluster(cluster));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullAudio;
    use crate::emitter::{ScriptedEmitter, StarSink};
    use crate::shell::ShellState;
    use crate::spectrum::ScriptedAnalyzer;
    use rand::RngCore;

    /// Always playing, with a fixed magnitude in every bin.
    struct Constant(f32);

    impl SpectrumSource for Constant {
        fn is_playing(&self) -> bool {
            true
        }

        fn read_spectrum(&mut self, left: &mut [f32], right: &mut [f32]) -> bool {
            left.fill(self.0);
            right.fill(self.0);
            true
        }
    }

    #[derive(Default)]
    struct Cues {
        played: Vec<Vec3>,
        listener: Option<Listener>,
    }

    impl AudioSink for Cues {
        fn set_listener(&mut self, listener: &Listener) {
            self.listener = Some(*listener);
        }

        fn play_cue(&mut self, position: Vec3) {
            self.played.push(position);
        }
    }

    fn config() -> Config {
        Config::default()
            .with_seed(7)
            .with_shell_lifetime(0.5..0.5)
            .with_cluster_lifetime(0.25..0.25)
            .with_star_count(16)
    }

    fn up_shell() -> ShellLaunch {
        ShellLaunch {
            origin: Vec3::ZERO,
            impulse: Vec3::new(0.0, 70.0, 0.0),
            lifetime: 0.5,
            radius: 1.0,
            mass: 1.0,
        }
    }

    #[test]
    fn test_shell_becomes_one_cluster() {
        let mut scene = Scene::new(config()).unwrap();
        scene.launch(up_shell()).unwrap();
        assert_eq!(scene.shell_count(), 1);
        assert_eq!(scene.world().body_count(), 1);

        let mut cues = Cues::default();
        let mut exploded = 0;
        for _ in 0..33 {
            exploded += scene.tick(1.0 / 60.0, &mut NullAudio, &mut cues).unwrap().exploded;
        }

        assert_eq!(exploded, 1);
        assert_eq!(cues.played.len(), 1);
        assert_eq!(scene.shell_count(), 0);
        assert_eq!(scene.world().body_count(), 0);
        assert_eq!(scene.cluster_count(), 1);

        // Explosion origin is the last transform the world wrote
        let (_, cluster) = scene.clusters().next().unwrap();
        assert_eq!(cluster.origin(), cues.played[0]);
        assert!(cluster.origin().y > 30.0);
        assert_eq!(cluster.star_count(), 16);
    }

    #[test]
    fn test_cluster_expires_and_is_swept() {
        let mut scene = Scene::new(config()).unwrap();
        scene.launch(up_shell()).unwrap();

        let mut expired = 0;
        for _ in 0..90 {
            expired += scene.tick(1.0 / 60.0, &mut NullAudio, &mut NullAudio).unwrap().expired;
        }
        assert_eq!(expired, 1);
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn test_no_launches_while_silent_source_is_stopped() {
        let mut scene = Scene::new(config()).unwrap();
        for _ in 0..120 {
            let report = scene.tick(1.0 / 60.0, &mut NullAudio, &mut NullAudio).unwrap();
            assert_eq!(report.launched, 0);
        }
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn test_scripted_policy_launches() {
        let mut scene = Scene::new(config())
            .unwrap()
            .with_launch_policy(ScriptedAnalyzer::new(|_: &Spectrum, launcher: &mut Launcher| {
                launcher.launch();
                launcher.launch();
            }));
        let report = scene.tick(1.0 / 60.0, &mut Constant(0.1), &mut NullAudio).unwrap();
        assert_eq!(report.launched, 2);
        assert_eq!(scene.shell_count(), 2);
        assert!(scene.shells().all(|s| s.state() == ShellState::Flying));
    }

    #[test]
    fn test_full_world_skips_launch() {
        let config = config().with_max_bodies(1);
        let mut scene = Scene::new(config)
            .unwrap()
            .with_launch_policy(ScriptedAnalyzer::new(|_: &Spectrum, launcher: &mut Launcher| {
                launcher.launch();
                launcher.launch();
            }));
        let report = scene.tick(1.0 / 60.0, &mut Constant(0.1), &mut NullAudio).unwrap();
        assert_eq!(report.launched, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_empty_emitter_makes_empty_cluster() {
        let mut scene = Scene::new(config())
            .unwrap()
            .with_emitter(ScriptedEmitter::new(|_: &mut dyn RngCore, _: &mut dyn StarSink| {}));
        scene.launch(up_shell()).unwrap();
        for _ in 0..33 {
            scene.tick(1.0 / 60.0, &mut NullAudio, &mut NullAudio).unwrap();
        }
        let (_, cluster) = scene.clusters().next().unwrap();
        assert_eq!(cluster.star_count(), 0);
    }

    #[test]
    fn test_listener_follows_camera() {
        let mut scene = Scene::new(config()).unwrap();
        let mut cues = Cues::default();
        scene.tick(1.0 / 60.0, &mut NullAudio, &mut cues).unwrap();

        let listener = cues.listener.unwrap();
        assert!((listener.position - Vec3::new(0.0, 0.0, -200.0)).length() < 1e-3);
        assert!((listener.forward - Vec3::Z).length() < 1e-4);
        assert!((listener.up - Vec3::Y).length() < 1e-4);
        assert_eq!(listener.velocity, Vec3::ZERO);
    }
}
