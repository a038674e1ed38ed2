//! Headless scene tests.
//!
//! These drive a full [`Scene`] with scripted spectrum sources and sinks,
//! without a window or an output device.

use std::f32::consts::FRAC_PI_2;

use fyreware::prelude::*;
use fyreware::{Cluster, Listener, Spectrum, StarColor};
use rand::RngCore;

const DT: f32 = 1.0 / 60.0;

// ============================================================================
// Helpers
// ============================================================================

/// Always playing, with the same magnitude in every bin.
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

/// Records cues and the last listener.
#[derive(Default)]
struct Recorder {
    cues: Vec<Vec3>,
    listener: Option<Listener>,
}

impl AudioSink for Recorder {
    fn set_listener(&mut self, listener: &Listener) {
        self.listener = Some(*listener);
    }

    fn play_cue(&mut self, position: Vec3) {
        self.cues.push(position);
    }
}

/// Source and sink in one value, like the real player.
struct Duplex {
    source: Constant,
    sink: Recorder,
}

impl SpectrumSource for Duplex {
    fn is_playing(&self) -> bool {
        self.source.is_playing()
    }

    fn read_spectrum(&mut self, left: &mut [f32], right: &mut [f32]) -> bool {
        self.source.read_spectrum(left, right)
    }
}

impl AudioSink for Duplex {
    fn set_listener(&mut self, listener: &Listener) {
        self.sink.set_listener(listener);
    }

    fn play_cue(&mut self, position: Vec3) {
        self.sink.play_cue(position);
    }
}

fn config() -> Config {
    Config::default()
        .with_seed(42)
        .with_shell_lifetime(0.5..0.5)
        .with_cluster_lifetime(5.0..5.0)
        .with_star_count(32)
}

/// Launch `n` shells on the first tick, nothing after.
fn launch_once(n: u32) -> impl LaunchPolicy {
    let mut fired = false;
    ScriptedAnalyzer::new(move |_spectrum: &Spectrum, launcher: &mut Launcher| {
        if !fired {
            for _ in 0..n {
                launcher.launch();
            }
            fired = true;
        }
    })
}

fn assert_near(a: Vec3, b: Vec3, tolerance: f32) {
    assert!((a - b).length() < tolerance, "{} vs {}", a, b);
}

// ============================================================================
// Shell -> cluster lifecycle
// ============================================================================

#[test]
fn test_every_shell_explodes_exactly_once() {
    let mut scene = Scene::new(config()).unwrap().with_launch_policy(launch_once(3));
    let mut source = Constant(0.5);
    let mut sink = Recorder::default();

    let mut launched = 0;
    let mut exploded = 0;
    for _ in 0..90 {
        let report = scene.tick(DT, &mut source, &mut sink).unwrap();
        launched += report.launched;
        exploded += report.exploded;
    }

    assert_eq!(launched, 3);
    assert_eq!(exploded, 3);
    assert_eq!(sink.cues.len(), 3);
    assert_eq!(scene.shell_count(), 0);
    assert_eq!(scene.cluster_count(), 3);
}

#[test]
fn test_cues_play_where_clusters_start() {
    let mut scene = Scene::new(config()).unwrap().with_launch_policy(launch_once(2));
    let mut sink = Recorder::default();

    for _ in 0..60 {
        scene.tick(DT, &mut Constant(0.5), &mut sink).unwrap();
    }

    let origins: Vec<Vec3> = scene.clusters().map(|(_, c)| c.origin()).collect();
    assert_eq!(origins.len(), 2);
    for cue in &sink.cues {
        assert!(origins.iter().any(|o| (*o - *cue).length() < 1e-4));
        // Shells climb before they burst
        assert!(cue.y > 10.0);
    }
}

#[test]
fn test_single_value_drives_source_and_sink() {
    let mut scene = Scene::new(config()).unwrap().with_launch_policy(launch_once(1));
    let mut audio = Duplex {
        source: Constant(0.5),
        sink: Recorder::default(),
    };

    for _ in 0..60 {
        scene.tick_with(DT, &mut audio).unwrap();
    }

    assert_eq!(audio.sink.cues.len(), 1);
    assert!(audio.sink.listener.is_some());
    assert_eq!(scene.cluster_count(), 1);
}

#[test]
fn test_empty_emitter_still_explodes() {
    let mut scene = Scene::new(config())
        .unwrap()
        .with_launch_policy(launch_once(1))
        .with_emitter(ScriptedEmitter::new(|_rng: &mut dyn RngCore, _sink: &mut dyn StarSink| {}));
    let mut sink = Recorder::default();

    for _ in 0..60 {
        scene.tick(DT, &mut Constant(0.5), &mut sink).unwrap();
    }

    assert_eq!(sink.cues.len(), 1);
    let (_, cluster) = scene.clusters().next().unwrap();
    assert_eq!(cluster.star_count(), 0);
    assert_eq!(cluster.positions().count(), 0);
}

#[test]
fn test_clusters_are_removed_after_their_lifetime() {
    let config = config().with_cluster_lifetime(0.5..0.5);
    let mut scene = Scene::new(config).unwrap().with_launch_policy(launch_once(4));

    let mut expired = 0;
    for _ in 0..120 {
        expired += scene.tick(DT, &mut Constant(0.5), &mut NullAudio).unwrap().expired;
    }

    assert_eq!(expired, 4);
    assert_eq!(scene.entity_count(), 0);
}

// ============================================================================
// Launch policy
// ============================================================================

#[test]
fn test_silence_launches_almost_every_tick() {
    let mut scene = Scene::new(Config::default().with_seed(3)).unwrap();
    let mut launched = 0;
    for _ in 0..100 {
        launched += scene.tick(DT, &mut Constant(0.0), &mut NullAudio).unwrap().launched;
    }
    // p = 0.95 per tick
    assert!(launched >= 85, "launched {}", launched);
}

#[test]
fn test_loud_music_rarely_launches() {
    let mut scene = Scene::new(Config::default().with_seed(3)).unwrap();
    let mut launched = 0;
    for _ in 0..100 {
        launched += scene.tick(DT, &mut Constant(1.0), &mut NullAudio).unwrap().launched;
    }
    assert!(launched <= 1, "launched {}", launched);
}

#[test]
fn test_nothing_launches_without_music() {
    let mut scene = Scene::new(Config::default().with_seed(3)).unwrap();
    for _ in 0..100 {
        let report = scene.tick(DT, &mut NullAudio, &mut NullAudio).unwrap();
        assert_eq!(report.launched, 0);
    }
    assert_eq!(scene.entity_count(), 0);
}

#[test]
fn test_energy_trigger_probability() {
    let trigger = EnergyTrigger::new(0.05, 0.95);
    assert_eq!(trigger.probability(0.0), 0.95);
    assert_eq!(trigger.probability(f32::NAN), 0.95);
    assert!((trigger.probability(1.0) - 0.05).abs() < 1e-6);
    assert!((trigger.probability(100.0) - 0.0005).abs() < 1e-7);
}

// ============================================================================
// Trajectories
// ============================================================================

#[test]
fn test_star_free_fall() {
    let gravity = Vec3::new(0.0, -9.806, 0.0);
    let cluster = Cluster::new(Vec3::new(0.0, 100.0, 0.0), vec![Vec3::ZERO], gravity, 2.0, StarColor::Gold);

    let p = cluster.star_position_at(0, 2.0).unwrap();
    assert_near(p, Vec3::new(0.0, 100.0 - 0.5 * 9.806 * 4.0, 0.0), 1e-4);
}

#[test]
fn test_star_straight_line_without_gravity() {
    let v0 = Vec3::new(3.0, -1.0, 2.0);
    let cluster = Cluster::new(Vec3::ONE, vec![v0], Vec3::ZERO, 2.0, StarColor::Gold);

    for t in [0.0, 0.5, 1.0, 1.5] {
        assert_near(cluster.star_position_at(0, t).unwrap(), Vec3::ONE + v0 * t, 1e-5);
    }
}

#[test]
fn test_shell_follows_ballistic_arc() {
    let config = config().with_shell_lifetime(10.0..10.0);
    let mut scene = Scene::new(config).unwrap();
    scene
        .launch(ShellLaunch {
            origin: Vec3::ZERO,
            impulse: Vec3::new(0.0, 70.0, 0.0),
            lifetime: 10.0,
            radius: 1.0,
            mass: 1.0,
        })
        .unwrap();

    for _ in 0..15 {
        scene.tick(DT, &mut NullAudio, &mut NullAudio).unwrap();
    }

    let t = scene.clock().simulated() as f32;
    let expected = 70.0 * t - 0.5 * 9.806 * t * t;
    let shell = scene.shells().next().unwrap();
    assert!((shell.position().y - expected).abs() < 0.1, "{} vs {}", shell.position().y, expected);
    assert!(shell.position().x.abs() < 1e-4);
}

// ============================================================================
// Camera and listener
// ============================================================================

#[test]
fn test_default_camera_looks_down_the_z_axis() {
    let mut scene = Scene::new(Config::default()).unwrap();
    let mut sink = Recorder::default();
    scene.tick(DT, &mut NullAudio, &mut sink).unwrap();

    assert_near(scene.eye(), Vec3::new(0.0, 0.0, -200.0), 1e-3);

    let listener = sink.listener.unwrap();
    assert_near(listener.position, Vec3::new(0.0, 0.0, -200.0), 1e-3);
    assert_near(listener.forward, Vec3::Z, 1e-4);
    assert_near(listener.velocity, Vec3::ZERO, 1e-4);
}

#[test]
fn test_orbit_moves_the_listener() {
    let mut scene = Scene::new(Config::default()).unwrap();
    scene.camera_mut().set_azimuth(0.0);
    scene.camera_mut().set_altitude(FRAC_PI_2);

    let mut sink = Recorder::default();
    for _ in 0..120 {
        scene.tick(DT, &mut NullAudio, &mut sink).unwrap();
    }

    let listener = sink.listener.unwrap();
    assert_near(listener.position, Vec3::new(200.0, 0.0, 0.0), 1e-2);
    assert_near(listener.forward, Vec3::NEG_X, 1e-3);
}
