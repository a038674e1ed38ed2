//! Tunable constants for the visualizer.
//!
//! Every physical and visual constant lives in [`Config`] rather than in
//! code: gravity, launch impulse ranges, lifetimes and smoothing windows
//! are tuning knobs, not physical law.
//!
//! ```ignore
//! use fyreware::Config;
//!
//! let config = Config::default()
//!     .with_star_count(2048)
//!     .with_launch_sensitivity(0.1);
//! config.validate()?;
//! ```

use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use glam::Vec3;

use crate::error::ConfigError;

/// Spatial audio parameters for explosion cues.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundSettings {
    /// Distance below which cues play at full volume.
    pub min_distance: f32,
    /// Distance beyond which cues stop getting quieter.
    pub max_distance: f32,
    /// Doppler pitch shift scale (0 disables).
    pub doppler_scale: f32,
    /// World units per meter.
    pub distance_factor: f32,
    /// Inverse rolloff factor.
    pub rolloff_scale: f32,
    /// Master volume of explosion cues.
    pub cue_volume: f32,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            min_distance: 150.0,
            max_distance: 600.0,
            doppler_scale: 1.0,
            distance_factor: 1.0,
            rolloff_scale: 0.3,
            cue_volume: 0.6,
        }
    }
}

/// Size and scale of the FPS overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct FpsGraphSettings {
    /// Overlay size in pixels.
    pub width: f32,
    pub height: f32,
    /// FPS at the right edge of the graph.
    pub fps_max: f32,
    /// Number of samples kept (one row each).
    pub sample_count: usize,
}

impl Default for FpsGraphSettings {
    fn default() -> Self {
        Self {
            width: 240.0,
            height: 120.0,
            fps_max: 120.0,
            sample_count: 120,
        }
    }
}

/// All tunable constants.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared by the physics world and the star trajectories.
    pub gravity: Vec3,
    /// Horizontal impulse spread B: x and z are drawn from `-B..B`.
    pub launch_spread: f32,
    /// Vertical impulse range V0..V1.
    pub launch_speed: Range<f32>,
    /// Half-extent of the square launch pad around the origin.
    pub launch_area: f32,
    /// Shell flight time before it explodes, seconds.
    pub shell_lifetime: Range<f32>,
    pub shell_radius: f32,
    pub shell_mass: f32,
    /// Cluster lifetime, seconds.
    pub cluster_lifetime: Range<f32>,
    /// Stars per procedural burst.
    pub star_count: usize,
    /// Initial star speed band.
    pub star_speed: Range<f32>,
    /// Star sprite diameter in pixels.
    pub star_point_size: f32,
    /// k in `rand() < k / totalEnergy`.
    pub launch_sensitivity: f32,
    /// Upper bound on the per-tick launch probability.
    pub max_launch_probability: f32,
    /// Bins per spectrum channel.
    pub spectrum_length: usize,
    /// Smoothing window while a bin rises.
    pub spectrum_rise: f32,
    /// Smoothing window while a bin decays.
    pub spectrum_decay: f32,
    /// Smoothing window of the simulation timestep.
    pub clock_generations: f32,
    /// Smoothing window of the rendered camera transform.
    pub camera_generations: f32,
    pub camera_distance: f32,
    pub camera_altitude: f32,
    pub camera_azimuth: f32,
    /// Zero leaves the orbit unbounded.
    pub camera_max_distance: f32,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Physics substep length, seconds.
    pub physics_fixed_step: f32,
    /// Substeps per tick before simulated time is dropped.
    pub physics_max_substeps: u32,
    /// Rigid body capacity of the physics world.
    pub max_bodies: usize,
    /// Render timer period.
    pub tick_interval: Duration,
    /// Radius of the sky sphere around the camera.
    pub sky_radius: f32,
    /// Directory holding `posx.jpg` .. `negz.jpg`.
    pub sky_dir: Option<PathBuf>,
    pub show_fps_graph: bool,
    pub show_spectrum: bool,
    pub fps_graph: FpsGraphSettings,
    pub sound: SoundSettings,
    /// Seed for the simulation RNG; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.806, 0.0),
            launch_spread: 10.0,
            launch_speed: 60.0..80.0,
            launch_area: 20.0,
            shell_lifetime: 1.5..2.0,
            shell_radius: 1.0,
            shell_mass: 1.0,
            cluster_lifetime: 1.0..1.5,
            star_count: 1024,
            star_speed: 9.5..10.5,
            star_point_size: 6.0,
            launch_sensitivity: 0.05,
            max_launch_probability: 0.95,
            spectrum_length: 256,
            spectrum_rise: 1.5,
            spectrum_decay: 8.0,
            clock_generations: 60.0,
            camera_generations: 8.0,
            camera_distance: 200.0,
            camera_altitude: std::f32::consts::FRAC_PI_2,
            camera_azimuth: -std::f32::consts::FRAC_PI_2,
            camera_max_distance: 1000.0,
            fov_y: 90.0,
            near: 1.0,
            far: 1000.0,
            physics_fixed_step: 1.0 / 120.0,
            physics_max_substeps: 8,
            max_bodies: 4096,
            tick_interval: Duration::from_millis(16),
            sky_radius: 10.0,
            sky_dir: None,
            show_fps_graph: true,
            show_spectrum: true,
            fps_graph: FpsGraphSettings::default(),
            sound: SoundSettings::default(),
            seed: None,
        }
    }
}

impl Config {
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_launch_speed(mut self, speed: Range<f32>) -> Self {
        self.launch_speed = speed;
        self
    }

    pub fn with_launch_spread(mut self, spread: f32) -> Self {
        self.launch_spread = spread;
        self
    }

    pub fn with_launch_area(mut self, half_extent: f32) -> Self {
        self.launch_area = half_extent;
        self
    }

    pub fn with_shell_lifetime(mut self, lifetime: Range<f32>) -> Self {
        self.shell_lifetime = lifetime;
        self
    }

    pub fn with_cluster_lifetime(mut self, lifetime: Range<f32>) -> Self {
        self.cluster_lifetime = lifetime;
        self
    }

    pub fn with_star_count(mut self, count: usize) -> Self {
        self.star_count = count;
        self
    }

    pub fn with_star_speed(mut self, speed: Range<f32>) -> Self {
        self.star_speed = speed;
        self
    }

    pub fn with_launch_sensitivity(mut self, k: f32) -> Self {
        self.launch_sensitivity = k;
        self
    }

    pub fn with_spectrum_length(mut self, bins: usize) -> Self {
        self.spectrum_length = bins;
        self
    }

    pub fn with_physics_step(mut self, fixed_step: f32, max_substeps: u32) -> Self {
        self.physics_fixed_step = fixed_step;
        self.physics_max_substeps = max_substeps;
        self
    }

    pub fn with_max_bodies(mut self, max_bodies: usize) -> Self {
        self.max_bodies = max_bodies;
        self
    }

    pub fn with_sky_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sky_dir = Some(dir.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// True when every cluster dies before the shortest-lived shell would.
    pub fn cluster_outlived_by_shell(&self) -> bool {
        self.cluster_lifetime.end <= self.shell_lifetime.start
    }

    /// Check every value the simulation depends on.
    ///
    /// Clusters that outlive shells are allowed but logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gravity.is_finite() {
            return Err(ConfigError::new("gravity", "must be finite"));
        }
        check_range("launch_speed", &self.launch_speed, 0.0)?;
        check_range("shell_lifetime", &self.shell_lifetime, f32::MIN_POSITIVE)?;
        check_range("cluster_lifetime", &self.cluster_lifetime, f32::MIN_POSITIVE)?;
        if !self.cluster_outlived_by_shell() {
            log::warn!(
                "Cluster lifetime {:?} can outlast shell lifetime {:?}",
                self.cluster_lifetime,
                self.shell_lifetime
            );
        }
        check_range("star_speed", &self.star_speed, 0.0)?;
        check_positive("launch_spread", self.launch_spread, true)?;
        check_positive("launch_area", self.launch_area, true)?;
        check_positive("shell_radius", self.shell_radius, false)?;
        check_positive("shell_mass", self.shell_mass, false)?;
        check_positive("launch_sensitivity", self.launch_sensitivity, true)?;
        check_positive("physics_fixed_step", self.physics_fixed_step, false)?;
        check_positive("near", self.near, false)?;
        if !(self.far > self.near) {
            return Err(ConfigError::new("far", "must be beyond the near plane"));
        }
        if !(self.fov_y > 0.0 && self.fov_y < 180.0) {
            return Err(ConfigError::new("fov_y", "must be between 0 and 180 degrees"));
        }
        if !(0.0..=1.0).contains(&self.max_launch_probability) {
            return Err(ConfigError::new("max_launch_probability", "must be within 0..=1"));
        }
        for (field, n) in [
            ("spectrum_rise", self.spectrum_rise),
            ("spectrum_decay", self.spectrum_decay),
            ("clock_generations", self.clock_generations),
            ("camera_generations", self.camera_generations),
        ] {
            if !(n >= 1.0) {
                return Err(ConfigError::new(field, "smoothing windows must be at least 1"));
            }
        }
        if self.spectrum_length == 0 {
            return Err(ConfigError::new("spectrum_length", "must hold at least one bin"));
        }
        if self.physics_max_substeps == 0 {
            return Err(ConfigError::new("physics_max_substeps", "must be at least 1"));
        }
        if self.max_bodies == 0 {
            return Err(ConfigError::new("max_bodies", "must be at least 1"));
        }
        if self.fps_graph.sample_count == 0 {
            return Err(ConfigError::new("fps_graph.sample_count", "must be at least 1"));
        }
        Ok(())
    }
}

fn check_positive(field: &'static str, value: f32, allow_zero: bool) -> Result<(), ConfigError> {
    let ok = value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0));
    if ok {
        Ok(())
    } else if allow_zero {
        Err(ConfigError::new(field, format!("must be finite and non-negative, got {}", value)))
    } else {
        Err(ConfigError::new(field, format!("must be finite and positive, got {}", value)))
    }
}

fn check_range(field: &'static str, range: &Range<f32>, min: f32) -> Result<(), ConfigError> {
    if !(range.start.is_finite() && range.end.is_finite()) {
        return Err(ConfigError::new(field, "bounds must be finite"));
    }
    if range.start < min {
        return Err(ConfigError::new(field, format!("must start at or above {}", min)));
    }
    if range.end < range.start {
        return Err(ConfigError::new(field, "end must not precede start"));
    }
    Ok(())
}
