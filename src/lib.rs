//! # FyreWare - audio-reactive fireworks
//!
//! Plays a song, watches its spectrum and launches fireworks in time with
//! it. Quiet passages launch more often than loud ones; every shell flies
//! on a rigid body, explodes into a cluster of stars and fires a spatial
//! explosion cue heard from the orbiting camera.
//!
//! ## Quick Start
//!
//! ```ignore
//! use fyreware::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     let playlist = Playlist::from_arg("music/".as_ref())?;
//!     fyreware::run(Config::default(), playlist)
//! }
//! ```
//!
//! ## Headless
//!
//! A [`Scene`] runs without a window. Hand it any [`SpectrumSource`] and
//! [`AudioSink`] each tick:
//!
//! ```ignore
//! let mut scene = Scene::new(Config::default().with_seed(1))?;
//! for _ in 0..600 {
//!     scene.tick(1.0 / 60.0, &mut source, &mut NullAudio)?;
//! }
//! println!("{} clusters in the air", scene.cluster_count());
//! ```
//!
//! ## Extension Points
//!
//! | Seam | Trait | Built-in |
//! |------|-------|----------|
//! | When to launch | [`LaunchPolicy`] | [`EnergyTrigger`], [`ScriptedAnalyzer`] |
//! | Star pattern | [`StarEmitter`] | [`Burst::Random`], [`Burst::Ring`], [`ScriptedEmitter`] |
//! | Spectrum input | [`SpectrumSource`] | [`Player`], [`NullAudio`] |
//! | Sound output | [`AudioSink`] | [`Player`], [`NullAudio`] |
//!
//! ## Controls
//!
//! | Input | Action |
//! |-------|--------|
//! | Drag / wheel | Orbit the camera |
//! | Pinch | Zoom |
//! | Space | Pause / resume |
//! | N, Right | Next song |
//! | P, Left | Restart or previous song |
//! | F | Toggle the FPS graph |
//! | Escape | Quit |

pub mod arena;
pub mod audio;
pub mod camera;
pub mod cluster;
pub mod config;
pub mod emitter;
pub mod error;
pub mod fps_graph;
pub mod gpu;
pub mod input;
pub mod overlay;
pub mod physics;
pub mod playlist;
pub mod random;
pub mod scene;
pub mod shell;
pub mod smoothing;
pub mod spectrum;
pub mod textures;
pub mod time;
pub mod visuals;
mod window;

pub use audio::{AudioSink, Listener, NullAudio, Player, SpectrumSource};
pub use camera::{Camera, OrbitalCamera};
pub use cluster::Cluster;
pub use config::{Config, FpsGraphSettings, SoundSettings};
pub use emitter::{Burst, ScriptedEmitter, StarEmitter, StarSink};
pub use error::{AppError, AudioError, ConfigError, GpuError, PhysicsError, TextureError};
pub use glam::{Mat4, Quat, Vec2, Vec3};
pub use playlist::Playlist;
pub use scene::{Entity, Scene, TickReport};
pub use shell::{Shell, ShellLaunch};
pub use spectrum::{EnergyTrigger, LaunchPolicy, Launcher, ScriptedAnalyzer, Spectrum};
pub use visuals::StarColor;
pub use window::App;

use winit::event_loop::EventLoop;

/// Open the window and run until it is closed.
///
/// Playback starts with the first song of `playlist`; an empty playlist
/// shows the sky and camera without launching anything.
pub fn run(config: Config, playlist: Playlist) -> Result<(), AppError> {
    config.validate()?;
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, playlist)?;
    event_loop.run_app(&mut app)?;
    match app.take_error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use fyreware::prelude::*;
/// ```
pub mod prelude {
    pub use crate::audio::{AudioSink, NullAudio, Player, SpectrumSource};
    pub use crate::config::Config;
    pub use crate::emitter::{Burst, ScriptedEmitter, StarEmitter, StarSink};
    pub use crate::error::AppError;
    pub use crate::playlist::Playlist;
    pub use crate::scene::{Scene, TickReport};
    pub use crate::shell::ShellLaunch;
    pub use crate::spectrum::{EnergyTrigger, LaunchPolicy, Launcher, ScriptedAnalyzer};
    pub use crate::visuals::StarColor;
    pub use crate::{Vec2, Vec3};
}
