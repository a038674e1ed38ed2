//! The audio layer as seen by the simulation.
//!
//! The scene talks to audio through two narrow traits:
//!
//! - [`SpectrumSource`] hands over left/right FFT magnitudes each tick and
//!   says whether anything is playing.
//! - [`AudioSink`] takes the listener attributes (camera position,
//!   velocity and basis) and positions one-shot cues in the world.
//!
//! [`Player`] implements both on top of `rodio` and `rustfft`.
//! [`NullAudio`] implements both as silence, for headless runs and for
//! machines without an output device.

mod analyzer;
mod cue;
mod player;
mod spatial;

pub use analyzer::{SpectrumAnalyzer, FFT_SIZE};
pub use cue::{explosion_samples, CUE_SAMPLE_RATE};
pub use player::Player;
pub use spatial::{mix_cue, CueMix, SPEED_OF_SOUND};

use glam::Vec3;

/// Per-tick spectrum provider.
pub trait SpectrumSource {
    /// Whether a song is currently audible.
    fn is_playing(&self) -> bool;

    /// Fill both channels with magnitudes. Returns `false` when no data
    /// is available, leaving the slices untouched.
    fn read_spectrum(&mut self, left: &mut [f32], right: &mut [f32]) -> bool;
}

/// Where the listener is and how it moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listener {
    pub position: Vec3,
    /// Units per second.
    pub velocity: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
        }
    }
}

/// Spatial output for the simulation.
pub trait AudioSink {
    fn set_listener(&mut self, listener: &Listener);

    /// Fire-and-forget cue at a world position.
    fn play_cue(&mut self, position: Vec3);
}

/// Silent audio: never playing, no spectrum, cues dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl SpectrumSource for NullAudio {
    fn is_playing(&self) -> bool {
        false
    }

    fn read_spectrum(&mut self, _left: &mut [f32], _right: &mut [f32]) -> bool {
        false
    }
}

impl AudioSink for NullAudio {
    fn set_listener(&mut self, _listener: &Listener) {}

    fn play_cue(&mut self, _position: Vec3) {}
}
