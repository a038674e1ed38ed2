//! 3D mixing of a mono cue for a stereo listener.

use std::f32::consts::FRAC_PI_4;

use glam::Vec3;

use super::Listener;
use crate::config::SoundSettings;

/// Meters per second.
pub const SPEED_OF_SOUND: f32 = 340.0;

const MIN_PITCH: f32 = 0.5;
const MAX_PITCH: f32 = 2.0;

/// Gains and pitch for one cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueMix {
    /// Distance attenuation, `0..=1`.
    pub gain: f32,
    /// Equal-power channel gains (before `gain`).
    pub left: f32,
    pub right: f32,
    /// Playback speed ratio from Doppler shift.
    pub pitch: f32,
}

/// Mix a static cue at `source` for `listener`.
pub fn mix_cue(listener: &Listener, source: Vec3, settings: &SoundSettings) -> CueMix {
    let offset = source - listener.position;
    let distance = offset.length() / settings.distance_factor.max(f32::EPSILON);

    let min = settings.min_distance.max(f32::EPSILON);
    let clamped = distance.clamp(min, settings.max_distance.max(min));
    let gain = min / (min + settings.rolloff_scale.max(0.0) * (clamped - min));

    let (left, right, pitch) = match offset.try_normalize() {
        Some(toward_source) => {
            let right_axis = listener.forward.cross(listener.up).normalize_or_zero();
            let pan = toward_source.dot(right_axis).clamp(-1.0, 1.0);
            let angle = (pan + 1.0) * FRAC_PI_4;

            // Listener closing in on the source raises the pitch
            let closing = listener.velocity.dot(toward_source) / settings.distance_factor.max(f32::EPSILON);
            let pitch = 1.0 + settings.doppler_scale * closing / SPEED_OF_SOUND;
            (angle.cos(), angle.sin(), pitch.clamp(MIN_PITCH, MAX_PITCH))
        }
        None => (FRAC_PI_4.cos(), FRAC_PI_4.sin(), 1.0),
    };

    CueMix {
        gain,
        left,
        right,
        pitch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener() -> Listener {
        Listener::default()
    }

    #[test]
    fn test_full_volume_inside_min_distance() {
        let settings = SoundSettings::default();
        let mix = mix_cue(&listener(), Vec3::new(0.0, 0.0, -10.0), &settings);
        assert_eq!(mix.gain, 1.0);
    }

    #[test]
    fn test_inverse_rolloff() {
        let settings = SoundSettings::default();
        // d = 300, min = 150, rolloff 0.3 -> 150 / (150 + 45)
        let mix = mix_cue(&listener(), Vec3::new(0.0, 0.0, -300.0), &settings);
        assert!((mix.gain - 150.0 / 195.0).abs() < 1e-5);

        let far = mix_cue(&listener(), Vec3::new(0.0, 0.0, -5000.0), &settings);
        let at_max = mix_cue(&listener(), Vec3::new(0.0, 0.0, -600.0), &settings);
        assert!((far.gain - at_max.gain).abs() < 1e-6);
    }

    #[test]
    fn test_equal_power_pan() {
        let settings = SoundSettings::default();
        let right = mix_cue(&listener(), Vec3::new(50.0, 0.0, 0.0), &settings);
        assert!(right.right > 0.99 && right.left < 0.01);

        let left = mix_cue(&listener(), Vec3::new(-50.0, 0.0, 0.0), &settings);
        assert!(left.left > 0.99 && left.right < 0.01);

        let ahead = mix_cue(&listener(), Vec3::new(0.0, 0.0, -50.0), &settings);
        assert!((ahead.left - ahead.right).abs() < 1e-5);
        assert!((ahead.left.powi(2) + ahead.right.powi(2) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_doppler() {
        let settings = SoundSettings::default();
        let mut moving = listener();
        moving.velocity = Vec3::new(0.0, 0.0, -34.0);
        let toward = mix_cue(&moving, Vec3::new(0.0, 0.0, -100.0), &settings);
        assert!((toward.pitch - 1.1).abs() < 1e-5);

        let away = mix_cue(&moving, Vec3::new(0.0, 0.0, 100.0), &settings);
        assert!((away.pitch - 0.9).abs() < 1e-5);

        moving.velocity = Vec3::new(0.0, 0.0, -1e6);
        assert_eq!(mix_cue(&moving, Vec3::new(0.0, 0.0, -100.0), &settings).pitch, MAX_PITCH);
    }

    #[test]
    fn test_cue_on_listener() {
        let mix = mix_cue(&listener(), Vec3::ZERO, &SoundSettings::default());
        assert_eq!(mix.gain, 1.0);
        assert_eq!(mix.pitch, 1.0);
    }
}
