use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sample rate of synthesised cues.
pub const CUE_SAMPLE_RATE: u32 = 44_100;

const CUE_DURATION_MS: u64 = 800;

/// Mono explosion: a short attack into a decaying low rumble with noise.
pub fn explosion_samples(seed: u64) -> Vec<f32> {
    let count = (u64::from(CUE_SAMPLE_RATE) * CUE_DURATION_MS / 1000) as usize;
    let rate = CUE_SAMPLE_RATE as f32;
    let mut rng = StdRng::seed_from_u64(seed);

    (0..count)
        .map(|i| {
            let t = i as f32 / rate;
            let envelope = if t < 0.02 {
                t / 0.02
            } else {
                (-(t - 0.02) * 4.0).exp()
            };
            let rumble = (TAU * 55.0 * t).sin() * 0.4
                + (TAU * 82.0 * t).sin() * 0.3
                + (TAU * 41.0 * t).sin() * 0.3;
            let crackle: f32 = rng.gen_range(-1.0..1.0) * 0.6;
            (rumble + crackle) * envelope * 0.6
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explosion_shape() {
        let samples = explosion_samples(1);
        assert_eq!(samples.len(), 35_280);
        assert_eq!(samples[0], 0.0);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));

        let peak = |range: std::ops::Range<usize>| {
            samples[range].iter().fold(0.0f32, |m, s| m.max(s.abs()))
        };
        // Loud early, nearly gone at the end
        assert!(peak(882..4410) > 3.0 * peak(30_000..35_280));
    }

    #[test]
    fn test_seeded_cue_is_repeatable() {
        assert_eq!(explosion_samples(7), explosion_samples(7));
    }
}
