//! Smoothed audio spectrum and the launch decision it drives.
//!
//! [`Spectrum`] keeps the raw left/right magnitudes from the audio layer
//! next to their smoothed counterparts. Bins follow a rising signal quickly
//! and let it decay slowly, so the trace stays legible and the launch
//! trigger sees the envelope of the music rather than every transient.
//!
//! A [`LaunchPolicy`] reads the smoothed spectrum once per tick and asks a
//! [`Launcher`] for shells. Two policies ship with the crate:
//!
//! | Policy | Behaviour |
//! |--------|-----------|
//! | [`EnergyTrigger`] | `rand() < k / totalEnergy`, capped |
//! | [`ScriptedAnalyzer`] | a closure decides, calling `launch()` freely |

use rand::{Rng, RngCore};

use crate::audio::SpectrumSource;
use crate::config::Config;
use crate::smoothing::exp_mov_avg;

/// Left and right channel magnitudes, raw and smoothed.
#[derive(Debug, Clone)]
pub struct Spectrum {
    raw: [Vec<f32>; 2],
    smoothed: [Vec<f32>; 2],
    rise: f32,
    decay: f32,
}

impl Spectrum {
    /// `rise` and `decay` are smoothing windows in generations.
    pub fn new(bins: usize, rise: f32, decay: f32) -> Self {
        Self {
            raw: [vec![0.0; bins], vec![0.0; bins]],
            smoothed: [vec![0.0; bins], vec![0.0; bins]],
            rise,
            decay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.spectrum_length, config.spectrum_rise, config.spectrum_decay)
    }

    /// Bins per channel.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw[0].len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn left(&self) -> &[f32] {
        &self.smoothed[0]
    }

    pub fn right(&self) -> &[f32] {
        &self.smoothed[1]
    }

    pub fn raw_left(&self) -> &[f32] {
        &self.raw[0]
    }

    pub fn raw_right(&self) -> &[f32] {
        &self.raw[1]
    }

    /// Pull fresh magnitudes from `source` and smooth them.
    ///
    /// While the source is not playing the smoothed values are left as
    /// they are. Returns whether new data was consumed.
    pub fn update(&mut self, source: &mut dyn SpectrumSource) -> bool {
        if !source.is_playing() {
            return false;
        }
        let [left, right] = &mut self.raw;
        if !source.read_spectrum(left, right) {
            return false;
        }
        self.smooth();
        true
    }

    /// Smooth externally supplied magnitudes. Extra values are ignored and
    /// missing ones read as zero.
    pub fn push(&mut self, left: &[f32], right: &[f32]) {
        for (raw, input) in self.raw.iter_mut().zip([left, right]) {
            for (i, bin) in raw.iter_mut().enumerate() {
                *bin = input.get(i).copied().unwrap_or(0.0);
            }
        }
        self.smooth();
    }

    fn smooth(&mut self) {
        for (raw, smoothed) in self.raw.iter().zip(self.smoothed.iter_mut()) {
            for (new, avg) in raw.iter().zip(smoothed.iter_mut()) {
                let new = if new.is_finite() { new.max(0.0) } else { 0.0 };
                let generations = if new > *avg { self.rise } else { self.decay };
                exp_mov_avg(avg, new, generations);
            }
        }
    }

    /// Sum of every smoothed bin in both channels.
    pub fn total_energy(&self) -> f32 {
        self.smoothed.iter().flatten().sum()
    }

    /// Zero every bin, raw and smoothed.
    pub fn clear(&mut self) {
        for bins in self.raw.iter_mut().chain(self.smoothed.iter_mut()) {
            bins.fill(0.0);
        }
    }
}

/// Collects launch requests for one tick.
#[derive(Debug, Default)]
pub struct Launcher {
    requested: u32,
}

impl Launcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for one more shell this tick.
    pub fn launch(&mut self) {
        self.requested += 1;
    }

    pub fn requested(&self) -> u32 {
        self.requested
    }
}

/// Decides how many shells to launch from this tick's spectrum.
pub trait LaunchPolicy {
    fn evaluate(&mut self, spectrum: &Spectrum, rng: &mut dyn RngCore, launcher: &mut Launcher);
}

/// Probabilistic trigger: quieter passages launch more often.
#[derive(Debug, Clone)]
pub struct EnergyTrigger {
    /// k in `k / totalEnergy`.
    pub sensitivity: f32,
    /// Cap on the per-tick probability.
    pub max_probability: f32,
}

impl EnergyTrigger {
    pub fn new(sensitivity: f32, max_probability: f32) -> Self {
        Self {
            sensitivity,
            max_probability,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.launch_sensitivity, config.max_launch_probability)
    }

    /// Per-tick launch probability for a total spectrum energy.
    ///
    /// Zero, negative and NaN energies are treated as silence, which
    /// yields the capped maximum.
    pub fn probability(&self, energy: f32) -> f32 {
        let energy = if energy.is_nan() { 0.0 } else { energy.max(f32::MIN_POSITIVE) };
        (self.sensitivity / energy).min(self.max_probability).max(0.0)
    }
}

impl LaunchPolicy for EnergyTrigger {
    fn evaluate(&mut self, spectrum: &Spectrum, rng: &mut dyn RngCore, launcher: &mut Launcher) {
        let p = self.probability(spectrum.total_energy());
        if rng.gen::<f32>() < p {
            launcher.launch();
        }
    }
}

/// Launch decision delegated to a closure.
///
/// ```ignore
/// let bass_kick = ScriptedAnalyzer::new(|spectrum: &Spectrum, launcher: &mut Launcher| {
///     if spectrum.left()[..8].iter().sum::<f32>() > 0.5 {
///         launcher.launch();
///     }
/// });
/// ```
pub struct ScriptedAnalyzer<F> {
    program: F,
}

impl<F> ScriptedAnalyzer<F>
where
    F: FnMut(&Spectrum, &mut Launcher),
{
    pub fn new(program: F) -> Self {
        Self { program }
    }
}

impl<F> LaunchPolicy for ScriptedAnalyzer<F>
where
    F: FnMut(&Spectrum, &mut Launcher),
{
    fn evaluate(&mut self, spectrum: &Spectrum, _rng: &mut dyn RngCore, launcher: &mut Launcher) {
        (self.program)(spectrum, launcher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixed {
        playing: bool,
        value: f32,
        reads: usize,
    }

    impl SpectrumSource for Fixed {
        fn is_playing(&self) -> bool {
            self.playing
        }

        fn read_spectrum(&mut self, left: &mut [f32], right: &mut [f32]) -> bool {
            self.reads += 1;
            left.fill(self.value);
            right.fill(self.value);
            true
        }
    }

    #[test]
    fn test_rises_fast_decays_slow() {
        let mut spectrum = Spectrum::new(4, 1.5, 8.0);
        spectrum.push(&[1.0; 4], &[1.0; 4]);
        let after_rise = spectrum.left()[0];
        // alpha(1.5) = 0.8
        assert!((after_rise - 0.8).abs() < 1e-6);

        spectrum.push(&[0.0; 4], &[0.0; 4]);
        let after_decay = spectrum.left()[0];
        // alpha(8) = 2/9
        assert!((after_decay - 0.8 * (1.0 - 2.0 / 9.0)).abs() < 1e-6);
    }

    #[test]
    fn test_converges_to_constant_input() {
        let mut spectrum = Spectrum::new(8, 1.5, 8.0);
        for _ in 0..200 {
            spectrum.push(&[0.25; 8], &[0.5; 8]);
        }
        assert!((spectrum.left()[3] - 0.25).abs() < 1e-4);
        assert!((spectrum.right()[3] - 0.5).abs() < 1e-4);
        assert!((spectrum.total_energy() - 6.0).abs() < 1e-3);
    }

    #[test]
    fn test_short_and_long_input() {
        let mut spectrum = Spectrum::new(4, 1.0, 1.0);
        spectrum.push(&[1.0, 1.0], &[1.0; 10]);
        assert_eq!(spectrum.raw_left(), &[1.0, 1.0, 0.0, 0.0]);
        assert_eq!(spectrum.raw_right(), &[1.0; 4]);
    }

    #[test]
    fn test_paused_source_keeps_last_value() {
        let mut spectrum = Spectrum::new(4, 1.0, 1.0);
        let mut source = Fixed {
            playing: true,
            value: 0.5,
            reads: 0,
        };
        assert!(spectrum.update(&mut source));
        assert_eq!(spectrum.left()[0], 0.5);

        source.playing = false;
        source.value = 0.0;
        assert!(!spectrum.update(&mut source));
        assert_eq!(spectrum.left()[0], 0.5);
        assert_eq!(source.reads, 1);
    }

    #[test]
    fn test_non_finite_bins_read_as_silence() {
        let mut spectrum = Spectrum::new(2, 1.0, 1.0);
        spectrum.push(&[f32::NAN, f32::INFINITY], &[-1.0, 0.0]);
        assert_eq!(spectrum.total_energy(), 0.0);
    }

    #[test]
    fn test_probability_bounds() {
        let trigger = EnergyTrigger::new(0.05, 0.95);
        assert_eq!(trigger.probability(0.0), 0.95);
        assert_eq!(trigger.probability(f32::NAN), 0.95);
        assert_eq!(trigger.probability(-3.0), 0.95);
        assert!((trigger.probability(1.0) - 0.05).abs() < 1e-7);
        assert!(trigger.probability(1e9) < 1e-9);
    }

    #[test]
    fn test_silence_launches_almost_every_tick() {
        let spectrum = Spectrum::new(256, 1.5, 8.0);
        let mut trigger = EnergyTrigger::new(0.05, 0.95);
        let mut rng = StdRng::seed_from_u64(42);
        let mut launcher = Launcher::new();
        for _ in 0..10_000 {
            trigger.evaluate(&spectrum, &mut rng, &mut launcher);
        }
        assert!(launcher.requested() > 9_000, "{}", launcher.requested());
    }

    #[test]
    fn test_loud_music_rarely_launches() {
        let mut spectrum = Spectrum::new(256, 1.5, 8.0);
        for _ in 0..50 {
            spectrum.push(&[100.0; 256], &[100.0; 256]);
        }
        let mut trigger = EnergyTrigger::new(0.05, 0.95);
        let mut rng = StdRng::seed_from_u64(42);
        let mut launcher = Launcher::new();
        for _ in 0..10_000 {
            trigger.evaluate(&spectrum, &mut rng, &mut launcher);
        }
        assert!(launcher.requested() < 10, "{}", launcher.requested());
    }

    #[test]
    fn test_scripted_analyzer_can_launch_many() {
        let spectrum = Spectrum::new(4, 1.0, 1.0);
        let mut analyzer = ScriptedAnalyzer::new(|_: &Spectrum, launcher: &mut Launcher| {
            launcher.launch();
            launcher.launch();
            launcher.launch();
        });
        let mut rng = StdRng::seed_from_u64(0);
        let mut launcher = Launcher::new();
        analyzer.evaluate(&spectrum, &mut rng, &mut launcher);
        assert_eq!(launcher.requested(), 3);
    }
}
