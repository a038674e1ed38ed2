use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Samples per transform. Yields `FFT_SIZE / 2` magnitude bins.
pub const FFT_SIZE: usize = 512;

/// Rectangular-window magnitude spectrum of one channel.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(FFT_SIZE),
            buffer: vec![Complex::new(0.0, 0.0); FFT_SIZE],
        }
    }

    /// Transform the last `FFT_SIZE` samples (zero padded in front when
    /// fewer are given) into `out`.
    ///
    /// Magnitudes are `2|X| / N`, so a full-scale sine centred on a bin
    /// reads 1.0. Bins past `FFT_SIZE / 2` are zeroed.
    pub fn magnitudes(&mut self, samples: &[f32], out: &mut [f32]) {
        let tail = &samples[samples.len().saturating_sub(FFT_SIZE)..];
        let pad = FFT_SIZE - tail.len();
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = if i < pad { 0.0 } else { tail[i - pad] };
            *slot = Complex::new(s, 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 2.0 / FFT_SIZE as f32;
        for (i, bin) in out.iter_mut().enumerate() {
            *bin = if i < FFT_SIZE / 2 {
                self.buffer[i].norm() * scale
            } else {
                0.0
            };
        }
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
