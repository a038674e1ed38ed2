//! Sampling helpers shared by launches and emitters.

use std::ops::Range;

use rand::Rng;

/// Uniform sample from `lo..hi`; an empty or inverted range yields `lo`.
#[inline]
pub fn randf<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

/// [`randf`] over a `Range`.
#[inline]
pub fn sample<R: Rng + ?Sized>(rng: &mut R, range: &Range<f32>) -> f32 {
    randf(rng, range.start, range.end)
}
