//! 2D overlay geometry in pixel space.
//!
//! Overlays are rebuilt on the CPU every frame into an [`OverlayBatch`]:
//! one triangle list and one line list of [`OverlayVertex`]. Coordinates
//! are pixels with the origin in the bottom-left corner of the viewport.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::spectrum::Spectrum;

pub type Rgba = [f32; 4];

pub const SPECTRUM_LEFT: Rgba = [0.0, 1.0, 1.0, 0.8];
pub const SPECTRUM_RIGHT: Rgba = [1.0, 0.0, 1.0, 0.8];

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 2],
    pub color: Rgba,
}

impl OverlayVertex {
    fn new(position: Vec2, color: Rgba) -> Self {
        Self {
            position: position.to_array(),
            color,
        }
    }
}

/// One frame of overlay geometry.
#[derive(Debug, Clone, Default)]
pub struct OverlayBatch {
    pub triangles: Vec<OverlayVertex>,
    pub lines: Vec<OverlayVertex>,
}

impl OverlayBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.triangles.clear();
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty() && self.lines.is_empty()
    }

    pub fn rect(&mut self, min: Vec2, max: Vec2, color: Rgba) {
        self.gradient(min, max, color, color);
    }

    /// Rectangle shaded from `left` at `min.x` to `right` at `max.x`.
    pub fn gradient(&mut self, min: Vec2, max: Vec2, left: Rgba, right: Rgba) {
        let a = OverlayVertex::new(min, left);
        let b = OverlayVertex::new(Vec2::new(max.x, min.y), right);
        let c = OverlayVertex::new(max, right);
        let d = OverlayVertex::new(Vec2::new(min.x, max.y), left);
        self.triangles.extend_from_slice(&[a, b, c, a, c, d]);
    }

    pub fn line(&mut self, from: Vec2, to: Vec2, color: Rgba) {
        self.lines
            .extend_from_slice(&[OverlayVertex::new(from, color), OverlayVertex::new(to, color)]);
    }

    /// Connected segments through `points`.
    pub fn polyline(&mut self, points: impl IntoIterator<Item = Vec2>, color: Rgba) {
        let mut previous = None;
        for point in points {
            if let Some(from) = previous {
                self.line(from, point, color);
            }
            previous = Some(point);
        }
    }
}

/// Left channel drawn left to right, right channel mirrored from the
/// right edge. A magnitude of 1 spans the viewport height.
pub fn spectrum_trace(batch: &mut OverlayBatch, spectrum: &Spectrum, viewport: Vec2) {
    let len = spectrum.len();
    if len == 0 {
        return;
    }
    let scale = Vec2::new(viewport.x / (2 * len) as f32, viewport.y);

    batch.polyline(
        spectrum
            .left()
            .iter()
            .enumerate()
            .map(|(i, &m)| Vec2::new(i as f32, m) * scale),
        SPECTRUM_LEFT,
    );
    batch.polyline(
        spectrum
            .right()
            .iter()
            .enumerate()
            .map(|(i, &m)| Vec2::new((2 * len - i - 1) as f32, m) * scale),
        SPECTRUM_RIGHT,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_is_two_triangles() {
        let mut batch = OverlayBatch::new();
        batch.rect(Vec2::ZERO, Vec2::new(10.0, 5.0), [1.0; 4]);
        assert_eq!(batch.triangles.len(), 6);
        assert!(batch.lines.is_empty());
    }

    #[test]
    fn test_polyline_segments() {
        let mut batch = OverlayBatch::new();
        batch.polyline([Vec2::ZERO, Vec2::X, Vec2::ONE], [1.0; 4]);
        assert_eq!(batch.lines.len(), 4);
        assert_eq!(batch.lines[1].position, [1.0, 0.0]);
        assert_eq!(batch.lines[2].position, [1.0, 0.0]);

        batch.clear();
        batch.polyline([Vec2::ONE], [1.0; 4]);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_spectrum_trace_mirrors_right_channel() {
        let mut spectrum = Spectrum::new(4, 1.0, 1.0);
        spectrum.push(&[1.0, 0.0, 0.0, 0.0], &[0.5, 0.0, 0.0, 0.0]);
        let mut batch = OverlayBatch::new();
        spectrum_trace(&mut batch, &spectrum, Vec2::new(800.0, 600.0));

        // 3 segments per channel
        assert_eq!(batch.lines.len(), 12);
        let left_start = batch.lines[0];
        assert_eq!(left_start.position, [0.0, 600.0]);
        assert_eq!(left_start.color, SPECTRUM_LEFT);

        // Right bin 0 sits at x = 2 * len - 1, in the last column
        let right_start = batch.lines[6];
        assert_eq!(right_start.position, [700.0, 300.0]);
        assert_eq!(right_start.color, SPECTRUM_RIGHT);
    }
}
