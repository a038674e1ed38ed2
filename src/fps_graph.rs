//! Frame-rate graph overlay.
//!
//! Each row of the graph is one frame, newest at the bottom; the x axis is
//! frames per second from 0 to `fps_max`. A gradient band spans the
//! (smoothed) minimum and maximum of the window around the smoothed FPS
//! line, with vertical markers every 15 fps.

use std::collections::VecDeque;

use glam::Vec2;

use crate::config::FpsGraphSettings;
use crate::overlay::{OverlayBatch, Rgba};
use crate::smoothing::exp_mov_avg;

const BACKGROUND: Rgba = [0.0, 0.0, 0.0, 0.4];
const MEAN: Rgba = [0x1b as f32 / 255.0, 0xec as f32 / 255.0, 0xf7 as f32 / 255.0, 0.8];
const HEAVY_BOUNDS: Rgba = [0x52 as f32 / 255.0, 0x18 as f32 / 255.0, 0xfa as f32 / 255.0, 1.0];
const LIGHT_BOUNDS: Rgba = [0.0, 0.0, 0.0, 0.0];
const POINT: Rgba = [1.0, 0x29 as f32 / 255.0, 0xa2 as f32 / 255.0, 1.0];

const MARKER_STEP: f32 = 15.0;
const MARKER_MAX: f32 = 120.0;

#[derive(Debug, Clone)]
pub struct FpsGraph {
    settings: FpsGraphSettings,
    /// Newest first.
    samples: VecDeque<f32>,
    smoothed_fps: f32,
    min_sample: f32,
    max_sample: f32,
}

impl FpsGraph {
    pub fn new(settings: FpsGraphSettings) -> Self {
        Self {
            samples: VecDeque::with_capacity(settings.sample_count),
            settings,
            smoothed_fps: 0.0,
            min_sample: 0.0,
            max_sample: 0.0,
        }
    }

    /// Record one frame. Non-positive deltas are ignored.
    pub fn add_sample(&mut self, real_dt: f32, smoothed_dt: f32) {
        if !(real_dt > 0.0 && smoothed_dt > 0.0) {
            return;
        }
        self.smoothed_fps = 1.0 / smoothed_dt;
        self.samples.push_front(1.0 / real_dt);
        self.samples.truncate(self.settings.sample_count);

        let (min, max) = self
            .samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        let generations = self.settings.sample_count as f32 * 0.66;
        exp_mov_avg(&mut self.min_sample, min, generations);
        exp_mov_avg(&mut self.max_sample, max, generations);
    }

    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }

    pub fn smoothed_fps(&self) -> f32 {
        self.smoothed_fps
    }

    /// Smoothed window minimum.
    pub fn min_fps(&self) -> f32 {
        self.min_sample
    }

    /// Smoothed window maximum.
    pub fn max_fps(&self) -> f32 {
        self.max_sample
    }

    /// Append the graph to `batch`, anchored at the top-right corner.
    pub fn draw(&self, batch: &mut OverlayBatch, viewport: Vec2) {
        let size = Vec2::new(self.settings.width, self.settings.height);
        let rows = self.settings.sample_count.max(1) as f32;
        let fps_max = self.settings.fps_max.max(1.0);
        let origin = viewport - size;
        let scale = Vec2::new(size.x / fps_max, size.y / rows);
        // Graph units (fps, row) to pixels
        let at = |fps: f32, row: f32| origin + Vec2::new(fps.clamp(0.0, fps_max), row) * scale;

        batch.rect(at(0.0, 0.0), at(fps_max, rows), BACKGROUND);

        batch.gradient(
            at(self.min_sample, 0.0),
            at(self.smoothed_fps, rows),
            HEAVY_BOUNDS,
            LIGHT_BOUNDS,
        );
        batch.gradient(
            at(self.smoothed_fps, 0.0),
            at(self.max_sample, rows),
            LIGHT_BOUNDS,
            HEAVY_BOUNDS,
        );

        let mut marker = MARKER_STEP;
        while marker <= MARKER_MAX {
            let alpha = 1.0 - (60.0 - marker).abs() / 60.0;
            batch.line(at(marker, 0.0), at(marker, rows), [1.0, 1.0, 1.0, alpha]);
            let light = marker - MARKER_STEP / 2.0;
            batch.line(at(light, 0.0), at(light, rows), [1.0, 1.0, 1.0, alpha * 0.1]);
            marker += MARKER_STEP;
        }

        for (row, fps) in self.samples.iter().enumerate() {
            let p = at(*fps, row as f32);
            batch.rect(p - Vec2::splat(1.0), p + Vec2::splat(1.0), POINT);
        }

        let line = at(self.smoothed_fps, 0.0);
        batch.rect(
            Vec2::new(line.x - 1.0, origin.y),
            Vec2::new(line.x + 1.0, origin.y + size.y),
            MEAN,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(sample_count: usize) -> FpsGraph {
        FpsGraph::new(FpsGraphSettings {
            sample_count,
            ..Default::default()
        })
    }

    #[test]
    fn test_window_is_bounded() {
        let mut graph = graph(10);
        for _ in 0..50 {
            graph.add_sample(1.0 / 60.0, 1.0 / 60.0);
        }
        assert_eq!(graph.samples().count(), 10);
    }

    #[test]
    fn test_newest_first() {
        let mut graph = graph(10);
        graph.add_sample(1.0 / 30.0, 1.0 / 30.0);
        graph.add_sample(1.0 / 60.0, 1.0 / 45.0);
        let samples: Vec<f32> = graph.samples().collect();
        assert!((samples[0] - 60.0).abs() < 1e-3);
        assert!((samples[1] - 30.0).abs() < 1e-3);
        assert!((graph.smoothed_fps() - 45.0).abs() < 1e-3);
    }

    #[test]
    fn test_bounds_converge() {
        let mut graph = graph(20);
        for i in 0..2000 {
            let fps = if i % 2 == 0 { 50.0 } else { 70.0 };
            graph.add_sample(1.0 / fps, 1.0 / 60.0);
        }
        assert!((graph.min_fps() - 50.0).abs() < 0.01);
        assert!((graph.max_fps() - 70.0).abs() < 0.01);
    }

    #[test]
    fn test_ignores_zero_delta() {
        let mut graph = graph(10);
        graph.add_sample(0.0, 1.0 / 60.0);
        graph.add_sample(1.0 / 60.0, 0.0);
        assert_eq!(graph.samples().count(), 0);
    }

    #[test]
    fn test_draw_stays_in_top_right() {
        let mut graph = graph(120);
        for _ in 0..120 {
            graph.add_sample(1.0 / 500.0, 1.0 / 500.0);
        }
        let viewport = Vec2::new(1280.0, 720.0);
        let mut batch = OverlayBatch::new();
        graph.draw(&mut batch, viewport);

        // Background, two bounds, 120 points, mean line
        assert_eq!(batch.triangles.len(), 6 * (1 + 2 + 120 + 1));
        // Eight markers, each with a light companion
        assert_eq!(batch.lines.len(), 2 * 16);

        let settings = FpsGraphSettings::default();
        for v in batch.triangles.iter().chain(&batch.lines) {
            let [x, y] = v.position;
            assert!(x >= 1280.0 - settings.width - 1.0 && x <= 1280.0 + 1.0, "{}", x);
            assert!(y >= 720.0 - settings.height - 1.0 && y <= 720.0 + 1.0, "{}", y);
        }
    }
}
