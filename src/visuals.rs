//! Colors and blending for fireworks.
//!
//! Each cluster is tinted with one [`StarColor`] picked at random when it
//! is created. How a pass composites onto the frame is a [`BlendMode`];
//! stars use [`BlendMode::Additive`] so overlapping bursts glow.

use glam::Vec3;
use rand::Rng;

/// Named firework colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StarColor {
    Red,
    Orange,
    Gold,
    Yellow,
    Green,
    Blue,
    Purple,
    Silver,
}

impl StarColor {
    /// Every palette entry, in a fixed order.
    pub const ALL: [StarColor; 8] = [
        StarColor::Red,
        StarColor::Orange,
        StarColor::Gold,
        StarColor::Yellow,
        StarColor::Green,
        StarColor::Blue,
        StarColor::Purple,
        StarColor::Silver,
    ];

    /// Linear RGB tint.
    pub fn rgb(&self) -> Vec3 {
        match self {
            StarColor::Red => Vec3::new(1.0, 0.0, 0.0),
            StarColor::Orange => Vec3::new(1.0, 0.6, 0.0),
            StarColor::Gold => Vec3::new(1.0, 0.84, 0.0),
            StarColor::Yellow => Vec3::new(1.0, 1.0, 0.0),
            StarColor::Green => Vec3::new(0.0, 1.0, 0.0),
            StarColor::Blue => Vec3::new(0.0, 0.0, 1.0),
            StarColor::Purple => Vec3::new(0.5, 0.0, 0.5),
            StarColor::Silver => Vec3::new(0.75, 0.75, 0.75),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StarColor::Red => "red",
            StarColor::Orange => "orange",
            StarColor::Gold => "gold",
            StarColor::Yellow => "yellow",
            StarColor::Green => "green",
            StarColor::Blue => "blue",
            StarColor::Purple => "purple",
            StarColor::Silver => "silver",
        }
    }

    /// Uniform pick from the palette.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// How a pass combines its fragments with the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// No blending, depth written. Shells.
    #[default]
    Opaque,

    /// Standard alpha blending. Overlays.
    Alpha,

    /// Colors add up and never occlude each other. Stars.
    Additive,
}

impl BlendMode {
    pub fn blend_state(&self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Opaque => None,
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
        }
    }

    /// Additive passes test depth but must not write it.
    pub fn writes_depth(&self) -> bool {
        matches!(self, BlendMode::Opaque)
    }
}
