//! Sky cube map images.
//!
//! A sky directory holds six JPEG faces named after the axis they face:
//! `posx.jpg`, `negx.jpg`, `posy.jpg`, `negy.jpg`, `posz.jpg` and
//! `negz.jpg`. Faces are decoded in parallel on the rayon pool.
//!
//! Without a directory, [`CubeFaces::night_sky`] generates a dark gradient
//! with a sprinkling of stars.

use std::path::{Path, PathBuf};

use glam::Vec3;
use image::imageops::FilterType;
use image::RgbaImage;
use rayon::prelude::*;

use crate::error::TextureError;

/// Face file stems in cube layer order (+X, -X, +Y, -Y, +Z, -Z).
pub const FACE_NAMES: [&str; 6] = ["posx", "negx", "posy", "negy", "posz", "negz"];

/// Faces larger than this are scaled down.
pub const MAX_FACE_SIZE: u32 = 2048;

/// Six square RGBA faces of equal size, in cube layer order.
#[derive(Debug, Clone)]
pub struct CubeFaces {
    size: u32,
    faces: [Vec<u8>; 6],
}

impl CubeFaces {
    /// Load `<dir>/<face>.jpg` for every face.
    pub fn load(dir: &Path) -> Result<Self, TextureError> {
        let paths: Vec<PathBuf> = FACE_NAMES
            .iter()
            .map(|name| dir.join(format!("{}.jpg", name)))
            .collect();

        let decoded: Vec<Result<RgbaImage, TextureError>> =
            paths.par_iter().map(|path| decode(path)).collect();

        let mut images = Vec::with_capacity(6);
        for (path, image) in paths.iter().zip(decoded) {
            images.push((path, image?));
        }

        let expected = images[0].1.width();
        for (path, image) in &images {
            let (width, height) = image.dimensions();
            if width != height || width != expected {
                return Err(TextureError::FaceSize {
                    path: path.to_path_buf(),
                    width,
                    height,
                    expected,
                });
            }
        }

        let size = expected.min(MAX_FACE_SIZE);
        let mut faces: [Vec<u8>; 6] = Default::default();
        for (face, (_, image)) in faces.iter_mut().zip(images) {
            let image = if image.width() > size {
                image::imageops::resize(&image, size, size, FilterType::Triangle)
            } else {
                image
            };
            *face = image.into_raw();
        }

        log::info!("Loaded {}x{} sky from {}", size, size, dir.display());
        Ok(Self { size, faces })
    }

    /// Procedural night sky: black zenith fading into a deep blue horizon,
    /// with sparse stars above the horizon.
    pub fn night_sky(size: u32, seed: u32) -> Self {
        let size = size.max(1);
        let mut faces: [Vec<u8>; 6] = Default::default();
        for (layer, face) in faces.iter_mut().enumerate() {
            face.reserve_exact((size * size * 4) as usize);
            for y in 0..size {
                for x in 0..size {
                    let dir = face_direction(layer, x, y, size);
                    face.extend_from_slice(&night_pixel(dir, x, y, layer as u32, seed));
                }
            }
        }
        Self { size, faces }
    }

    /// Edge length of every face.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// RGBA bytes of one face.
    pub fn face(&self, layer: usize) -> &[u8] {
        &self.faces[layer]
    }

    pub fn faces(&self) -> &[Vec<u8>; 6] {
        &self.faces
    }
}

fn decode(path: &Path) -> Result<RgbaImage, TextureError> {
    Ok(image::open(path)?.into_rgba8())
}

/// World direction through the centre of texel `(x, y)` of a cube layer.
pub fn face_direction(layer: usize, x: u32, y: u32, size: u32) -> Vec3 {
    let u = 2.0 * (x as f32 + 0.5) / size as f32 - 1.0;
    let v = 2.0 * (y as f32 + 0.5) / size as f32 - 1.0;
    let dir = match layer {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    };
    dir.normalize()
}

fn night_pixel(dir: Vec3, x: u32, y: u32, layer: u32, seed: u32) -> [u8; 4] {
    let horizon = Vec3::new(10.0, 14.0, 40.0);
    let zenith = Vec3::new(0.0, 0.0, 4.0);
    let ground = Vec3::new(4.0, 4.0, 8.0);

    let color = if dir.y >= 0.0 {
        let t = dir.y.sqrt();
        let sky = horizon.lerp(zenith, t);
        if hash_noise(x, y ^ (layer << 16), seed) > 252 {
            let twinkle = hash_noise(y, x, seed.wrapping_add(1)) as f32;
            sky.lerp(Vec3::splat(160.0 + twinkle * 0.3), t.min(1.0))
        } else {
            sky
        }
    } else {
        horizon.lerp(ground, (-dir.y).sqrt())
    };
    [color.x as u8, color.y as u8, color.z as u8, 255]
}

fn hash_noise(x: u32, y: u32, seed: u32) -> u8 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(y.wrapping_mul(668265263));
    h = (h ^ (h >> 13)).wrapping_mul(1274126177);
    h ^= h >> 16;
    (h & 0xFF) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_directions_point_along_axes() {
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (layer, axis) in axes.iter().enumerate() {
            // Odd size puts a texel exactly on the face centre
            let dir = face_direction(layer, 1, 1, 3);
            assert!((dir - *axis).length() < 1e-6, "layer {}: {}", layer, dir);
        }
    }

    #[test]
    fn test_night_sky_layout() {
        let sky = CubeFaces::night_sky(16, 3);
        assert_eq!(sky.size(), 16);
        for face in sky.faces() {
            assert_eq!(face.len(), 16 * 16 * 4);
            assert!(face.chunks_exact(4).all(|px| px[3] == 255));
        }
        // Zenith darker than the horizon
        let mean_blue = |face: &[u8]| {
            face.chunks_exact(4).map(|px| px[2] as f32).sum::<f32>() / (16.0 * 16.0)
        };
        assert!(mean_blue(sky.face(2)) < mean_blue(sky.face(4)));
    }

    #[test]
    fn test_missing_directory_is_load_error() {
        let dir = std::env::temp_dir().join("fyreware-no-such-sky");
        assert!(matches!(CubeFaces::load(&dir), Err(TextureError::ImageLoad(_))));
    }

    #[test]
    fn test_faces_keep_layer_order() {
        let dir = std::env::temp_dir().join(format!("fyreware-sky-order-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for (i, name) in FACE_NAMES.iter().enumerate() {
            let red = 30 + 40 * i as u8;
            let image = image::RgbImage::from_pixel(8, 8, image::Rgb([red, 0, 0]));
            image.save(dir.join(format!("{}.jpg", name))).unwrap();
        }

        let result = CubeFaces::load(&dir);
        std::fs::remove_dir_all(&dir).ok();
        let sky = result.unwrap();
        assert_eq!(sky.size(), 8);
        for layer in 0..6 {
            let red = 30 + 40 * layer as i32;
            let got = sky.face(layer)[0] as i32;
            assert!((got - red).abs() <= 8, "layer {}: {} vs {}", layer, got, red);
        }
    }

    #[test]
    fn test_mismatched_faces_rejected() {
        let dir = std::env::temp_dir().join(format!("fyreware-sky-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for (i, name) in FACE_NAMES.iter().enumerate() {
            let size = if i == 3 { 4 } else { 8 };
            let image = RgbaImage::from_pixel(size, size, image::Rgba([10, 20, 30, 255]));
            image::DynamicImage::ImageRgba8(image)
                .into_rgb8()
                .save(dir.join(format!("{}.jpg", name)))
                .unwrap();
        }

        let result = CubeFaces::load(&dir);
        std::fs::remove_dir_all(&dir).ok();
        match result {
            Err(TextureError::FaceSize { width, expected, .. }) => {
                assert_eq!(width, 4);
                assert_eq!(expected, 8);
            }
            other => panic!("expected a face size error, got {:?}", other.map(|s| s.size())),
        }
    }
}
