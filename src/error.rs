//! Error types for FyreWare.
//!
//! This module provides error types for GPU initialization, sky texture
//! loading, the physics world, the audio layer and configuration.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter(wgpu::RequestAdapterError),
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// The surface reports no usable texture format.
    UnsupportedSurface,
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter(e) => write!(f, "No compatible GPU adapter found ({}). Ensure your system has a GPU with Vulkan/Metal/DX12 support.", e),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::UnsupportedSurface => write!(f, "The window surface supports no texture formats"),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::NoAdapter(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            GpuError::UnsupportedSurface => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestAdapterError> for GpuError {
    fn from(e: wgpu::RequestAdapterError) -> Self {
        GpuError::NoAdapter(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can occur while loading the sky cube map.
#[derive(Debug)]
pub enum TextureError {
    /// Failed to decode an image file.
    ImageLoad(image::ImageError),
    /// A cube face is not square or differs in size from the others.
    FaceSize {
        /// The offending face.
        path: PathBuf,
        /// Its dimensions.
        width: u32,
        height: u32,
        /// Edge length of the first face.
        expected: u32,
    },
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::ImageLoad(e) => write!(f, "Failed to load image: {}", e),
            TextureError::FaceSize { path, width, height, expected } => write!(
                f,
                "Cube face '{}' is {}x{}, expected {}x{}",
                path.display(),
                width,
                height,
                expected,
                expected
            ),
        }
    }
}

impl std::error::Error for TextureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TextureError::ImageLoad(e) => Some(e),
            TextureError::FaceSize { .. } => None,
        }
    }
}

impl From<image::ImageError> for TextureError {
    fn from(e: image::ImageError) -> Self {
        TextureError::ImageLoad(e)
    }
}

/// Errors raised by the physics world.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// World parameters are unusable (non-finite gravity, zero step, ...).
    InvalidWorld(String),
    /// A body description has a non-positive mass or radius.
    InvalidBody(String),
    /// The world already holds its maximum number of bodies.
    CapacityExhausted(usize),
    /// The handle does not refer to a live body.
    UnknownBody,
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicsError::InvalidWorld(msg) => write!(f, "Invalid physics world: {}", msg),
            PhysicsError::InvalidBody(msg) => write!(f, "Invalid rigid body: {}", msg),
            PhysicsError::CapacityExhausted(max) => write!(f, "Physics world is full ({} bodies)", max),
            PhysicsError::UnknownBody => write!(f, "Rigid body handle is stale or unknown"),
        }
    }
}

impl std::error::Error for PhysicsError {}

/// Errors raised by the audio layer.
#[derive(Debug)]
pub enum AudioError {
    /// No output device or the stream could not be opened.
    Stream(rodio::StreamError),
    /// The output sink could not be created.
    Play(rodio::PlayError),
    /// The song could not be decoded.
    Decode(rodio::decoder::DecoderError),
    /// The song could not be read.
    Io(std::io::Error),
    /// There is nothing to play.
    EmptyPlaylist,
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::Stream(e) => write!(f, "Failed to open audio output: {}", e),
            AudioError::Play(e) => write!(f, "Failed to create audio sink: {}", e),
            AudioError::Decode(e) => write!(f, "Failed to decode song: {}", e),
            AudioError::Io(e) => write!(f, "Failed to read song: {}", e),
            AudioError::EmptyPlaylist => write!(f, "Playlist is empty"),
        }
    }
}

impl std::error::Error for AudioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AudioError::Stream(e) => Some(e),
            AudioError::Play(e) => Some(e),
            AudioError::Decode(e) => Some(e),
            AudioError::Io(e) => Some(e),
            AudioError::EmptyPlaylist => None,
        }
    }
}

impl From<rodio::StreamError> for AudioError {
    fn from(e: rodio::StreamError) -> Self {
        AudioError::Stream(e)
    }
}

impl From<rodio::PlayError> for AudioError {
    fn from(e: rodio::PlayError) -> Self {
        AudioError::Play(e)
    }
}

impl From<rodio::decoder::DecoderError> for AudioError {
    fn from(e: rodio::decoder::DecoderError) -> Self {
        AudioError::Decode(e)
    }
}

impl From<std::io::Error> for AudioError {
    fn from(e: std::io::Error) -> Self {
        AudioError::Io(e)
    }
}

/// A configuration value that cannot be used.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Name of the offending field.
    pub field: &'static str,
    /// Why it was rejected.
    pub reason: String,
}

impl ConfigError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid config `{}`: {}", self.field, self.reason)
    }
}

impl std::error::Error for ConfigError {}

/// Errors that can occur when running the visualizer.
#[derive(Debug)]
pub enum AppError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
    /// The physics world could not be built.
    Physics(PhysicsError),
    /// The configuration was rejected.
    Config(ConfigError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            AppError::Window(e) => write!(f, "Failed to create window: {}", e),
            AppError::Gpu(e) => write!(f, "GPU error: {}", e),
            AppError::Physics(e) => write!(f, "Physics error: {}", e),
            AppError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::EventLoop(e) => Some(e),
            AppError::Window(e) => Some(e),
            AppError::Gpu(e) => Some(e),
            AppError::Physics(e) => Some(e),
            AppError::Config(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for AppError {
    fn from(e: winit::error::EventLoopError) -> Self {
        AppError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for AppError {
    fn from(e: winit::error::OsError) -> Self {
        AppError::Window(e)
    }
}

impl From<GpuError> for AppError {
    fn from(e: GpuError) -> Self {
        AppError::Gpu(e)
    }
}

impl From<PhysicsError> for AppError {
    fn from(e: PhysicsError) -> Self {
        AppError::Physics(e)
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}
