//! Render surface abstraction
//!
//! A render surface is the drawable target the session presents into. The
//! session only needs to size it, attach it to the display and ask it to
//! draw a scene through a camera; everything else belongs to the
//! implementation.

mod headless;
mod wgpu_surface;

pub use headless::{HeadlessSurface, RenderRecord};
pub use wgpu_surface::WgpuSurface;

use crate::scene::{Camera, Scene};
use glam::Vec4;
use thiserror::Error;

/// Surface error type
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Failed to initialize surface: {0}")]
    InitializationFailed(String),
    #[error("Failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("Failed to acquire next image: {0}")]
    AcquireImageFailed(String),
    #[error("Surface lost")]
    SurfaceLost,
    #[error("Out of memory")]
    OutOfMemory,
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Options forwarded to [`RenderSurface::create`]
#[derive(Debug, Clone)]
pub struct SurfaceConfig<C> {
    /// Externally owned drawable to render into. A supplied canvas is
    /// normally already on screen, so the surface reports itself attached.
    pub canvas: Option<C>,
    /// Request multisampled output where the implementation supports it
    pub antialias: bool,
    /// Enable vsync
    pub vsync: bool,
    /// Clear color used when the scene has no color background
    pub clear_color: Vec4,
}

impl<C> Default for SurfaceConfig<C> {
    fn default() -> Self {
        Self {
            canvas: None,
            antialias: false,
            vsync: true,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl<C> SurfaceConfig<C> {
    pub fn with_canvas(mut self, canvas: C) -> Self {
        self.canvas = Some(canvas);
        self
    }
}

/// GPU-backed (or simulated) render target bound to a display area
pub trait RenderSurface: Sized {
    /// Handle to an externally owned drawable
    type Canvas;

    fn create(config: SurfaceConfig<Self::Canvas>) -> SurfaceResult<Self>;

    /// Physical pixels per logical pixel used when sizing the backing store
    fn set_pixel_ratio(&mut self, ratio: f64);

    fn pixel_ratio(&self) -> f64;

    /// Set the logical size
    fn set_size(&mut self, width: u32, height: u32);

    /// Logical size
    fn size(&self) -> (u32, u32);

    /// Put the surface on screen. Only called while `is_attached` is false.
    fn attach(&mut self) -> SurfaceResult<()>;

    /// Whether the drawable is already on screen, checked once when a
    /// session is assembled
    fn is_attached(&self) -> bool;

    /// Draw `scene` through `camera` and present
    fn render(&mut self, scene: &Scene, camera: &Camera) -> SurfaceResult<()>;
}

/// Physical size for a logical size at a pixel ratio, never below 1x1
pub fn physical_size(width: u32, height: u32, ratio: f64) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 * ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Scale a size down to fit `max` on both axes, keeping the aspect ratio
pub(crate) fn clamp_to_limit(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width > max || height > max {
        let scale = (max as f32 / width as f32).min(max as f32 / height as f32);
        (
            ((width as f32 * scale) as u32).max(1),
            ((height as f32 * scale) as u32).max(1),
        )
    } else {
        (width.max(1), height.max(1))
    }
}
