//! Scene Session - scene, camera, render surface and animation clock in one object
//!
//! A [`RenderSession`] owns everything a small 3D view needs to put frames
//! on screen and exposes two events to hook into:
//! - **render**: called once per frame with the scene, camera, surface and delta time
//! - **resize**: called after the camera and surface were resized
//!
//! # Features
//! - Self-rescheduling frame loop on top of any [`Host`] (winit window, browser page, manual)
//! - Cooperative start/stop and single-shot rendering
//! - Resize handling that keeps the camera aspect and surface size in sync with the viewport
//! - Render override hook for callers that own their own passes
//! - wgpu surface for windows and the web, headless surface for offscreen use and tests

pub mod clock;
pub mod host;
pub mod listeners;
pub mod scene;
pub mod session;
pub mod surface;

#[cfg(not(target_arch = "wasm32"))]
pub mod window;

// Web-specific modules
#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(target_arch = "wasm32")]
mod web_demo;

pub use clock::{Clock, ManualTime, TimeSource};
pub use host::{Host, HostEvent, ManualHost, ViewportSize};
pub use listeners::{Callback, EventKind, OneOrMany};
pub use scene::{Background, Camera, Projection, RenderObject, Scene, SceneProps, Transform};
pub use session::{FrameContext, RenderSession, ResizeEvent, ResizeRequest, SessionError, Unsubscribe};
pub use surface::{HeadlessSurface, RenderSurface, SurfaceConfig, SurfaceError, WgpuSurface};

#[cfg(not(target_arch = "wasm32"))]
pub use window::WinitHost;

/// Clock settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// Start the clock on the first delta reading
    pub auto_start: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { auto_start: true }
    }
}

/// Configuration for creating a render session
#[derive(Debug, Clone)]
pub struct SessionConfig<C = ()> {
    /// When false the session sizes itself to the host viewport and follows
    /// host load/resize events
    pub embedded: bool,
    /// Initial width; defaults to the host viewport width
    pub width: Option<u32>,
    /// Initial height; defaults to the host viewport height
    pub height: Option<u32>,
    /// Property overrides for the new scene
    pub scene: SceneProps,
    pub clock: ClockConfig,
    /// Forwarded to the render surface constructor
    pub renderer: SurfaceConfig<C>,
}

impl<C> Default for SessionConfig<C> {
    fn default() -> Self {
        Self {
            embedded: false,
            width: None,
            height: None,
            scene: SceneProps::default(),
            clock: ClockConfig::default(),
            renderer: SurfaceConfig::default(),
        }
    }
}

// Web initialization helper
#[cfg(target_arch = "wasm32")]
pub fn init_web_logging() {
    // Set up panic hook for better error messages in console
    console_error_panic_hook::set_once();
    // A second init (e.g. two sessions on one page) is fine to ignore
    let _ = console_log::init_with_level(log::Level::Info);
}
