//! wgpu-backed window surface

use super::{clamp_to_limit, physical_size, RenderSurface, SurfaceConfig, SurfaceError, SurfaceResult};
use crate::scene::{Camera, Scene};
use glam::Vec4;
use std::sync::Arc;
use winit::window::Window as WinitWindow;

const MSAA_SAMPLES: u32 = 4;

/// Render surface presenting into a winit window through wgpu
///
/// The default draw clears the frame to the scene's background color (or
/// the configured clear color) and presents it. Render overrides can reach
/// the device, queue and format to encode their own passes.
pub struct WgpuSurface {
    window: Arc<WinitWindow>,
    #[allow(dead_code)]
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    #[allow(dead_code)]
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    msaa_view: Option<wgpu::TextureView>,
    antialias: bool,
    clear_color: Vec4,
    logical_size: (u32, u32),
    pixel_ratio: f64,
    attached: bool,
}

impl WgpuSurface {
    /// Async initialization - used directly on web, wrapped by `create` on native
    pub async fn new_async(config: SurfaceConfig<Arc<WinitWindow>>) -> SurfaceResult<Self> {
        let window = config.canvas.ok_or_else(|| {
            SurfaceError::InitializationFailed("a window is required to create a wgpu surface".into())
        })?;

        #[cfg(target_arch = "wasm32")]
        let (instance, surface, adapter, device, queue) = Self::init_web(window.clone()).await?;

        #[cfg(not(target_arch = "wasm32"))]
        let (instance, surface, adapter, device, queue) = Self::init_native(window.clone()).await?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| {
                SurfaceError::SurfaceCreationFailed("surface reports no supported formats".into())
            })?;

        let present_mode = if config.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let max_size = device.limits().max_texture_dimension_2d;
        let (width, height) = clamp_to_limit(size.width, size.height, max_size);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        let attached = Self::window_on_screen(&window);
        let mut this = Self {
            window,
            instance,
            surface,
            adapter,
            device,
            queue,
            surface_config,
            msaa_view: None,
            antialias: config.antialias,
            clear_color: config.clear_color,
            logical_size: (size.width.max(1), size.height.max(1)),
            pixel_ratio: 1.0,
            attached,
        };
        this.rebuild_msaa_target();
        Ok(this)
    }

    /// Native initialization
    #[cfg(not(target_arch = "wasm32"))]
    async fn init_native(
        window: Arc<WinitWindow>,
    ) -> SurfaceResult<(wgpu::Instance, wgpu::Surface<'static>, wgpu::Adapter, wgpu::Device, wgpu::Queue)>
    {
        // On Windows, try Vulkan first to avoid D3D12 debug layer validation errors
        let backends = if std::env::var("WGPU_BACKEND").is_ok() {
            wgpu::Backends::all()
        } else {
            #[cfg(target_os = "windows")]
            {
                wgpu::Backends::VULKAN
            }
            #[cfg(not(target_os = "windows"))]
            {
                wgpu::Backends::all()
            }
        };

        let mut found = Self::request_adapter(window.clone(), backends).await?;
        if found.is_none() && backends != wgpu::Backends::all() {
            log::warn!("Preferred backend not available, falling back to all backends");
            found = Self::request_adapter(window, wgpu::Backends::all()).await?;
        }
        let (instance, surface, adapter) = found
            .ok_or_else(|| SurfaceError::InitializationFailed("No suitable adapter found".into()))?;

        let (device, queue) = Self::request_device(&adapter, wgpu::Limits::default()).await?;
        Ok((instance, surface, adapter, device, queue))
    }

    /// Web initialization: WebGL2 first, WebGPU as a fallback
    #[cfg(target_arch = "wasm32")]
    async fn init_web(
        window: Arc<WinitWindow>,
    ) -> SurfaceResult<(wgpu::Instance, wgpu::Surface<'static>, wgpu::Adapter, wgpu::Device, wgpu::Queue)>
    {
        let attempts = [
            (wgpu::Backends::GL, wgpu::Limits::downlevel_webgl2_defaults(), "WebGL2"),
            (wgpu::Backends::BROWSER_WEBGPU, wgpu::Limits::default(), "WebGPU"),
        ];

        for (backends, limits, name) in attempts {
            log::info!("Trying {} backend...", name);
            let Some((instance, surface, adapter)) = Self::request_adapter(window.clone(), backends).await? else {
                continue;
            };
            match Self::request_device(&adapter, limits).await {
                Ok((device, queue)) => {
                    log::info!("{} backend initialized", name);
                    return Ok((instance, surface, adapter, device, queue));
                }
                Err(e) => log::warn!("{} device creation failed: {}", name, e),
            }
        }

        Err(SurfaceError::InitializationFailed(
            "Neither WebGL2 nor WebGPU backends could be initialized".into(),
        ))
    }

    async fn request_adapter(
        window: Arc<WinitWindow>,
        backends: wgpu::Backends,
    ) -> SurfaceResult<Option<(wgpu::Instance, wgpu::Surface<'static>, wgpu::Adapter)>> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| SurfaceError::SurfaceCreationFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await;

        Ok(adapter.map(|adapter| {
            let info = adapter.get_info();
            log::info!("Selected GPU: {} ({:?} backend)", info.name, info.backend);
            (instance, surface, adapter)
        }))
    }

    async fn request_device(
        adapter: &wgpu::Adapter,
        limits: wgpu::Limits,
    ) -> SurfaceResult<(wgpu::Device, wgpu::Queue)> {
        adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Scene Session Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                },
                None,
            )
            .await
            .map_err(|e| SurfaceError::DeviceCreationFailed(e.to_string()))
    }

    /// Native windows are on screen once built; a web canvas only once it is in the document
    #[cfg(not(target_arch = "wasm32"))]
    fn window_on_screen(_window: &WinitWindow) -> bool {
        true
    }

    #[cfg(target_arch = "wasm32")]
    fn window_on_screen(window: &WinitWindow) -> bool {
        use winit::platform::web::WindowExtWebSys;
        window
            .canvas()
            .map_or(false, |canvas| canvas.is_connected())
    }

    pub fn window(&self) -> &WinitWindow {
        &self.window
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Size of the configured swapchain (may be clamped by device limits)
    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    fn reconfigure(&mut self) {
        let (width, height) = physical_size(self.logical_size.0, self.logical_size.1, self.pixel_ratio);
        let max_size = self.device.limits().max_texture_dimension_2d;
        let (width, height) = clamp_to_limit(width, height, max_size);

        if width == self.surface_config.width && height == self.surface_config.height {
            return;
        }

        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.rebuild_msaa_target();
    }

    fn rebuild_msaa_target(&mut self) {
        if !self.antialias {
            self.msaa_view = None;
            return;
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("MSAA Color Target"),
            size: wgpu::Extent3d {
                width: self.surface_config.width,
                height: self.surface_config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: MSAA_SAMPLES,
            dimension: wgpu::TextureDimension::D2,
            format: self.surface_config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        self.msaa_view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
    }

    fn acquire(&mut self) -> SurfaceResult<Option<wgpu::SurfaceTexture>> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(Some(texture)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(SurfaceError::OutOfMemory),
            Err(e) => Err(SurfaceError::AcquireImageFailed(e.to_string())),
        }
    }
}

impl RenderSurface for WgpuSurface {
    type Canvas = Arc<WinitWindow>;

    #[cfg(not(target_arch = "wasm32"))]
    fn create(config: SurfaceConfig<Self::Canvas>) -> SurfaceResult<Self> {
        pollster::block_on(Self::new_async(config))
    }

    #[cfg(target_arch = "wasm32")]
    fn create(_config: SurfaceConfig<Self::Canvas>) -> SurfaceResult<Self> {
        // On web, use new_async and RenderSession::from_surface instead
        Err(SurfaceError::InitializationFailed(
            "Use WgpuSurface::new_async() on web platform".into(),
        ))
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
        self.reconfigure();
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.logical_size = (width, height);
        // the browser sizes the canvas element from the window's inner size
        #[cfg(target_arch = "wasm32")]
        let _ = self
            .window
            .request_inner_size(winit::dpi::LogicalSize::new(width, height));
        self.reconfigure();
    }

    fn size(&self) -> (u32, u32) {
        self.logical_size
    }

    fn attach(&mut self) -> SurfaceResult<()> {
        #[cfg(target_arch = "wasm32")]
        crate::web::append_to_body(&self.window)?;

        self.window.set_visible(true);
        self.attached = true;
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn render(&mut self, scene: &Scene, _camera: &Camera) -> SurfaceResult<()> {
        let Some(frame) = self.acquire()? else {
            return Ok(());
        };

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let clear = scene.background_color().unwrap_or(self.clear_color);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let (target, resolve_target) = match &self.msaa_view {
                Some(msaa) => (msaa, Some(&view)),
                None => (&view, None),
            };

            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.x as f64,
                            g: clear.y as f64,
                            b: clear.z as f64,
                            a: clear.w as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
