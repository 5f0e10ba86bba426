//! Web demo entry point
//!
//! Opens a canvas in the page, builds a wgpu surface on it and drives a
//! spinning scene from the browser's animation frames.

use crate::{
    init_web_logging,
    web::{spawn_local, BrowserHost},
    Background, Camera, Host, RenderObject, RenderSession, SceneProps, SessionConfig, SurfaceConfig,
    WgpuSurface,
};
use glam::{Vec3, Vec4};
use std::rc::Rc;
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    platform::web::EventLoopExtWebSys,
    window::WindowBuilder,
};

/// Main entry point for web - called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn main() {
    init_web_logging();
    log::info!("Starting scene session web demo");
    spawn_local(async_main());
}

async fn async_main() {
    let Some(host) = BrowserHost::new() else {
        log::error!("No browser window available");
        return;
    };
    let host = Rc::new(host);
    let viewport = host.viewport_size();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            return;
        }
    };

    let window = match WindowBuilder::new()
        .with_title("Scene Session")
        .with_inner_size(LogicalSize::new(viewport.width.max(1), viewport.height.max(1)))
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(e) => {
            log::error!("Failed to create window: {}", e);
            return;
        }
    };

    let surface = match WgpuSurface::new_async(SurfaceConfig::default().with_canvas(Arc::clone(&window))).await {
        Ok(surface) => surface,
        Err(e) => {
            log::error!("Failed to create surface: {}", e);
            return;
        }
    };

    let mut camera = Camera::perspective(50.0, 1.0, 1.0, 5000.0);
    camera.set_position(Vec3::new(0.0, 5.0, 20.0));
    camera.look_at(Vec3::ZERO);

    let config = SessionConfig {
        scene: SceneProps {
            background: Some(Some(Background::Color(Vec4::new(0.05, 0.05, 0.1, 1.0)))),
            ..Default::default()
        },
        ..Default::default()
    };

    // the winit canvas is not in the page yet, so the session appends it
    let session = match RenderSession::from_surface(host, config, camera, surface) {
        Ok(session) => session,
        Err(e) => {
            log::error!("Failed to create render session: {}", e);
            return;
        }
    };

    let cube = session
        .with_scene_mut(|scene| scene.add(RenderObject::new(0, 0)))
        .unwrap_or_default();

    let mut elapsed = 0.0f64;
    session.on_render(move |ctx| {
        elapsed += ctx.delta;
        if let Some(object) = ctx.scene.get_mut(cube) {
            object.transform.rotate_y(-0.12 * ctx.delta as f32);
        }
        let t = (elapsed * 0.25).sin() as f32 * 0.5 + 0.5;
        ctx.scene.background = Some(Background::Color(Vec4::new(0.05 + 0.2 * t, 0.05, 0.1 + 0.2 * (1.0 - t), 1.0)));
    });
    session.start_render();

    // frames come from requestAnimationFrame; the event loop only keeps the
    // window and session alive
    event_loop.spawn(move |event, elwt| {
        let _ = &window;
        elwt.set_control_flow(ControlFlow::Wait);
        if let Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            ..
        } = event
        {
            session.dispose();
        }
    });
}
