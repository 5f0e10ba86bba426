//! Browser host for running sessions in a WebAssembly page.
//!
//! Frames come from `requestAnimationFrame`, load/resize notifications from
//! window event listeners, and time from `performance.now()`.

use crate::clock::{PerformanceSource, TimeSource};
use crate::host::{FrameCallback, Host, HostEvent, HostHandler, SubscriptionId, ViewportSize};
use crate::surface::{SurfaceError, SurfaceResult};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use winit::platform::web::WindowExtWebSys;

struct DomListener {
    id: SubscriptionId,
    event: &'static str,
    closure: Closure<dyn FnMut()>,
}

/// Host backed by the browser window
pub struct BrowserHost {
    window: web_sys::Window,
    next_id: Cell<u64>,
    listeners: RefCell<Vec<DomListener>>,
}

impl BrowserHost {
    pub fn new() -> Option<Self> {
        Some(Self {
            window: web_sys::window()?,
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        })
    }

    fn dimension(value: Result<JsValue, JsValue>) -> u32 {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0).max(0.0) as u32
    }
}

fn dom_event_name(event: HostEvent) -> &'static str {
    match event {
        HostEvent::Load => "load",
        HostEvent::Resize => "resize",
    }
}

impl Host for BrowserHost {
    fn viewport_size(&self) -> ViewportSize {
        ViewportSize::new(
            Self::dimension(self.window.inner_width()),
            Self::dimension(self.window.inner_height()),
        )
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio()
    }

    fn request_frame(&self, callback: FrameCallback) {
        let closure = Closure::once_into_js(move || callback());
        if let Err(e) = self.window.request_animation_frame(closure.unchecked_ref()) {
            log::error!("requestAnimationFrame failed: {:?}", e);
        }
    }

    fn subscribe(&self, event: HostEvent, handler: HostHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get() + 1);
        self.next_id.set(id.0);

        let name = dom_event_name(event);
        let closure = Closure::<dyn FnMut()>::new(move || handler());
        if let Err(e) = self
            .window
            .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
        {
            log::error!("Failed to listen for '{}': {:?}", name, e);
        }

        self.listeners.borrow_mut().push(DomListener {
            id,
            event: name,
            closure,
        });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(index) = listeners.iter().position(|l| l.id == id) else {
            return false;
        };
        let listener = listeners.remove(index);
        if let Err(e) = self
            .window
            .remove_event_listener_with_callback(listener.event, listener.closure.as_ref().unchecked_ref())
        {
            log::warn!("Failed to stop listening for '{}': {:?}", listener.event, e);
        }
        true
    }

    fn time_source(&self) -> Rc<dyn TimeSource> {
        Rc::new(PerformanceSource)
    }
}

/// Append a winit window's canvas to the document body
pub fn append_to_body(window: &winit::window::Window) -> SurfaceResult<()> {
    let canvas = window
        .canvas()
        .ok_or_else(|| SurfaceError::InitializationFailed("window has no canvas".into()))?;
    let body = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.body())
        .ok_or_else(|| SurfaceError::InitializationFailed("document has no body".into()))?;
    body.append_child(&canvas)
        .map_err(|e| SurfaceError::InitializationFailed(format!("{:?}", e)))?;
    Ok(())
}

/// Spawn a future on the browser's event loop
///
/// Surfaces that need async initialization on web are built inside one of
/// these, then handed to `RenderSession::from_surface`.
pub fn spawn_local<F>(future: F)
where
    F: std::future::Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}
