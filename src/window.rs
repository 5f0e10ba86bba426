//! Native host backed by a winit window

use crate::clock::{InstantSource, TimeSource};
use crate::host::{FrameCallback, Host, HostEvent, HostHandler, SubscriptionId, SubscriptionTable, ViewportSize};
use crate::session::SessionError;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    window::{Window as WinitWindow, WindowBuilder},
};

/// Errors from opening a window or running its event loop
#[derive(Error, Debug)]
pub enum WindowError {
    #[error("Event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("Failed to create window: {0}")]
    Os(#[from] winit::error::OsError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Host driving sessions from a winit event loop
///
/// Frame callbacks run on `RedrawRequested`; queuing one requests a redraw.
/// `Load` fires on the first resume, `Resize` on every window resize or
/// scale factor change.
pub struct WinitHost {
    window: Arc<WinitWindow>,
    pending: RefCell<Vec<FrameCallback>>,
    subscriptions: RefCell<SubscriptionTable>,
    time: InstantSource,
    loaded: Cell<bool>,
}

impl WinitHost {
    /// Create a window with the given title and logical size
    pub fn new(event_loop: &EventLoop<()>, title: &str, width: u32, height: u32) -> Result<Self, WindowError> {
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(LogicalSize::new(width, height))
            .build(event_loop)?;

        Ok(Self {
            window: Arc::new(window),
            pending: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(SubscriptionTable::default()),
            time: InstantSource::new(),
            loaded: Cell::new(false),
        })
    }

    /// The window, to hand to a surface as its canvas
    pub fn window(&self) -> Arc<WinitWindow> {
        Arc::clone(&self.window)
    }

    /// Feed one winit event to the host
    pub fn handle_event(&self, event: &Event<()>, elwt: &EventLoopWindowTarget<()>) {
        match event {
            Event::Resumed => {
                if !self.loaded.replace(true) {
                    self.fire(HostEvent::Load);
                }
            }
            Event::WindowEvent { window_id, event } if *window_id == self.window.id() => match event {
                WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                    self.fire(HostEvent::Resize);
                }
                WindowEvent::RedrawRequested => self.run_frame(),
                WindowEvent::CloseRequested => elwt.exit(),
                _ => {}
            },
            Event::AboutToWait => {
                if !self.pending.borrow().is_empty() {
                    self.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    /// Run every frame callback queued so far
    fn run_frame(&self) {
        let callbacks = std::mem::take(&mut *self.pending.borrow_mut());
        for callback in callbacks {
            callback();
        }
    }

    fn fire(&self, event: HostEvent) {
        let handlers = self.subscriptions.borrow().handlers(event);
        for handler in handlers {
            handler();
        }
    }
}

impl Host for WinitHost {
    fn viewport_size(&self) -> ViewportSize {
        let size: LogicalSize<f64> = self.window.inner_size().to_logical(self.window.scale_factor());
        ViewportSize::new(size.width.round() as u32, size.height.round() as u32)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }

    fn request_frame(&self, callback: FrameCallback) {
        self.pending.borrow_mut().push(callback);
        self.window.request_redraw();
    }

    fn subscribe(&self, event: HostEvent, handler: HostHandler) -> SubscriptionId {
        self.subscriptions.borrow_mut().insert(event, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.borrow_mut().remove(id)
    }

    fn time_source(&self) -> Rc<dyn TimeSource> {
        Rc::new(self.time)
    }
}

/// Open a window and run its event loop until it is closed
///
/// `setup` runs once before the loop starts; whatever it returns (usually
/// the session) is kept alive for as long as the loop runs.
pub fn run<F, T>(title: &str, width: u32, height: u32, setup: F) -> Result<(), WindowError>
where
    F: FnOnce(&Rc<WinitHost>) -> Result<T, SessionError>,
{
    let event_loop = EventLoop::new()?;
    let host = Rc::new(WinitHost::new(&event_loop, title, width, height)?);
    let keep_alive = setup(&host)?;

    event_loop.run(move |event, elwt: &EventLoopWindowTarget<()>| {
        let _ = &keep_alive;
        elwt.set_control_flow(ControlFlow::Wait);
        host.handle_event(&event, elwt);
    })?;

    Ok(())
}
