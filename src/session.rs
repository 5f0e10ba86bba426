//! Render session: scene, camera, surface and clock driven by one frame loop

use crate::clock::Clock;
use crate::host::{Host, HostEvent, HostHandler, SubscriptionId};
use crate::listeners::{Callback, EventKind, FrameFn, ListenerList, OneOrMany, ResizeFn};
use crate::scene::{Camera, Scene, SceneProps};
use crate::surface::{RenderSurface, SurfaceError};
use crate::{ClockConfig, SessionConfig};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use thiserror::Error;

/// Session error type
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Event '{0}' does not exist")]
    UnknownEvent(String),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Replacement for the default draw call
pub type RenderOverrideFn<S> = dyn FnMut(&mut FrameContext<'_, S>);

/// Everything a frame listener gets to see and touch for one tick
pub struct FrameContext<'a, S> {
    pub scene: &'a mut Scene,
    pub camera: &'a mut Camera,
    pub surface: &'a mut S,
    /// Seconds since the previous tick
    pub delta: f64,
    /// Index of this tick since the session was created
    pub frame: u64,
}

/// Arguments for [`RenderSession::resize`]; missing values are read from the
/// host viewport at call time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeRequest {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }
}

/// Payload of a resize notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub width: u32,
    pub height: u32,
}

/// Handle removing one registered listener
///
/// Calling [`Unsubscribe::unsubscribe`] more than once is harmless; later
/// calls only log a warning. Once the session is gone it does nothing.
pub struct Unsubscribe<S: RenderSurface + 'static> {
    session: Weak<SessionInner<S>>,
    callback: Callback<S>,
}

impl<S: RenderSurface + 'static> Unsubscribe<S> {
    /// Remove the listener. Returns true if it was still registered.
    pub fn unsubscribe(&self) -> bool {
        match self.session.upgrade() {
            Some(inner) => inner.remove_listener(self.callback.kind(), &self.callback),
            None => false,
        }
    }

    /// The callback this handle removes
    pub fn callback(&self) -> &Callback<S> {
        &self.callback
    }
}

impl<S: RenderSurface + 'static> std::fmt::Debug for Unsubscribe<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("callback", &self.callback)
            .field("session_alive", &(self.session.strong_count() > 0))
            .finish()
    }
}

struct SessionInner<S: RenderSurface + 'static> {
    host: Rc<dyn Host>,
    embedded: bool,
    scene: RefCell<Scene>,
    camera: RefCell<Camera>,
    surface: RefCell<S>,
    clock: RefCell<Clock>,
    running: Cell<bool>,
    // bumped on every start so ticks from an earlier run can tell they are stale
    generation: Cell<u64>,
    delta: Cell<f64>,
    frame_count: Cell<u64>,
    frame_listeners: ListenerList<FrameFn<S>>,
    resize_listeners: ListenerList<ResizeFn>,
    render_override: RefCell<Option<Box<RenderOverrideFn<S>>>>,
    override_epoch: Cell<u64>,
    host_subscriptions: RefCell<Vec<SubscriptionId>>,
}

/// A scene, camera, render surface and animation clock behind one frame loop
///
/// The session is a cheap handle: clones share the same state. It lives on
/// the host's thread and drives itself through [`Host::request_frame`], one
/// tick requesting the next, until [`RenderSession::stop_render`] clears the
/// run flag.
pub struct RenderSession<S: RenderSurface + 'static> {
    inner: Rc<SessionInner<S>>,
}

impl<S: RenderSurface + 'static> Clone for RenderSession<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: RenderSurface + 'static> RenderSession<S> {
    /// Create a session, building the render surface from `config.renderer`
    pub fn new(host: Rc<dyn Host>, config: SessionConfig<S::Canvas>, camera: Camera) -> SessionResult<Self> {
        let SessionConfig {
            embedded,
            width,
            height,
            scene,
            clock,
            renderer,
        } = config;

        let surface = S::create(renderer)?;
        Self::assemble(host, embedded, (width, height), &scene, clock, camera, surface)
    }

    /// Create a session around an already constructed surface (the async
    /// path on web). `config.renderer` is ignored.
    pub fn from_surface(
        host: Rc<dyn Host>,
        config: SessionConfig<S::Canvas>,
        camera: Camera,
        surface: S,
    ) -> SessionResult<Self> {
        Self::assemble(
            host,
            config.embedded,
            (config.width, config.height),
            &config.scene,
            config.clock,
            camera,
            surface,
        )
    }

    fn assemble(
        host: Rc<dyn Host>,
        embedded: bool,
        (width, height): (Option<u32>, Option<u32>),
        props: &SceneProps,
        clock: ClockConfig,
        camera: Camera,
        mut surface: S,
    ) -> SessionResult<Self> {
        let viewport = host.viewport_size();
        let width = width.unwrap_or(viewport.width);
        let height = height.unwrap_or(viewport.height);

        let mut scene = Scene::new();
        scene.apply(props);

        let clock = Clock::new(clock.auto_start, host.time_source());

        surface.set_pixel_ratio(host.device_pixel_ratio());
        surface.set_size(width, height);
        // a surface on a caller-placed canvas reports itself attached
        let attach = !surface.is_attached();
        if attach {
            surface.attach()?;
        }

        let session = Self {
            inner: Rc::new(SessionInner {
                host,
                embedded,
                scene: RefCell::new(scene),
                camera: RefCell::new(camera),
                surface: RefCell::new(surface),
                clock: RefCell::new(clock),
                running: Cell::new(false),
                generation: Cell::new(0),
                delta: Cell::new(0.0),
                frame_count: Cell::new(0),
                frame_listeners: ListenerList::default(),
                resize_listeners: ListenerList::default(),
                render_override: RefCell::new(None),
                override_epoch: Cell::new(0),
                host_subscriptions: RefCell::new(Vec::new()),
            }),
        };

        log::debug!(
            "Render session created: {}x{}, embedded: {}, attached by session: {}",
            width,
            height,
            embedded,
            attach
        );

        if !embedded {
            session.resize(ResizeRequest::default());
            session.listen_resize();
        }

        Ok(session)
    }

    /// Register one or more callbacks for `event` ("render" or "resize")
    ///
    /// Returns unsubscribe handles shaped like the input, or `None` (after
    /// logging a warning) if the event name is unknown or a callback does
    /// not match the event.
    pub fn on(
        &self,
        event: &str,
        callbacks: impl Into<OneOrMany<Callback<S>>>,
    ) -> Option<OneOrMany<Unsubscribe<S>>> {
        let kind = match event.parse::<EventKind>() {
            Ok(kind) => kind,
            Err(_) => {
                log::warn!("Cannot add listener, event '{}' does not exist.", event);
                return None;
            }
        };

        let callbacks = callbacks.into();
        if let Some(mismatch) = callbacks.iter().find(|cb| cb.kind() != kind) {
            log::warn!(
                "Cannot add listener, a '{}' callback was given for event '{}'.",
                mismatch.kind(),
                kind
            );
            return None;
        }

        Some(callbacks.map(|callback| self.add_listener(callback)))
    }

    /// Register a frame listener
    pub fn on_render<F>(&self, f: F) -> Unsubscribe<S>
    where
        F: FnMut(&mut FrameContext<'_, S>) + 'static,
    {
        self.add_listener(Callback::render(f))
    }

    /// Register a resize listener
    pub fn on_resize<F>(&self, f: F) -> Unsubscribe<S>
    where
        F: FnMut(ResizeEvent) + 'static,
    {
        self.add_listener(Callback::resize(f))
    }

    fn add_listener(&self, callback: Callback<S>) -> Unsubscribe<S> {
        match &callback {
            Callback::Render(f) => self.inner.frame_listeners.push(Rc::clone(f)),
            Callback::Resize(f) => self.inner.resize_listeners.push(Rc::clone(f)),
        }
        Unsubscribe {
            session: Rc::downgrade(&self.inner),
            callback,
        }
    }

    /// Remove the first registration of `callback` from `event`'s listeners
    ///
    /// Logs a warning and returns false if it is not registered there.
    pub fn off(&self, event: &str, callback: &Callback<S>) -> bool {
        match event.parse::<EventKind>() {
            Ok(kind) => self.inner.remove_listener(kind, callback),
            Err(_) => {
                log::warn!("Cannot remove listener, event '{}' does not exist.", event);
                false
            }
        }
    }

    pub fn frame_listener_count(&self) -> usize {
        self.inner.frame_listeners.len()
    }

    pub fn resize_listener_count(&self) -> usize {
        self.inner.resize_listeners.len()
    }

    /// How many times `callback` is registered for its event
    pub fn registrations(&self, callback: &Callback<S>) -> usize {
        match callback {
            Callback::Render(f) => self.inner.frame_listeners.count(f),
            Callback::Resize(f) => self.inner.resize_listeners.count(f),
        }
    }

    /// Position of the last registration of `callback` within its event's list
    pub fn listener_position(&self, callback: &Callback<S>) -> Option<usize> {
        match callback {
            Callback::Render(f) => self.inner.frame_listeners.last_position(f),
            Callback::Resize(f) => self.inner.resize_listeners.last_position(f),
        }
    }

    /// Replace (or with `None`, restore) the default draw call
    pub fn set_render_override(&self, render: Option<Box<RenderOverrideFn<S>>>) {
        self.inner.override_epoch.set(self.inner.override_epoch.get() + 1);
        *self.inner.render_override.borrow_mut() = render;
    }

    pub fn has_render_override(&self) -> bool {
        self.inner.render_override.borrow().is_some()
    }

    /// Start the frame loop and render the first frame immediately
    pub fn start_render(&self) {
        if self.inner.running.get() {
            log::debug!("start_render: already running");
            return;
        }

        self.inner.running.set(true);
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);

        {
            let mut clock = self.inner.clock.borrow_mut();
            if !clock.is_running() {
                clock.start();
            }
        }

        log::debug!("Frame loop started");
        SessionInner::tick(&self.inner, generation);
    }

    /// Stop the frame loop. The already requested frame exits without rendering.
    pub fn stop_render(&self) {
        self.inner.stop();
    }

    /// Render exactly one frame, then stop
    ///
    /// A running loop renders its frame right away, with the delta since its
    /// previous tick, and then stops.
    pub fn render_once(&self) {
        if self.inner.running.get() {
            SessionInner::tick(&self.inner, self.inner.generation.get());
        } else {
            self.start_render();
        }
        self.stop_render();
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Delta of the most recent tick, in seconds
    pub fn delta(&self) -> f64 {
        self.inner.delta.get()
    }

    /// Ticks rendered so far
    pub fn frame_count(&self) -> u64 {
        self.inner.frame_count.get()
    }

    pub fn is_embedded(&self) -> bool {
        self.inner.embedded
    }

    pub fn clock_running(&self) -> bool {
        self.inner.clock.borrow().is_running()
    }

    /// Resize the camera and surface, then notify resize listeners
    pub fn resize(&self, request: ResizeRequest) {
        self.inner.resize(request);
    }

    /// Follow host load/resize events. Subscribing twice is a no-op.
    pub fn listen_resize(&self) {
        let mut subscriptions = self.inner.host_subscriptions.borrow_mut();
        if !subscriptions.is_empty() {
            return;
        }

        for event in [HostEvent::Load, HostEvent::Resize] {
            let weak = Rc::downgrade(&self.inner);
            let handler: HostHandler = Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.resize(ResizeRequest::default());
                }
            });
            subscriptions.push(self.inner.host.subscribe(event, handler));
        }
    }

    /// Drop the host subscriptions made by [`RenderSession::listen_resize`]
    pub fn unlisten_resize(&self) {
        self.inner.unlisten();
    }

    pub fn is_listening(&self) -> bool {
        !self.inner.host_subscriptions.borrow().is_empty()
    }

    /// Stop rendering, unsubscribe from the host and forget every listener
    pub fn dispose(&self) {
        self.stop_render();
        self.unlisten_resize();
        self.inner.frame_listeners.clear();
        self.inner.resize_listeners.clear();
        self.set_render_override(None);
        log::debug!("Render session disposed");
    }

    /// Run `f` with the scene. Returns `None` while a frame holds it.
    pub fn with_scene<R>(&self, f: impl FnOnce(&Scene) -> R) -> Option<R> {
        borrowed(&self.inner.scene, "scene").map(|scene| f(&scene))
    }

    pub fn with_scene_mut<R>(&self, f: impl FnOnce(&mut Scene) -> R) -> Option<R> {
        borrowed_mut(&self.inner.scene, "scene").map(|mut scene| f(&mut scene))
    }

    pub fn with_camera<R>(&self, f: impl FnOnce(&Camera) -> R) -> Option<R> {
        borrowed(&self.inner.camera, "camera").map(|camera| f(&camera))
    }

    pub fn with_camera_mut<R>(&self, f: impl FnOnce(&mut Camera) -> R) -> Option<R> {
        borrowed_mut(&self.inner.camera, "camera").map(|mut camera| f(&mut camera))
    }

    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        borrowed(&self.inner.surface, "surface").map(|surface| f(&surface))
    }

    pub fn with_surface_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        borrowed_mut(&self.inner.surface, "surface").map(|mut surface| f(&mut surface))
    }
}

fn borrowed<'a, T>(cell: &'a RefCell<T>, what: &str) -> Option<std::cell::Ref<'a, T>> {
    let guard = cell.try_borrow().ok();
    if guard.is_none() {
        log::warn!("Cannot access the {} while a frame is using it", what);
    }
    guard
}

fn borrowed_mut<'a, T>(cell: &'a RefCell<T>, what: &str) -> Option<std::cell::RefMut<'a, T>> {
    let guard = cell.try_borrow_mut().ok();
    if guard.is_none() {
        log::warn!("Cannot access the {} while a frame is using it", what);
    }
    guard
}

impl<S: RenderSurface + 'static> SessionInner<S> {
    /// One frame: request the next, then listeners, then draw
    fn tick(inner: &Rc<Self>, generation: u64) {
        if !inner.running.get() || inner.generation.get() != generation {
            return;
        }

        let weak = Rc::downgrade(inner);
        inner.host.request_frame(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                SessionInner::tick(&inner, generation);
            }
        }));

        let delta = inner.clock.borrow_mut().get_delta();
        inner.delta.set(delta);
        let frame = inner.frame_count.get();
        inner.frame_count.set(frame + 1);

        let (Ok(mut scene), Ok(mut camera), Ok(mut surface)) = (
            inner.scene.try_borrow_mut(),
            inner.camera.try_borrow_mut(),
            inner.surface.try_borrow_mut(),
        ) else {
            log::warn!("Frame {} skipped: scene, camera or surface is already in use", frame);
            return;
        };

        let mut ctx = FrameContext {
            scene: &mut *scene,
            camera: &mut *camera,
            surface: &mut *surface,
            delta,
            frame,
        };

        inner.frame_listeners.for_each_live(|listener| match listener.try_borrow_mut() {
            Ok(mut listener) => (&mut *listener)(&mut ctx),
            Err(_) => log::warn!("Frame listener re-entered during frame {}, skipped", frame),
        });

        let render_override = inner.render_override.borrow_mut().take();
        match render_override {
            Some(mut render) => {
                let epoch = inner.override_epoch.get();
                render(&mut ctx);
                // put it back unless it was replaced or cleared while running
                if inner.override_epoch.get() == epoch {
                    *inner.render_override.borrow_mut() = Some(render);
                }
            }
            None => {
                if let Err(e) = ctx.surface.render(&*ctx.scene, &*ctx.camera) {
                    log::error!("Frame {} failed to render: {}", frame, e);
                }
            }
        }
    }

    fn stop(&self) {
        if self.running.replace(false) {
            log::debug!("Frame loop stopped");
        }
        if let Ok(mut clock) = self.clock.try_borrow_mut() {
            clock.stop();
        }
    }

    fn resize(&self, request: ResizeRequest) {
        let (width, height) = match (request.width, request.height) {
            (Some(width), Some(height)) => (width, height),
            (width, height) => {
                let viewport = self.host.viewport_size();
                (width.unwrap_or(viewport.width), height.unwrap_or(viewport.height))
            }
        };

        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return;
        }

        {
            let (Ok(mut camera), Ok(mut surface)) =
                (self.camera.try_borrow_mut(), self.surface.try_borrow_mut())
            else {
                log::warn!("Cannot resize to {}x{} while a frame is being rendered", width, height);
                return;
            };

            camera.set_aspect_ratio(width as f32 / height as f32);
            camera.update_projection_matrix();
            surface.set_size(width, height);
        }

        let event = ResizeEvent { width, height };
        self.resize_listeners.for_each_live(|listener| match listener.try_borrow_mut() {
            Ok(mut listener) => (&mut *listener)(event),
            Err(_) => log::warn!("Resize listener re-entered, skipped"),
        });
    }

    fn remove_listener(&self, kind: EventKind, callback: &Callback<S>) -> bool {
        let removed = match (kind, callback) {
            (EventKind::Render, Callback::Render(f)) => self.frame_listeners.remove(f),
            (EventKind::Resize, Callback::Resize(f)) => self.resize_listeners.remove(f),
            _ => false,
        };
        if !removed {
            log::warn!("Cannot find listener to remove");
        }
        removed
    }

    fn unlisten(&self) {
        let subscriptions = std::mem::take(&mut *self.host_subscriptions.borrow_mut());
        for id in subscriptions {
            self.host.unsubscribe(id);
        }
    }
}

impl<S: RenderSurface + 'static> Drop for SessionInner<S> {
    fn drop(&mut self) {
        self.running.set(false);
        self.unlisten();
    }
}
