//! Hand-driven host for headless sessions and tests

use super::{FrameCallback, Host, HostEvent, HostHandler, SubscriptionId, SubscriptionTable, ViewportSize};
use crate::clock::{ManualTime, TimeSource};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Deterministic host: frames and events happen only when asked for
///
/// `advance_frame` plays the role of the browser's animation frame: it moves
/// the clock forward and runs every callback that was queued before the
/// call. Callbacks queued while those run wait for the following frame.
pub struct ManualHost {
    viewport: Cell<ViewportSize>,
    pixel_ratio: Cell<f64>,
    time: ManualTime,
    pending: RefCell<Vec<FrameCallback>>,
    subscriptions: RefCell<SubscriptionTable>,
    frames_run: Cell<u64>,
}

impl ManualHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: Cell::new(ViewportSize::new(width, height)),
            pixel_ratio: Cell::new(1.0),
            time: ManualTime::new(),
            pending: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(SubscriptionTable::default()),
            frames_run: Cell::new(0),
        }
    }

    pub fn with_pixel_ratio(self, ratio: f64) -> Self {
        self.pixel_ratio.set(ratio);
        self
    }

    /// The host's clock, shared with every session created on it
    pub fn time(&self) -> &ManualTime {
        &self.time
    }

    /// Advance time by `dt` and run the callbacks queued so far.
    /// Returns how many callbacks ran.
    pub fn advance_frame(&self, dt: Duration) -> usize {
        self.time.advance(dt);
        let callbacks = std::mem::take(&mut *self.pending.borrow_mut());
        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        self.frames_run.set(self.frames_run.get() + 1);
        count
    }

    /// Number of callbacks waiting for the next frame
    pub fn pending_frames(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn frames_run(&self) -> u64 {
        self.frames_run.get()
    }

    /// Change the viewport and notify `Resize` subscribers
    pub fn set_viewport(&self, width: u32, height: u32) {
        self.viewport.set(ViewportSize::new(width, height));
        self.fire(HostEvent::Resize);
    }

    pub fn fire_load(&self) {
        self.fire(HostEvent::Load);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    fn fire(&self, event: HostEvent) {
        let handlers = self.subscriptions.borrow().handlers(event);
        for handler in handlers {
            handler();
        }
    }
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl Host for ManualHost {
    fn viewport_size(&self) -> ViewportSize {
        self.viewport.get()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio.get()
    }

    fn request_frame(&self, callback: FrameCallback) {
        self.pending.borrow_mut().push(callback);
    }

    fn subscribe(&self, event: HostEvent, handler: HostHandler) -> SubscriptionId {
        self.subscriptions.borrow_mut().insert(event, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.borrow_mut().remove(id)
    }

    fn time_source(&self) -> Rc<dyn TimeSource> {
        Rc::new(self.time.clone())
    }
}
