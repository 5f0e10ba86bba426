//! Host environment abstraction
//!
//! A host is whatever the session runs inside: a browser page, a native
//! window event loop, or a hand-driven test harness. It supplies viewport
//! metrics, a "run this on the next frame" primitive and load/resize
//! notifications.

mod manual;

pub use manual::ManualHost;

use crate::clock::TimeSource;
use std::rc::Rc;

/// Callback queued for the next animation frame
pub type FrameCallback = Box<dyn FnOnce()>;

/// Handler invoked on a host event
pub type HostHandler = Rc<dyn Fn()>;

/// Host-level notifications the session can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
    /// The host finished loading (page load, first window resume)
    Load,
    /// The viewport changed size
    Resize,
}

/// Handle returned by [`Host::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Logical viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Environment the session is hosted in
pub trait Host {
    /// Current logical viewport size, read fresh on every call
    fn viewport_size(&self) -> ViewportSize;

    /// Physical pixels per logical pixel
    fn device_pixel_ratio(&self) -> f64;

    /// Run `callback` once, on the next animation frame
    fn request_frame(&self, callback: FrameCallback);

    fn subscribe(&self, event: HostEvent, handler: HostHandler) -> SubscriptionId;

    /// Remove a subscription. Returns false if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Time source for the session clock
    fn time_source(&self) -> Rc<dyn TimeSource>;
}

/// Subscription bookkeeping shared by host implementations
#[derive(Default)]
pub(crate) struct SubscriptionTable {
    next_id: u64,
    entries: Vec<(SubscriptionId, HostEvent, HostHandler)>,
}

impl SubscriptionTable {
    pub(crate) fn insert(&mut self, event: HostEvent, handler: HostHandler) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push((id, event, handler));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _, _)| *entry != id);
        self.entries.len() != before
    }

    /// Handlers for `event`, cloned so they can run without holding the table
    pub(crate) fn handlers(&self, event: HostEvent) -> Vec<HostHandler> {
        self.entries
            .iter()
            .filter(|(_, e, _)| *e == event)
            .map(|(_, _, handler)| Rc::clone(handler))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
