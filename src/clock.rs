//! Animation clock
//!
//! Tracks elapsed wall time and per-tick deltas. Time readings come from a
//! [`TimeSource`] so hosts can supply their own notion of "now" (browser
//! `performance.now()`, a native monotonic clock, or a hand-driven clock in
//! tests).

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Monotonic source of the current time
pub trait TimeSource {
    /// Time since some fixed, source-specific origin
    fn now(&self) -> Duration;
}

/// Native monotonic clock backed by [`std::time::Instant`]
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
pub struct InstantSource {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl InstantSource {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for InstantSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl TimeSource for InstantSource {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Browser clock backed by `performance.now()`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceSource;

#[cfg(target_arch = "wasm32")]
impl TimeSource for PerformanceSource {
    fn now(&self) -> Duration {
        let millis = web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0);
        Duration::from_secs_f64(millis.max(0.0) / 1000.0)
    }
}

/// Hand-driven clock. Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Rc<Cell<Duration>>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Jump to an absolute time. Going backwards is clamped to the current time.
    pub fn set(&self, to: Duration) {
        if to >= self.now.get() {
            self.now.set(to);
        }
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Delta-time clock for the frame loop
///
/// Mirrors the classic animation clock contract: `get_delta` auto-starts a
/// clock created with `auto_start`, and `stop` disables auto-start so a
/// stopped clock stays stopped until `start` is called again.
pub struct Clock {
    source: Rc<dyn TimeSource>,
    auto_start: bool,
    running: bool,
    start_time: Duration,
    old_time: Duration,
    elapsed: f64,
}

impl Clock {
    pub fn new(auto_start: bool, source: Rc<dyn TimeSource>) -> Self {
        Self {
            source,
            auto_start,
            running: false,
            start_time: Duration::ZERO,
            old_time: Duration::ZERO,
            elapsed: 0.0,
        }
    }

    /// Start (or restart) the clock, resetting elapsed time
    pub fn start(&mut self) {
        self.start_time = self.source.now();
        self.old_time = self.start_time;
        self.elapsed = 0.0;
        self.running = true;
    }

    /// Stop the clock, folding the time since the last reading into `elapsed`
    pub fn stop(&mut self) {
        self.elapsed_time();
        self.running = false;
        self.auto_start = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn auto_start(&self) -> bool {
        self.auto_start
    }

    /// Time when the clock was last started
    pub fn start_time(&self) -> Duration {
        self.start_time
    }

    /// Seconds since the previous call (0 on the call that auto-starts the clock)
    pub fn get_delta(&mut self) -> f64 {
        if self.auto_start && !self.running {
            self.start();
            return 0.0;
        }

        if !self.running {
            return 0.0;
        }

        let now = self.source.now();
        // saturating: a misbehaving source must never yield a negative delta
        let diff = now.saturating_sub(self.old_time).as_secs_f64();
        self.old_time = now;
        self.elapsed += diff;
        diff
    }

    /// Total seconds accumulated since `start`
    pub fn elapsed_time(&mut self) -> f64 {
        self.get_delta();
        self.elapsed
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("auto_start", &self.auto_start)
            .field("running", &self.running)
            .field("start_time", &self.start_time)
            .field("elapsed", &self.elapsed)
            .finish()
    }
}
