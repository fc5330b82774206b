//! Time sources for the control loop.
//!
//! All loop timing is expressed in seconds as `f64` since an arbitrary
//! origin. [`MonotonicClock`] backs the binary; [`ManualClock`] lets tests
//! and benches step time explicitly.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic time source [s].
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall-independent clock anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// The instant corresponding to `t = 0`.
    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually stepped clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to `t` seconds. Negative values clamp to zero.
    pub fn set(&self, t: f64) {
        self.nanos
            .store((t.max(0.0) * 1e9).round() as u64, Ordering::Release);
    }

    /// Advance by `dt` seconds.
    pub fn advance(&self, dt: f64) {
        self.nanos
            .fetch_add((dt.max(0.0) * 1e9).round() as u64, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> f64 {
        self.nanos.load(Ordering::Acquire) as f64 * 1e-9
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> f64 {
        (**self).now()
    }
}
