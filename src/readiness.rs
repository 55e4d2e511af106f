//! Readiness signals used before rasterizing a staged surface.
//!
//! Rasterization needs fonts loaded and layout settled.  Instead of sleeping
//! for a fixed time, the pipeline waits on a [`Readiness`] source and treats
//! the configured duration only as an upper bound.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Outcome of waiting for readiness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    Ready,
    /// The cap elapsed before the signal fired.
    TimedOut,
}

/// Source of a "fonts loaded and layout stable" notification.
pub trait Readiness: Send + Sync {
    /// Blocks until ready or until `cap` elapses.
    fn wait_ready(&self, cap: Duration) -> ReadyState;
}

/// Readiness that is always satisfied.  Suitable for rasterizers that lay out
/// synchronously, such as [`crate::raster::BoxRasterizer`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateReadiness;

impl Readiness for ImmediateReadiness {
    fn wait_ready(&self, _cap: Duration) -> ReadyState {
        ReadyState::Ready
    }
}

#[derive(Default)]
struct SignalState {
    ready: Mutex<bool>,
    changed: Condvar,
}

/// Latch that a layout host fires once content is measured and fonts are loaded.
///
/// Clones share the same latch, so one handle can be given to the host while
/// the exporter keeps another.
#[derive(Clone, Default)]
pub struct ReadinessSignal {
    state: Arc<SignalState>,
}

impl ReadinessSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the signal as ready and wakes every waiter.
    pub fn notify_ready(&self) {
        let mut ready = self.state.ready.lock();
        *ready = true;
        self.state.changed.notify_all();
    }

    /// Clears the latch so the next wait blocks again.
    pub fn reset(&self) {
        *self.state.ready.lock() = false;
    }

    pub fn is_ready(&self) -> bool {
        *self.state.ready.lock()
    }
}

impl Readiness for ReadinessSignal {
    fn wait_ready(&self, cap: Duration) -> ReadyState {
        let deadline = Instant::now() + cap;
        let mut ready = self.state.ready.lock();
        while !*ready {
            if self
                .state
                .changed
                .wait_until(&mut ready, deadline)
                .timed_out()
            {
                return if *ready {
                    ReadyState::Ready
                } else {
                    ReadyState::TimedOut
                };
            }
        }
        ReadyState::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn times_out_without_notification() {
        let signal = ReadinessSignal::new();
        assert_eq!(
            signal.wait_ready(Duration::from_millis(10)),
            ReadyState::TimedOut
        );
    }

    #[test]
    fn wakes_when_notified_from_another_thread() {
        let signal = ReadinessSignal::new();
        let host = signal.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            host.notify_ready();
        });

        assert_eq!(signal.wait_ready(Duration::from_secs(5)), ReadyState::Ready);
        handle.join().expect("host thread");
    }

    #[test]
    fn reset_rearms_the_latch() {
        let signal = ReadinessSignal::new();
        signal.notify_ready();
        assert_eq!(signal.wait_ready(Duration::ZERO), ReadyState::Ready);
        signal.reset();
        assert!(!signal.is_ready());
    }
}
