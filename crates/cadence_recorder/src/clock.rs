//! Monotonic time source.
//!
//! Recording and replay read time through the [`Clock`] trait so the timing
//! logic can run against [`crate::testing::ManualClock`] in tests instead of
//! real sleeps.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic clock that can also block the current thread.
pub trait Clock: Debug + Send + Sync {
    /// Time elapsed since an arbitrary fixed point. Never decreases.
    fn now(&self) -> Duration;

    /// Block the current thread for roughly `duration`.
    fn sleep(&self, duration: Duration);

    /// Called on every iteration of a busy-wait loop.
    fn spin(&self) {
        std::hint::spin_loop();
    }
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// A shared handle to a fresh monotonic clock.
    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_millis(2));
        assert!(clock.now() >= before + Duration::from_millis(2));
    }
}
