//! Manually driven clock for deterministic timing tests.

use parking_lot::Mutex;
use std::time::Duration;

use crate::clock::Clock;

/// Default amount a single busy-wait iteration advances a [`ManualClock`].
pub const DEFAULT_SPIN_STEP: Duration = Duration::from_micros(100);

/// A clock that only moves when told to.
///
/// `sleep` advances time by exactly the requested duration and `spin`
/// advances it by a fixed step, so code that waits on the clock finishes
/// instantly while still observing consistent time.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
    spin_step: Duration,
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    sleeps: Vec<Duration>,
    spins: u64,
}

impl ManualClock {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::with_spin_step(DEFAULT_SPIN_STEP)
    }

    /// Create a clock whose busy-wait iterations advance by `step`.
    pub fn with_spin_step(step: Duration) -> Self {
        Self {
            state: Mutex::new(ManualState::default()),
            spin_step: step,
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        self.state.lock().now += duration;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }

    /// Number of busy-wait iterations so far.
    pub fn spins(&self) -> u64 {
        self.state.lock().spins
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.state.lock().now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.now += duration;
        state.sleeps.push(duration);
    }

    fn spin(&self) {
        let mut state = self.state.lock();
        state.now += self.spin_step;
        state.spins += 1;
    }
}
