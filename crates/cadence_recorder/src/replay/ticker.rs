//! Drift-correcting ticker for replay timing.
//!
//! Every wait targets an absolute deadline measured from a single origin,
//! so oversleeping on one event only eats into the slack of the next ones
//! instead of pushing every later event back.

use std::time::Duration;

use super::CancelToken;
use crate::clock::SharedClock;

/// Below this much remaining time the ticker stops sleeping and spins.
pub const SPIN_THRESHOLD: Duration = Duration::from_millis(20);

/// Longest single sleep, which bounds how long a stop request can go unseen.
pub const MAX_SLEEP: Duration = Duration::from_millis(15);

/// Slowest and fastest playback speeds accepted.
pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 10.0;

/// How a call to [`Ticker::next`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Waited until the deadline.
    OnTime,
    /// The deadline had already passed; returned without waiting.
    Late,
    /// Cancellation was requested while waiting.
    Cancelled,
}

/// Paces a stream of delays against a fixed origin.
#[derive(Debug)]
pub struct Ticker {
    clock: SharedClock,
    cancel: CancelToken,
    /// Clock reading the pass is measured from.
    origin: Duration,
    /// Cumulative target elapsed time requested so far.
    expected: Duration,
    /// Playback speed multiplier.
    speed: f64,
}

impl Ticker {
    /// Create a ticker whose origin is now.
    pub fn new(clock: SharedClock, cancel: CancelToken) -> Self {
        Self::with_offset(clock, cancel, Duration::ZERO)
    }

    /// Create a ticker that starts `offset` behind schedule.
    ///
    /// Used to carry the residual drift of one loop pass into the next, so
    /// the second pass is measured from where the first one should have
    /// ended rather than from where it actually did.
    pub fn with_offset(clock: SharedClock, cancel: CancelToken, offset: Duration) -> Self {
        let origin = clock.now().saturating_sub(offset);
        Self {
            clock,
            cancel,
            origin,
            expected: Duration::ZERO,
            speed: 1.0,
        }
    }

    /// Set the playback speed (1.0 = recorded speed, 2.0 = twice as fast).
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = clamp_speed(speed);
        self
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Absolute deadline of the most recent `next` call, relative to origin.
    pub fn expected(&self) -> Duration {
        self.expected
    }

    /// Time elapsed since origin.
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.origin)
    }

    /// How far behind the last deadline the ticker currently is.
    pub fn residual(&self) -> Duration {
        self.elapsed().saturating_sub(self.expected)
    }

    /// Wait until `delay` more has elapsed on the cumulative schedule.
    ///
    /// Sleeps for half the remaining time (at most [`MAX_SLEEP`]) while more
    /// than [`SPIN_THRESHOLD`] remains, then spins. Cancellation is checked
    /// on every iteration.
    pub fn next(&mut self, delay: Duration) -> Tick {
        self.expected += self.scale(delay);

        if self.elapsed() > self.expected {
            return Tick::Late;
        }

        loop {
            if self.cancel.is_cancelled() {
                return Tick::Cancelled;
            }
            let remaining = self.expected.saturating_sub(self.elapsed());
            if remaining.is_zero() {
                return Tick::OnTime;
            }
            if remaining > SPIN_THRESHOLD {
                self.clock.sleep((remaining / 2).min(MAX_SLEEP));
            } else {
                self.clock.spin();
            }
        }
    }

    fn scale(&self, delay: Duration) -> Duration {
        if self.speed == 1.0 {
            delay
        } else {
            delay.div_f64(self.speed)
        }
    }
}

/// Clamp a playback speed to the supported range.
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        return 1.0;
    }
    speed.clamp(MIN_SPEED, MAX_SPEED)
}
