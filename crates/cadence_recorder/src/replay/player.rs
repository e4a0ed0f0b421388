//! Replayer for playing back recorded sequences.
//!
//! A [`Replayer`] drives a [`Ticker`] and an [`InputSink`] over an
//! [`EventSequence`] on a background thread. The sink is closed after every
//! pass, whether the pass finished, was cancelled or hit errors.

use parking_lot::{Mutex, MutexGuard};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::ticker::{clamp_speed, Tick, Ticker};
use super::CancelToken;
use crate::clock::{MonotonicClock, SharedClock};
use crate::event::EventSequence;
use crate::sink::InputSink;
use crate::{Error, Result};

/// How many passes a replay runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    /// A single pass.
    Once,
    /// A fixed number of passes.
    Times(u32),
    /// Until stopped.
    Forever,
}

impl Repeat {
    /// Whether pass number `pass` (1-based) should run.
    fn allows(self, pass: u32) -> bool {
        match self {
            Self::Once => pass <= 1,
            Self::Times(n) => pass <= n,
            Self::Forever => true,
        }
    }
}

/// Configuration for the replayer.
#[derive(Clone, Debug)]
pub struct ReplayConfig {
    /// How many passes to run.
    pub repeat: Repeat,
    /// Playback speed (1.0 = recorded speed).
    pub speed: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            repeat: Repeat::Once,
            speed: 1.0,
        }
    }
}

impl ReplayConfig {
    /// Loop until stopped, or play once.
    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = if repeat { Repeat::Forever } else { Repeat::Once };
        self
    }

    /// Play exactly `passes` times. Zero passes injects nothing.
    pub fn with_passes(mut self, passes: u32) -> Self {
        self.repeat = Repeat::Times(passes);
        self
    }

    /// Set the playback speed, clamped to the supported range.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = clamp_speed(speed);
        self
    }
}

/// Current state of the replayer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayState {
    /// No background run.
    Idle,
    /// Background run is injecting input.
    Running,
    /// Cancellation requested, waiting for the run to finish cleanup.
    Stopping,
}

/// Counters describing what the replayer has done.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Passes completed, including cancelled ones.
    pub passes: u64,
    /// Events executed successfully.
    pub executed: u64,
    /// Events whose execution failed and were skipped.
    pub failed: u64,
    /// Sink closes that reported an error.
    pub close_failures: u64,
    /// Most recent error message.
    pub last_error: Option<String>,
    /// Drift measured at the end of the latest pass.
    pub last_residual: Duration,
}

#[derive(Debug)]
struct Shared {
    state: ReplayState,
    stats: ReplayStats,
}

/// Plays an [`EventSequence`] through an [`InputSink`].
pub struct Replayer<S: InputSink + 'static> {
    sequence: Arc<EventSequence>,
    sink: Arc<Mutex<S>>,
    config: ReplayConfig,
    clock: SharedClock,
    cancel: CancelToken,
    shared: Arc<Mutex<Shared>>,
    handle: Option<JoinHandle<()>>,
}

impl<S: InputSink + 'static> Replayer<S> {
    /// Create an idle replayer pacing with the monotonic clock.
    pub fn new(sequence: impl Into<Arc<EventSequence>>, sink: S, config: ReplayConfig) -> Self {
        Self {
            sequence: sequence.into(),
            sink: Arc::new(Mutex::new(sink)),
            config,
            clock: MonotonicClock::shared(),
            cancel: CancelToken::new(),
            shared: Arc::new(Mutex::new(Shared {
                state: ReplayState::Idle,
                stats: ReplayStats::default(),
            })),
            handle: None,
        }
    }

    /// Use a different clock for pacing.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn sequence(&self) -> &EventSequence {
        &self.sequence
    }

    pub fn state(&self) -> ReplayState {
        self.shared.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() != ReplayState::Idle
    }

    pub fn stats(&self) -> ReplayStats {
        self.shared.lock().stats.clone()
    }

    /// Lock the sink. Blocks while a pass is in progress.
    pub fn sink(&self) -> MutexGuard<'_, S> {
        self.sink.lock()
    }

    /// Token that cancels the current run.
    ///
    /// Each `start` creates a new token; use [`Replayer::start_with_cancel`]
    /// to supply one that already exists, e.g. from a signal handler.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Start replaying on a background thread.
    ///
    /// Fails with [`Error::AlreadyRunning`] while a previous run is active.
    pub fn start(&mut self) -> Result<()> {
        self.start_with_cancel(CancelToken::new())
    }

    /// Start replaying, observing `cancel` for stop requests.
    ///
    /// A token cancelled before the call still runs the first pass's
    /// cleanup, but no events.
    pub fn start_with_cancel(&mut self, cancel: CancelToken) -> Result<()> {
        if self.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(Error::AlreadyRunning("replayer"));
        }
        if let Some(finished) = self.handle.take() {
            join(finished, &self.shared)?;
        }

        self.cancel = cancel;
        let run = Run {
            sequence: Arc::clone(&self.sequence),
            sink: Arc::clone(&self.sink),
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
            cancel: self.cancel.clone(),
            shared: Arc::clone(&self.shared),
        };

        self.shared.lock().state = ReplayState::Running;
        let spawned = thread::Builder::new()
            .name("cadence-replay".into())
            .spawn(move || run.repeat_replay());

        match spawned {
            Ok(handle) => {
                tracing::info!(
                    events = self.sequence.len(),
                    repeat = ?self.config.repeat,
                    speed = self.config.speed,
                    "replay started"
                );
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.lock().state = ReplayState::Idle;
                Err(e.into())
            }
        }
    }

    /// Cancel the run and wait for it to finish cleaning up.
    ///
    /// Once this returns no further input is injected. Stopping a run that
    /// already ended on its own just reaps it.
    pub fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Err(Error::NotRunning("replayer"));
        };

        self.cancel.cancel();
        {
            let mut shared = self.shared.lock();
            if shared.state == ReplayState::Running {
                shared.state = ReplayState::Stopping;
            }
        }
        join(handle, &self.shared)?;
        tracing::info!("replay stopped");
        Ok(())
    }

    /// Wait for the run to end on its own.
    ///
    /// With [`Repeat::Forever`] this only returns after the token from
    /// [`Replayer::cancel_token`] is cancelled.
    pub fn wait(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Err(Error::NotRunning("replayer"));
        };
        join(handle, &self.shared)
    }
}

impl<S: InputSink + 'static> Drop for Replayer<S> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.stop() {
                tracing::error!(error = %e, "failed to stop replay on drop");
            }
        }
    }
}

fn join(handle: JoinHandle<()>, shared: &Mutex<Shared>) -> Result<()> {
    let joined = handle.join();
    shared.lock().state = ReplayState::Idle;
    joined.map_err(|_| Error::Backend("replay thread panicked".into()))
}

/// Everything the background thread needs for one run.
struct Run<S> {
    sequence: Arc<EventSequence>,
    sink: Arc<Mutex<S>>,
    config: ReplayConfig,
    clock: SharedClock,
    cancel: CancelToken,
    shared: Arc<Mutex<Shared>>,
}

impl<S: InputSink> Run<S> {
    /// Run passes until the repeat policy or a cancellation ends the run,
    /// carrying each pass's residual drift into the next.
    fn repeat_replay(self) {
        let mut residual = Duration::ZERO;
        let mut pass = 1;

        while self.config.repeat.allows(pass) {
            if pass > 1 && self.sequence.is_empty() {
                tracing::warn!("not repeating an empty sequence");
                break;
            }
            residual = self.replay(residual);
            pass += 1;
            if self.cancel.is_cancelled() {
                break;
            }
        }

        self.shared.lock().state = ReplayState::Idle;
        tracing::debug!(passes = pass - 1, "replay run finished");
    }

    /// One pass over the sequence. Returns the residual drift.
    fn replay(&self, offset: Duration) -> Duration {
        let mut sink = self.sink.lock();
        let mut ticker = Ticker::with_offset(Arc::clone(&self.clock), self.cancel.clone(), offset)
            .with_speed(self.config.speed);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            for event in self.sequence.iter() {
                if self.cancel.is_cancelled() {
                    break;
                }
                if ticker.next(event.delay()) == Tick::Cancelled {
                    break;
                }
                match sink.execute(event) {
                    Ok(()) => {
                        tracing::trace!(kind = %event.kind(), "executed");
                        self.shared.lock().stats.executed += 1;
                    }
                    Err(e) => {
                        tracing::error!(kind = %event.kind(), error = %e, "event failed, skipping");
                        let mut shared = self.shared.lock();
                        shared.stats.failed += 1;
                        shared.stats.last_error = Some(e.to_string());
                    }
                }
            }
        }));

        if outcome.is_err() {
            tracing::error!("input sink panicked, ending replay");
            self.shared.lock().stats.last_error = Some("input sink panicked".into());
            self.cancel.cancel();
        }

        if let Err(e) = sink.close() {
            tracing::error!(error = %e, "failed to release input after pass");
            let mut shared = self.shared.lock();
            shared.stats.close_failures += 1;
            shared.stats.last_error = Some(e.to_string());
        }

        let residual = ticker.residual();
        let mut shared = self.shared.lock();
        shared.stats.passes += 1;
        shared.stats.last_residual = residual;
        tracing::debug!(pass = shared.stats.passes, ?residual, "pass finished");
        residual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, Point};
    use crate::sink::CleanupSink;
    use crate::testing::{ManualClock, RecordingSink, SinkCall};
    use std::time::Instant;

    const MS: Duration = Duration::from_millis(1);

    fn keys(n: usize, delay: Duration) -> EventSequence {
        EventSequence::from_events(
            (0..n)
                .map(|i| {
                    if i % 2 == 0 {
                        Event::key_press("'k'", delay)
                    } else {
                        Event::key_release("'k'", delay)
                    }
                })
                .collect(),
        )
    }

    #[test]
    fn test_config_builders() {
        let config = ReplayConfig::default();
        assert_eq!(config.repeat, Repeat::Once);
        assert_eq!(config.speed, 1.0);

        let config = ReplayConfig::default().with_repeat(true).with_speed(50.0);
        assert_eq!(config.repeat, Repeat::Forever);
        assert_eq!(config.speed, 10.0);

        assert_eq!(ReplayConfig::default().with_passes(3).repeat, Repeat::Times(3));
    }

    #[test]
    fn test_repeat_allows() {
        assert!(Repeat::Once.allows(1));
        assert!(!Repeat::Once.allows(2));
        assert!(Repeat::Times(2).allows(2));
        assert!(!Repeat::Times(2).allows(3));
        assert!(Repeat::Forever.allows(1_000));
    }

    #[test]
    fn test_single_pass_executes_in_order_then_closes() {
        let clock = Arc::new(ManualClock::new());
        let sink = RecordingSink::new(clock.clone());
        let calls = sink.calls();
        let sequence = keys(6, MS * 10);
        let mut replayer =
            Replayer::new(sequence.clone(), sink, ReplayConfig::default()).with_clock(clock);

        replayer.start().unwrap();
        replayer.wait().unwrap();

        let calls = calls.take();
        let executed: Vec<_> = calls.iter().filter_map(SinkCall::event).cloned().collect();
        assert_eq!(executed, sequence.into_events());
        assert!(matches!(calls.last(), Some(SinkCall::Close { .. })));
        assert_eq!(replayer.state(), ReplayState::Idle);

        let stats = replayer.stats();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.executed, 6);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_lifecycle_misuse() {
        let clock = Arc::new(ManualClock::new());
        let sink = RecordingSink::new(clock.clone());
        let mut replayer = Replayer::new(keys(2, MS), sink, ReplayConfig::default()).with_clock(clock);

        assert!(matches!(replayer.stop(), Err(Error::NotRunning(_))));
        assert!(matches!(replayer.wait(), Err(Error::NotRunning(_))));

        replayer.start().unwrap();
        replayer.wait().unwrap();
        // A finished run can be started again.
        replayer.start().unwrap();
        replayer.stop().unwrap();
        assert_eq!(replayer.state(), ReplayState::Idle);
    }

    #[test]
    fn test_start_while_running_is_rejected() {
        let sink = RecordingSink::new(MonotonicClock::shared());
        let sequence = EventSequence::from_events(vec![Event::key_press("'a'", Duration::from_secs(5))]);
        let mut replayer = Replayer::new(sequence, sink, ReplayConfig::default());

        replayer.start().unwrap();
        assert!(matches!(replayer.start(), Err(Error::AlreadyRunning(_))));
        assert!(replayer.is_running());
        replayer.stop().unwrap();
        assert!(!replayer.is_running());
    }

    #[test]
    fn test_stop_during_long_wait_returns_promptly() {
        let sink = RecordingSink::new(MonotonicClock::shared());
        let calls = sink.calls();
        let sequence = EventSequence::from_events(vec![
            Event::key_press("'a'", Duration::ZERO),
            Event::key_release("'a'", Duration::from_secs(10)),
        ]);
        let mut replayer = Replayer::new(sequence, sink, ReplayConfig::default());

        replayer.start().unwrap();
        thread::sleep(MS * 50);

        let started = Instant::now();
        replayer.stop().unwrap();
        assert!(started.elapsed() < MS * 100, "stop took {:?}", started.elapsed());

        let calls = calls.take();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].event().is_some());
        assert!(matches!(calls[1], SinkCall::Close { .. }));
        assert_eq!(replayer.stats().executed, 1);
    }

    #[test]
    fn test_zero_passes_injects_nothing() {
        let clock = Arc::new(ManualClock::new());
        let sink = RecordingSink::new(clock.clone());
        let calls = sink.calls();
        let mut replayer =
            Replayer::new(keys(2, MS), sink, ReplayConfig::default().with_passes(0))
                .with_clock(clock);

        replayer.start().unwrap();
        replayer.wait().unwrap();

        assert!(calls.is_empty());
        let stats = replayer.stats();
        assert_eq!(stats.passes, 0);
        assert_eq!(stats.executed, 0);
        assert_eq!(replayer.state(), ReplayState::Idle);
    }

    #[test]
    fn test_token_cancelled_before_start_only_cleans_up() {
        let clock = Arc::new(ManualClock::new());
        let sink = RecordingSink::new(clock.clone());
        let calls = sink.calls();
        let mut replayer =
            Replayer::new(keys(4, MS), sink, ReplayConfig::default().with_repeat(true))
                .with_clock(clock);

        let cancel = CancelToken::new();
        cancel.cancel();
        replayer.start_with_cancel(cancel).unwrap();
        replayer.wait().unwrap();

        let calls = calls.take();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], SinkCall::Close { .. }));
        assert_eq!(replayer.stats().passes, 1);
    }

    #[test]
    fn test_external_token_stops_run() {
        let sink = RecordingSink::new(MonotonicClock::shared());
        let mut replayer =
            Replayer::new(keys(2, MS), sink, ReplayConfig::default().with_repeat(true));

        let cancel = CancelToken::new();
        replayer.start_with_cancel(cancel.clone()).unwrap();
        thread::sleep(MS * 10);
        cancel.cancel();
        replayer.wait().unwrap();
        assert!(!replayer.is_running());
    }

    #[test]
    fn test_failed_event_is_skipped_and_cleanup_runs() {
        let clock = Arc::new(ManualClock::new());
        let sink = RecordingSink::new(clock.clone()).failing_input("'bad'");
        let calls = sink.calls();
        let sequence = EventSequence::from_events(vec![
            Event::key_press("'a'", MS),
            Event::key_press("'bad'", MS),
            Event::key_release("'a'", MS),
        ]);
        let mut replayer = Replayer::new(sequence, sink, ReplayConfig::default()).with_clock(clock);

        replayer.start().unwrap();
        replayer.wait().unwrap();

        let calls = calls.take();
        assert_eq!(calls.iter().filter(|c| c.event().is_some()).count(), 2);
        assert!(matches!(calls.last(), Some(SinkCall::Close { .. })));

        let stats = replayer.stats();
        assert_eq!(stats.executed, 2);
        assert_eq!(stats.failed, 1);
        assert!(stats.last_error.unwrap().contains("'bad'"));
    }

    #[test]
    fn test_each_pass_closes_the_sink() {
        let clock = Arc::new(ManualClock::new());
        let sink = RecordingSink::new(clock.clone());
        let calls = sink.calls();
        let mut replayer =
            Replayer::new(keys(2, MS * 5), sink, ReplayConfig::default().with_passes(3))
                .with_clock(clock);

        replayer.start().unwrap();
        replayer.wait().unwrap();

        let calls = calls.take();
        let closes = calls.iter().filter(|c| matches!(c, SinkCall::Close { .. })).count();
        assert_eq!(closes, 3);
        assert_eq!(calls.len(), 9);
        assert_eq!(replayer.stats().passes, 3);
    }

    #[test]
    fn test_empty_sequence_closes_once() {
        let clock = Arc::new(ManualClock::new());
        let sink = RecordingSink::new(clock.clone());
        let calls = sink.calls();
        let mut replayer = Replayer::new(
            EventSequence::default(),
            sink,
            ReplayConfig::default().with_repeat(true),
        )
        .with_clock(clock);

        replayer.start().unwrap();
        replayer.wait().unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(replayer.stats().passes, 1);
    }

    #[test]
    fn test_residual_carries_into_next_pass() {
        let clock = Arc::new(ManualClock::new());
        // Each execute costs 3ms; the last one overruns the pass by that much.
        let sink = RecordingSink::new(clock.clone()).with_cost(MS * 3);
        let calls = sink.calls();
        let mut replayer =
            Replayer::new(keys(10, MS * 100), sink, ReplayConfig::default().with_passes(3))
                .with_clock(clock);

        replayer.start().unwrap();
        replayer.wait().unwrap();

        let first_of_pass: Vec<Duration> = calls
            .take()
            .split(|c| matches!(c, SinkCall::Close { .. }))
            .filter_map(|pass| pass.first().map(SinkCall::at))
            .collect();

        // Pass starts are exactly one nominal pass (1s) apart, not 1s + 3ms.
        assert_eq!(first_of_pass, vec![MS * 100, MS * 1100, MS * 2100]);
        assert_eq!(replayer.stats().last_residual, MS * 3);
    }

    #[test]
    fn test_events_never_fire_early() {
        let clock = Arc::new(ManualClock::new());
        let sink = RecordingSink::new(clock.clone());
        let calls = sink.calls();
        let sequence = EventSequence::from_events(vec![
            Event::pointer_move(Point::new(0, 0), Duration::ZERO),
            Event::key_press("'a'", MS * 7),
            Event::key_release("'a'", MS * 33),
            Event::key_press("'b'", Duration::ZERO),
            Event::key_release("'b'", MS * 250),
        ]);
        let mut replayer =
            Replayer::new(sequence.clone(), sink, ReplayConfig::default()).with_clock(clock);

        replayer.start().unwrap();
        replayer.wait().unwrap();

        let mut cumulative = Duration::ZERO;
        for (event, call) in sequence.iter().zip(calls.take()) {
            cumulative += event.delay();
            assert!(call.at() >= cumulative, "{call:?} fired before {cumulative:?}");
            assert!(call.at() < cumulative + MS);
        }
    }

    #[test]
    fn test_speed_shortens_waits() {
        let clock = Arc::new(ManualClock::new());
        let sink = RecordingSink::new(clock.clone());
        let calls = sink.calls();
        let mut replayer =
            Replayer::new(keys(2, MS * 100), sink, ReplayConfig::default().with_speed(4.0))
                .with_clock(clock);

        replayer.start().unwrap();
        replayer.wait().unwrap();

        let times: Vec<_> = calls.take().iter().filter(|c| c.event().is_some()).map(SinkCall::at).collect();
        assert_eq!(times, vec![MS * 25, MS * 50]);
    }

    #[test]
    fn test_stop_forever_releases_input() {
        let sink = CleanupSink::new(RecordingSink::new(MonotonicClock::shared()));
        let calls = sink.inner().calls();
        let mut replayer = Replayer::new(keys(2, MS * 2), sink, ReplayConfig::default().with_repeat(true));

        replayer.start().unwrap();
        thread::sleep(MS * 30);
        replayer.stop().unwrap();

        assert!(replayer.sink().held().is_empty());
        assert!(replayer.stats().passes >= 1);
        let after_stop = calls.len();
        thread::sleep(MS * 20);
        assert_eq!(calls.len(), after_stop);
        assert!(matches!(calls.snapshot().last(), Some(SinkCall::Close { .. })));
    }

    #[test]
    fn test_drop_stops_background_run() {
        let sink = RecordingSink::new(MonotonicClock::shared());
        let calls = sink.calls();
        {
            let mut replayer =
                Replayer::new(keys(2, MS), sink, ReplayConfig::default().with_repeat(true));
            replayer.start().unwrap();
            thread::sleep(MS * 10);
        }
        let after_drop = calls.len();
        thread::sleep(MS * 20);
        assert_eq!(calls.len(), after_drop);
    }
}
