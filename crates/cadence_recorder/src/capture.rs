//! Live input capture.
//!
//! The [`Recorder`] subscribes to an [`InputSource`], stamps every
//! notification with the monotonic time since the previous one and collects
//! the result into an [`EventSequence`].

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{MonotonicClock, SharedClock};
use crate::event::{Event, EventSequence, InputId, Point, ScrollDelta};
use crate::{Error, Result};

/// A notification delivered by an input observation backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputNotification {
    PointerMoved {
        position: Point,
    },
    PointerButton {
        position: Point,
        button: InputId,
        pressed: bool,
    },
    PointerScrolled {
        position: Point,
        delta: ScrollDelta,
    },
    KeyPressed {
        key: InputId,
    },
    KeyReleased {
        key: InputId,
    },
}

impl InputNotification {
    /// Button or key named by the notification.
    pub fn input(&self) -> Option<&InputId> {
        match self {
            Self::PointerButton { button, .. } => Some(button),
            Self::KeyPressed { key } | Self::KeyReleased { key } => Some(key),
            Self::PointerMoved { .. } | Self::PointerScrolled { .. } => None,
        }
    }

    fn into_event(self, delay: Duration) -> Event {
        match self {
            Self::PointerMoved { position } => Event::pointer_move(position, delay),
            Self::PointerButton {
                position,
                button,
                pressed: true,
            } => Event::button_press(button, position, delay),
            Self::PointerButton {
                position,
                button,
                pressed: false,
            } => Event::button_release(button, position, delay),
            Self::PointerScrolled { position, delta } => Event::scroll(position, delta, delay),
            Self::KeyPressed { key } => Event::key_press(key, delay),
            Self::KeyReleased { key } => Event::key_release(key, delay),
        }
    }
}

/// Callback an [`InputSource`] invokes for each notification, possibly from
/// its own delivery threads.
pub type NotificationHandler = Arc<dyn Fn(InputNotification) + Send + Sync>;

/// Platform input observation.
pub trait InputSource: Send {
    /// Current pointer position.
    fn cursor_position(&self) -> Result<Point>;

    /// Start delivering notifications to `handler`.
    fn subscribe(&mut self, handler: NotificationHandler) -> Result<()>;

    /// Stop delivering notifications.
    fn unsubscribe(&mut self) -> Result<()>;
}

/// Recorder configuration.
#[derive(Clone, Debug, Default)]
pub struct RecorderConfig {
    /// Identifiers never captured, e.g. the hotkeys that start and stop
    /// recording.
    pub ignore: HashSet<InputId>,
}

impl RecorderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add identifiers to the ignore set.
    pub fn with_ignored<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<InputId>,
    {
        self.ignore.extend(ids.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Default)]
struct Capture {
    active: bool,
    /// Clock reading of the previously captured event.
    last: Duration,
    events: Vec<Event>,
}

/// Captures live input into an [`EventSequence`].
pub struct Recorder<S> {
    source: S,
    ignore: Arc<HashSet<InputId>>,
    clock: SharedClock,
    capture: Arc<Mutex<Capture>>,
}

impl<S: InputSource> Recorder<S> {
    pub fn new(source: S, config: RecorderConfig) -> Self {
        Self {
            source,
            ignore: Arc::new(config.ignore),
            clock: MonotonicClock::shared(),
            capture: Arc::new(Mutex::new(Capture::default())),
        }
    }

    /// Use a different clock for timestamps.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_running(&self) -> bool {
        self.capture.lock().active
    }

    /// Begin capturing.
    ///
    /// Discards anything captured by a previous run and records the current
    /// pointer position as the first event, with zero delay.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::AlreadyRunning("recorder"));
        }

        let origin = self.source.cursor_position()?;
        {
            let mut capture = self.capture.lock();
            capture.events.clear();
            capture.events.push(Event::pointer_move(origin, Duration::ZERO));
            capture.last = self.clock.now();
            capture.active = true;
        }

        if let Err(e) = self.source.subscribe(self.handler()) {
            self.capture.lock().active = false;
            return Err(e);
        }

        tracing::info!(x = origin.x, y = origin.y, "recording started");
        Ok(())
    }

    /// Stop capturing and return what was recorded.
    pub fn stop(&mut self) -> Result<EventSequence> {
        let events = {
            let mut capture = self.capture.lock();
            if !capture.active {
                return Err(Error::NotRunning("recorder"));
            }
            capture.active = false;
            std::mem::take(&mut capture.events)
        };

        // Late notifications are dropped because the capture is inactive,
        // so a failed unsubscribe does not lose or corrupt the recording.
        if let Err(e) = self.source.unsubscribe() {
            tracing::error!(error = %e, "failed to unsubscribe from input source");
        }

        tracing::info!(events = events.len(), "recording stopped");
        Ok(EventSequence::from_events(events))
    }

    /// Events captured so far, without stopping.
    pub fn snapshot(&self) -> EventSequence {
        EventSequence::from_events(self.capture.lock().events.clone())
    }

    fn handler(&self) -> NotificationHandler {
        let capture = Arc::clone(&self.capture);
        let ignore = Arc::clone(&self.ignore);
        let clock = Arc::clone(&self.clock);

        Arc::new(move |notification: InputNotification| {
            if notification.input().is_some_and(|id| ignore.contains(id)) {
                return;
            }
            let mut capture = capture.lock();
            if !capture.active {
                return;
            }
            let now = clock.now();
            let delay = now.saturating_sub(capture.last);
            capture.last = now;
            let event = notification.into_event(delay);
            tracing::trace!(kind = %event.kind(), ?delay, "captured");
            capture.events.push(event);
        })
    }
}
