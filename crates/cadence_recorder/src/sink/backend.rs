//! Adapter from events to backend calls.

use super::{InputBackend, InputSink};
use crate::event::{Event, EventKind, InputId, Point, ScrollDelta};
use crate::{Error, Result};

/// Executes events by calling the primitives of one [`InputBackend`].
pub struct BackendSink<B> {
    backend: B,
    /// Scrolls that lost an axis the backend cannot apply.
    degraded_scrolls: u64,
}

impl<B: InputBackend> BackendSink<B> {
    /// Wrap a backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            degraded_scrolls: 0,
        }
    }

    /// Number of scrolls reduced to the backend's supported axes so far.
    pub fn degraded_scrolls(&self) -> u64 {
        self.degraded_scrolls
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    fn scroll(&mut self, delta: ScrollDelta) -> Result<()> {
        let caps = self.backend.capabilities();
        let applied = ScrollDelta {
            dx: if caps.horizontal_scroll { delta.dx } else { 0 },
            dy: if caps.vertical_scroll { delta.dy } else { 0 },
        };

        if applied != delta {
            self.degraded_scrolls += 1;
            let gap = Error::UnsupportedCapability(format!(
                "scroll {:?} reduced to {:?} by backend",
                delta, applied
            ));
            if self.degraded_scrolls == 1 {
                tracing::warn!(error = %gap, "applying supported scroll axes only");
            } else {
                tracing::debug!(error = %gap, degraded = self.degraded_scrolls, "scroll degraded");
            }
        }

        if applied == ScrollDelta::default() {
            return Ok(());
        }
        self.backend.scroll(applied)
    }
}

impl<B: InputBackend> InputSink for BackendSink<B> {
    fn execute(&mut self, event: &Event) -> Result<()> {
        event.validate()?;

        match event.kind() {
            EventKind::PointerMove => self.backend.move_to(position(event)?),
            EventKind::ButtonPress => {
                self.backend.move_to(position(event)?)?;
                self.backend.button_down(input(event)?)
            }
            EventKind::ButtonRelease => {
                self.backend.move_to(position(event)?)?;
                self.backend.button_up(input(event)?)
            }
            EventKind::ScrollMoved => {
                let delta = event
                    .delta()
                    .ok_or_else(|| Error::InvalidEvent("scroll event without delta".into()))?;
                self.scroll(delta)
            }
            EventKind::KeyPress => self.backend.key_down(input(event)?),
            EventKind::KeyRelease => self.backend.key_up(input(event)?),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.backend.close()
    }
}

fn position(event: &Event) -> Result<Point> {
    event
        .position()
        .ok_or_else(|| Error::InvalidEvent(format!("{} event without position", event.kind())))
}

fn input(event: &Event) -> Result<&InputId> {
    event
        .input()
        .ok_or_else(|| Error::InvalidEvent(format!("{} event without button", event.kind())))
}
