//! Test doubles for the execution layer.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::SharedClock;
use crate::event::{Event, InputId, Point, ScrollDelta};
use crate::sink::{Capabilities, InputBackend, InputSink};
use crate::{Error, Result};

/// One primitive call received by a [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendCall {
    MoveTo(Point),
    ButtonDown(InputId),
    ButtonUp(InputId),
    Scroll(ScrollDelta),
    KeyDown(InputId),
    KeyUp(InputId),
    Close,
}

/// Shared, clonable log of calls.
#[derive(Debug)]
pub struct CallLog<T>(Arc<Mutex<Vec<T>>>);

impl<T> Clone for CallLog<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Default for CallLog<T> {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }
}

impl<T: Clone> CallLog<T> {
    pub fn push(&self, call: T) {
        self.0.lock().push(call);
    }

    /// Copy of every call so far.
    pub fn snapshot(&self) -> Vec<T> {
        self.0.lock().clone()
    }

    /// Remove and return every call so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.0.lock())
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

/// Backend that records calls instead of injecting input.
///
/// Failed calls are not recorded.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: CallLog<BackendCall>,
    capabilities: Capabilities,
    failing_keys: HashSet<InputId>,
    fail_close: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the call log, usable after the backend is moved into a sink.
    pub fn calls(&self) -> CallLog<BackendCall> {
        self.calls.clone()
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Make `key_down`/`key_up` fail for this identifier.
    pub fn failing_key(mut self, key: impl Into<InputId>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    /// Make `close` fail.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    fn key(&mut self, key: &InputId, call: BackendCall) -> Result<()> {
        if self.failing_keys.contains(key) {
            return Err(Error::Backend(format!("key {key} rejected")));
        }
        self.calls.push(call);
        Ok(())
    }
}

impl InputBackend for RecordingBackend {
    fn move_to(&mut self, position: Point) -> Result<()> {
        self.calls.push(BackendCall::MoveTo(position));
        Ok(())
    }

    fn button_down(&mut self, button: &InputId) -> Result<()> {
        self.calls.push(BackendCall::ButtonDown(button.clone()));
        Ok(())
    }

    fn button_up(&mut self, button: &InputId) -> Result<()> {
        self.calls.push(BackendCall::ButtonUp(button.clone()));
        Ok(())
    }

    fn scroll(&mut self, delta: ScrollDelta) -> Result<()> {
        self.calls.push(BackendCall::Scroll(delta));
        Ok(())
    }

    fn key_down(&mut self, key: &InputId) -> Result<()> {
        self.key(key, BackendCall::KeyDown(key.clone()))
    }

    fn key_up(&mut self, key: &InputId) -> Result<()> {
        self.key(key, BackendCall::KeyUp(key.clone()))
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn close(&mut self) -> Result<()> {
        self.calls.push(BackendCall::Close);
        if self.fail_close {
            return Err(Error::Backend("close rejected".into()));
        }
        Ok(())
    }
}

/// One call received by a [`RecordingSink`], stamped with the clock reading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkCall {
    Execute { event: Event, at: Duration },
    Close { at: Duration },
}

impl SinkCall {
    pub fn at(&self) -> Duration {
        match self {
            Self::Execute { at, .. } | Self::Close { at } => *at,
        }
    }

    pub fn event(&self) -> Option<&Event> {
        match self {
            Self::Execute { event, .. } => Some(event),
            Self::Close { .. } => None,
        }
    }
}

/// Sink that records every call with the time it arrived.
///
/// Optionally simulates execution cost by advancing or sleeping on its
/// clock, and can be told to fail for specific inputs.
#[derive(Debug)]
pub struct RecordingSink {
    clock: SharedClock,
    calls: CallLog<SinkCall>,
    cost: Duration,
    failing_inputs: HashSet<InputId>,
}

impl RecordingSink {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            calls: CallLog::default(),
            cost: Duration::ZERO,
            failing_inputs: HashSet::new(),
        }
    }

    pub fn calls(&self) -> CallLog<SinkCall> {
        self.calls.clone()
    }

    /// Spend `cost` on the clock for every executed event.
    pub fn with_cost(mut self, cost: Duration) -> Self {
        self.cost = cost;
        self
    }

    /// Fail execution of any event naming this input.
    pub fn failing_input(mut self, id: impl Into<InputId>) -> Self {
        self.failing_inputs.insert(id.into());
        self
    }
}

impl InputSink for RecordingSink {
    fn execute(&mut self, event: &Event) -> Result<()> {
        let at = self.clock.now();
        if !self.cost.is_zero() {
            self.clock.sleep(self.cost);
        }
        if let Some(id) = event.input().filter(|id| self.failing_inputs.contains(*id)) {
            return Err(Error::Backend(format!("input {id} rejected")));
        }
        self.calls.push(SinkCall::Execute {
            event: event.clone(),
            at,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.calls.push(SinkCall::Close {
            at: self.clock.now(),
        });
        Ok(())
    }
}
