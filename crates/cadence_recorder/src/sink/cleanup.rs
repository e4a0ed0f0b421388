//! Held-input tracking and forced release.
//!
//! [`CleanupSink`] wraps any sink, remembers which buttons and keys the
//! session has pressed, and on `close` releases all of them plus a fixed set
//! of modifier keys. A recording that started with a modifier already down
//! (or ended with one still down) therefore never leaves it stuck.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use std::time::Duration;

use super::InputSink;
use crate::event::{Event, EventKind, InputId, Point};
use crate::{Error, Result};

/// Modifier keys released on every close whether or not they were pressed.
pub const SAFETY_MODIFIERS: [&str; 4] = ["Key.ctrl", "Key.shift", "Key.alt", "Key.cmd"];

/// An input currently in the pressed state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeldInput {
    Key,
    /// Pointer button, with the position it was last pressed at.
    Button(Point),
}

/// Buttons and keys pressed during one session and not yet released.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeldInputSet {
    inputs: BTreeMap<InputId, HeldInput>,
}

impl HeldInputSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn contains(&self, id: &InputId) -> bool {
        self.inputs.contains_key(id)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, InputId, HeldInput> {
        self.inputs.iter()
    }

    /// Update the set from an event. Non press/release events are ignored.
    pub fn track(&mut self, event: &Event) {
        let Some(id) = event.input() else {
            return;
        };
        match event.kind() {
            EventKind::KeyPress => {
                self.inputs.insert(id.clone(), HeldInput::Key);
            }
            EventKind::ButtonPress => {
                let position = event.position().unwrap_or_default();
                self.inputs.insert(id.clone(), HeldInput::Button(position));
            }
            EventKind::KeyRelease | EventKind::ButtonRelease => {
                self.inputs.remove(id);
            }
            EventKind::PointerMove | EventKind::ScrollMoved => {}
        }
    }

    /// Remove every entry, returning the release event for each.
    pub fn drain_releases(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.inputs)
            .into_iter()
            .map(|(id, held)| match held {
                HeldInput::Key => Event::key_release(id, Duration::ZERO),
                HeldInput::Button(position) => Event::button_release(id, position, Duration::ZERO),
            })
            .collect()
    }
}

/// Sink decorator that guarantees nothing is left pressed after `close`.
pub struct CleanupSink<S> {
    inner: S,
    held: HeldInputSet,
}

impl<S: InputSink> CleanupSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            held: HeldInputSet::new(),
        }
    }

    /// Inputs currently held by this session.
    pub fn held(&self) -> &HeldInputSet {
        &self.held
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn release(&mut self, event: &Event, first_error: &mut Option<Error>) {
        if let Err(e) = self.inner.execute(event) {
            tracing::warn!(
                input = %event.input().map(InputId::as_str).unwrap_or_default(),
                error = %e,
                "failed to release input"
            );
            first_error.get_or_insert(e);
        }
    }
}

impl<S: InputSink> InputSink for CleanupSink<S> {
    fn execute(&mut self, event: &Event) -> Result<()> {
        let result = self.inner.execute(event);
        // A press that failed half-way may still have gone down, so it is
        // tracked either way; a release only counts once it succeeded.
        if result.is_ok() || event.kind().is_press() {
            self.held.track(event);
        }
        result
    }

    /// Release held inputs and the safety modifiers, then close the inner
    /// sink. Every step is attempted; the first failure is returned.
    fn close(&mut self) -> Result<()> {
        let mut first_error = None;
        let mut released = BTreeSet::new();

        for event in self.held.drain_releases() {
            self.release(&event, &mut first_error);
            if let Some(id) = event.input() {
                released.insert(id.clone());
            }
        }

        for modifier in SAFETY_MODIFIERS {
            let id = InputId::from(modifier);
            if !released.contains(&id) {
                self.release(&Event::key_release(id, Duration::ZERO), &mut first_error);
            }
        }

        if let Err(e) = self.inner.close() {
            tracing::warn!(error = %e, "failed to close input sink");
            first_error.get_or_insert(e);
        }

        if released.is_empty() {
            tracing::debug!("input session closed");
        } else {
            tracing::debug!(released = released.len(), "input session closed, released held inputs");
        }

        first_error.map_or(Ok(()), Err)
    }
}
