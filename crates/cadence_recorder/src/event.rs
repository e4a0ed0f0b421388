//! Event data model.
//!
//! An [`Event`] is one input occurrence plus the delay since the previous
//! event of the same sequence. An [`EventSequence`] is the ordered list that
//! gets recorded, saved, loaded and replayed.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Kind of input occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Pointer moved to an absolute position.
    #[serde(rename = "mouse_move")]
    PointerMove,
    /// Pointer button pressed.
    #[serde(rename = "mouse_click")]
    ButtonPress,
    /// Pointer button released.
    #[serde(rename = "mouse_release")]
    ButtonRelease,
    /// Scroll wheel moved.
    #[serde(rename = "mouse_scroll")]
    ScrollMoved,
    /// Keyboard key pressed.
    #[serde(rename = "key_press")]
    KeyPress,
    /// Keyboard key released.
    #[serde(rename = "key_release")]
    KeyRelease,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [EventKind; 6] = [
        EventKind::PointerMove,
        EventKind::ButtonPress,
        EventKind::ButtonRelease,
        EventKind::ScrollMoved,
        EventKind::KeyPress,
        EventKind::KeyRelease,
    ];

    /// Check if this kind is handled by the pointer device.
    pub fn is_pointer(self) -> bool {
        matches!(
            self,
            Self::PointerMove | Self::ButtonPress | Self::ButtonRelease | Self::ScrollMoved
        )
    }

    /// Check if this kind is handled by the keyboard.
    pub fn is_key(self) -> bool {
        matches!(self, Self::KeyPress | Self::KeyRelease)
    }

    /// Check if this kind puts an input into the pressed state.
    pub fn is_press(self) -> bool {
        matches!(self, Self::ButtonPress | Self::KeyPress)
    }

    /// Check if this kind takes an input out of the pressed state.
    pub fn is_release(self) -> bool {
        matches!(self, Self::ButtonRelease | Self::KeyRelease)
    }

    fn needs_position(self) -> bool {
        self.is_pointer()
    }

    fn needs_delta(self) -> bool {
        self == Self::ScrollMoved
    }

    fn needs_input(self) -> bool {
        self.is_press() || self.is_release()
    }

    /// Name used in the persisted format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PointerMove => "mouse_move",
            Self::ButtonPress => "mouse_click",
            Self::ButtonRelease => "mouse_release",
            Self::ScrollMoved => "mouse_scroll",
            Self::KeyPress => "key_press",
            Self::KeyRelease => "key_release",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absolute screen coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Create a point from screen coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<[i32; 2]> for Point {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [i32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Signed scroll amount on both axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct ScrollDelta {
    pub dx: i32,
    pub dy: i32,
}

impl ScrollDelta {
    /// Create a delta from horizontal and vertical steps.
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

impl From<[i32; 2]> for ScrollDelta {
    fn from([dx, dy]: [i32; 2]) -> Self {
        Self { dx, dy }
    }
}

impl From<ScrollDelta> for [i32; 2] {
    fn from(d: ScrollDelta) -> Self {
        [d.dx, d.dy]
    }
}

/// Symbolic identifier of a physical button or key.
///
/// The token is opaque to the engine. Recorded identifiers look like
/// `Button.left`, `Key.shift` or `'d'`; backends use [`InputId::key_name`]
/// and [`InputId::button_name`] to get the bare name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputId(String);

impl InputId {
    /// Wrap an identifier token such as `Key.shift` or `'d'`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key name without the `Key.` prefix or character quotes.
    ///
    /// `Key.shift` becomes `shift`, `'d'` becomes `d`.
    pub fn key_name(&self) -> &str {
        let name = self.0.strip_prefix("Key.").unwrap_or(&self.0);
        match name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')) {
            Some(inner) if !inner.is_empty() => inner,
            _ => name,
        }
    }

    /// Button name without the `Button.` prefix.
    pub fn button_name(&self) -> &str {
        self.0.strip_prefix("Button.").unwrap_or(&self.0)
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InputId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for InputId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One recorded input occurrence.
///
/// Only the fields relevant to [`Event::kind`] are populated. The typed
/// constructors always produce a well-formed event; [`Event::from_parts`]
/// validates events built from untrusted data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    position: Option<Point>,
    delta: Option<ScrollDelta>,
    input: Option<InputId>,
    delay: Duration,
}

impl Event {
    /// Pointer moved to `position`.
    pub fn pointer_move(position: Point, delay: Duration) -> Self {
        Self {
            kind: EventKind::PointerMove,
            position: Some(position),
            delta: None,
            input: None,
            delay,
        }
    }

    /// Button pressed at `position`.
    pub fn button_press(button: impl Into<InputId>, position: Point, delay: Duration) -> Self {
        Self::button(EventKind::ButtonPress, button.into(), position, delay)
    }

    /// Button released at `position`.
    pub fn button_release(button: impl Into<InputId>, position: Point, delay: Duration) -> Self {
        Self::button(EventKind::ButtonRelease, button.into(), position, delay)
    }

    fn button(kind: EventKind, button: InputId, position: Point, delay: Duration) -> Self {
        Self {
            kind,
            position: Some(position),
            delta: None,
            input: Some(button),
            delay,
        }
    }

    /// Scroll by `delta` with the pointer at `position`.
    pub fn scroll(position: Point, delta: ScrollDelta, delay: Duration) -> Self {
        Self {
            kind: EventKind::ScrollMoved,
            position: Some(position),
            delta: Some(delta),
            input: None,
            delay,
        }
    }

    /// Key pressed.
    pub fn key_press(key: impl Into<InputId>, delay: Duration) -> Self {
        Self::key(EventKind::KeyPress, key.into(), delay)
    }

    /// Key released.
    pub fn key_release(key: impl Into<InputId>, delay: Duration) -> Self {
        Self::key(EventKind::KeyRelease, key.into(), delay)
    }

    fn key(kind: EventKind, key: InputId, delay: Duration) -> Self {
        Self {
            kind,
            position: None,
            delta: None,
            input: Some(key),
            delay,
        }
    }

    /// Build an event from raw parts, rejecting combinations that do not
    /// match `kind`.
    pub fn from_parts(
        kind: EventKind,
        position: Option<Point>,
        delta: Option<ScrollDelta>,
        input: Option<InputId>,
        delay: Duration,
    ) -> Result<Self> {
        let event = Self {
            kind,
            position,
            delta,
            input,
            delay,
        };
        event.validate()?;
        Ok(event)
    }

    /// Build an event without validation, for exercising error paths.
    #[cfg(test)]
    pub(crate) fn unchecked(
        kind: EventKind,
        position: Option<Point>,
        delta: Option<ScrollDelta>,
        input: Option<InputId>,
    ) -> Self {
        Self {
            kind,
            position,
            delta,
            input,
            delay: Duration::ZERO,
        }
    }

    /// Check that exactly the fields required by the kind are present.
    pub fn validate(&self) -> Result<()> {
        check_field(self.kind, "position", self.kind.needs_position(), self.position.is_some())?;
        check_field(self.kind, "delta", self.kind.needs_delta(), self.delta.is_some())?;
        check_field(self.kind, "button", self.kind.needs_input(), self.input.is_some())?;
        Ok(())
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn delta(&self) -> Option<ScrollDelta> {
        self.delta
    }

    /// Button or key this event names.
    pub fn input(&self) -> Option<&InputId> {
        self.input.as_ref()
    }

    /// Time elapsed since the previous event was recorded.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Copy of this event with a different delay.
    pub fn with_delay(&self, delay: Duration) -> Self {
        Self {
            delay,
            ..self.clone()
        }
    }
}

fn check_field(kind: EventKind, field: &str, required: bool, present: bool) -> Result<()> {
    match (required, present) {
        (true, false) => Err(Error::InvalidEvent(format!("{kind} event requires `{field}`"))),
        (false, true) => Err(Error::InvalidEvent(format!("{kind} event must not carry `{field}`"))),
        _ => Ok(()),
    }
}

/// Ordered list of events forming one macro.
///
/// Insertion order is temporal order and replay order. The sequence is
/// never mutated once built.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventSequence {
    events: Vec<Event>,
}

impl EventSequence {
    /// Create a sequence from events already in temporal order.
    pub fn from_events(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sum of all event delays, the nominal length of one pass.
    pub fn total_delay(&self) -> Duration {
        self.events.iter().map(Event::delay).sum()
    }

    /// Compute summary statistics.
    pub fn stats(&self) -> SequenceStats {
        let mut stats = SequenceStats {
            total_events: self.events.len(),
            duration: self.total_delay(),
            ..Default::default()
        };
        let mut held = BTreeSet::new();

        for event in &self.events {
            match event.kind {
                EventKind::PointerMove => stats.pointer_moves += 1,
                EventKind::ButtonPress | EventKind::ButtonRelease => stats.button_events += 1,
                EventKind::ScrollMoved => stats.scrolls += 1,
                EventKind::KeyPress | EventKind::KeyRelease => stats.key_events += 1,
            }
            if let Some(input) = &event.input {
                if event.kind.is_press() {
                    held.insert(input.clone());
                } else if event.kind.is_release() {
                    held.remove(input);
                }
            }
        }

        stats.unbalanced_presses = held.into_iter().collect();
        stats
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl From<Vec<Event>> for EventSequence {
    fn from(events: Vec<Event>) -> Self {
        Self::from_events(events)
    }
}

impl<'a> IntoIterator for &'a EventSequence {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Summary of a sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceStats {
    pub total_events: usize,
    pub pointer_moves: usize,
    pub button_events: usize,
    pub scrolls: usize,
    pub key_events: usize,
    /// Nominal replay length of one pass.
    pub duration: Duration,
    /// Inputs pressed and never released by the end of the sequence.
    pub unbalanced_presses: Vec<InputId>,
}
