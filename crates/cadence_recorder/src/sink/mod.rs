//! Execution layer: turning events into injected input.
//!
//! The layer is split in two:
//! - [`InputBackend`] - the injection primitives of one platform library
//!   (absolute pointer placement, buttons, scroll, keys).
//! - [`InputSink`] - something that executes whole [`Event`]s and can be
//!   closed. [`BackendSink`] adapts a backend, [`CompositeSink`] routes
//!   pointer and key events to different sinks, and [`CleanupSink`] tracks
//!   what is held down so `close` can release it.
//!
//! A typical stack is
//! `CleanupSink<CompositeSink<BackendSink<A>, BackendSink<B>>>`.

mod backend;
mod cleanup;
mod composite;
mod log;

pub use backend::BackendSink;
pub use cleanup::{CleanupSink, HeldInput, HeldInputSet, SAFETY_MODIFIERS};
pub use composite::CompositeSink;
pub use log::LogBackend;

use crate::event::{Event, InputId, Point, ScrollDelta};
use crate::Result;

/// Executes events against real or simulated input hardware.
pub trait InputSink: Send {
    /// Perform the action implied by the event's kind.
    fn execute(&mut self, event: &Event) -> Result<()>;

    /// End the session, releasing anything this sink is responsible for.
    fn close(&mut self) -> Result<()>;
}

impl<S: InputSink + ?Sized> InputSink for Box<S> {
    fn execute(&mut self, event: &Event) -> Result<()> {
        (**self).execute(event)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// What a backend can express.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub vertical_scroll: bool,
    pub horizontal_scroll: bool,
}

impl Capabilities {
    /// Every action supported.
    pub const fn full() -> Self {
        Self {
            vertical_scroll: true,
            horizontal_scroll: true,
        }
    }

    /// Scroll only along the vertical axis.
    pub const fn vertical_scroll_only() -> Self {
        Self {
            vertical_scroll: true,
            horizontal_scroll: false,
        }
    }

    /// No scroll support at all.
    pub const fn no_scroll() -> Self {
        Self {
            vertical_scroll: false,
            horizontal_scroll: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// Platform input-injection primitives.
///
/// Buttons and keys are addressed by their recorded identifier; backends
/// translate them with [`InputId::button_name`] / [`InputId::key_name`].
pub trait InputBackend: Send {
    /// Place the pointer at an absolute position.
    fn move_to(&mut self, position: Point) -> Result<()>;

    fn button_down(&mut self, button: &InputId) -> Result<()>;

    fn button_up(&mut self, button: &InputId) -> Result<()>;

    /// Scroll by a delta. Only called with axes the backend supports.
    fn scroll(&mut self, delta: ScrollDelta) -> Result<()>;

    fn key_down(&mut self, key: &InputId) -> Result<()>;

    fn key_up(&mut self, key: &InputId) -> Result<()>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    /// Release backend resources. Called once when the owning sink closes.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
