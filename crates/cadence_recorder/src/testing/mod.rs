//! Test doubles for the engine's collaborators.
//!
//! Provides:
//! - `ManualClock` - Deterministic time that only moves when told to
//! - `RecordingBackend` / `RecordingSink` - Capture injected input instead of
//!   sending it to real devices
//! - `ScriptedSource` - Feed input notifications to a `Recorder` by hand

mod backend;
mod clock;
mod source;

pub use backend::{BackendCall, CallLog, RecordingBackend, RecordingSink, SinkCall};
pub use clock::{ManualClock, DEFAULT_SPIN_STEP};
pub use source::{ScriptedSource, SourceHandle};
