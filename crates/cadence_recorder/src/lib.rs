//! Cadence Recorder
//!
//! Record keyboard and pointer input with its timing and replay it later.
//!
//! # Features
//!
//! - **Recording**: Timestamps notifications from an input source into an
//!   ordered sequence of events
//! - **Persistence**: Sequences are stored as a JSON array of event records
//! - **Replay**: A drift-correcting ticker paces execution against absolute
//!   deadlines, with looping and cooperative cancellation
//! - **Cleanup**: Everything pressed during a pass is released when the pass
//!   ends, however it ends

pub mod capture;
pub mod clock;
pub mod error;
pub mod event;
pub mod persist;
pub mod replay;
pub mod sink;
pub mod testing;

pub use capture::{InputNotification, InputSource, NotificationHandler, Recorder, RecorderConfig};
pub use clock::{Clock, MonotonicClock, SharedClock};
pub use error::{Error, Result};
pub use event::{Event, EventKind, EventSequence, InputId, Point, ScrollDelta, SequenceStats};
pub use replay::{CancelToken, Repeat, ReplayConfig, ReplayState, ReplayStats, Replayer};
pub use sink::{
    BackendSink, Capabilities, CleanupSink, CompositeSink, InputBackend, InputSink, LogBackend,
};
