//! Replay engine for recorded sequences.
//!
//! This module provides:
//! - `Ticker` - Drift-correcting pacing against absolute deadlines
//! - `CancelToken` - Cooperative stop signal checked while waiting
//! - `Replayer` - Background playback with looping and per-pass cleanup
//!
//! # Example
//!
//! ```ignore
//! use cadence_recorder::replay::{ReplayConfig, Replayer};
//!
//! let sequence = EventSequence::load("macro.json")?;
//! let sink = CleanupSink::new(BackendSink::new(backend));
//! let mut replayer = Replayer::new(sequence, sink, ReplayConfig::default().with_speed(2.0));
//!
//! replayer.start()?;
//! // ...
//! replayer.stop()?;
//! ```

mod cancel;
mod player;
mod ticker;

pub use cancel::CancelToken;
pub use player::{Repeat, ReplayConfig, ReplayState, ReplayStats, Replayer};
pub use ticker::{clamp_speed, Tick, Ticker, MAX_SLEEP, MAX_SPEED, MIN_SPEED, SPIN_THRESHOLD};
