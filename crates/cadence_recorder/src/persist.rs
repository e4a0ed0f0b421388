//! JSON persistence for event sequences.
//!
//! A sequence is stored as an array of objects:
//!
//! ```json
//! [
//!     { "event_type": "mouse_move", "position": [10, 10], "delta": null, "button": null, "when": 0.0 },
//!     { "event_type": "key_press", "position": null, "delta": null, "button": "'d'", "when": 0.1 }
//! ]
//! ```
//!
//! `when` is the delay since the previous event, in seconds.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind, EventSequence, InputId, Point, ScrollDelta};
use crate::{Error, Result};

/// Wire form of one event.
#[derive(Debug, Serialize, Deserialize)]
struct EventRecord {
    event_type: EventKind,
    position: Option<Point>,
    delta: Option<ScrollDelta>,
    button: Option<InputId>,
    when: f64,
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        Self {
            event_type: event.kind(),
            position: event.position(),
            delta: event.delta(),
            button: event.input().cloned(),
            when: event.delay().as_secs_f64(),
        }
    }
}

impl EventRecord {
    fn into_event(self, index: usize) -> Result<Event> {
        let delay = seconds_to_duration(self.when)
            .map_err(|reason| Error::Persistence(format!("event {index}: {reason}")))?;
        Event::from_parts(self.event_type, self.position, self.delta, self.button, delay)
            .map_err(|e| Error::Persistence(format!("event {index}: {e}")))
    }
}

/// Convert seconds to a duration, rounding to the nearest nanosecond.
///
/// Rounding (rather than truncating) makes encode/decode lossless for any
/// delay a recording can realistically hold.
fn seconds_to_duration(secs: f64) -> std::result::Result<Duration, String> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("`when` must be a non-negative number of seconds, got {secs}"));
    }
    let nanos = (secs * 1e9).round();
    if nanos > u64::MAX as f64 {
        return Err(format!("`when` is out of range: {secs}"));
    }
    Ok(Duration::from_nanos(nanos as u64))
}

impl EventSequence {
    /// Encode the sequence as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        let records: Vec<EventRecord> = self.iter().map(EventRecord::from).collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Decode a sequence from JSON.
    ///
    /// Either every event decodes and validates, or an error is returned and
    /// nothing is produced.
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<EventRecord> = serde_json::from_str(json)
            .map_err(|e| Error::Persistence(format!("malformed sequence: {e}")))?;
        let events = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_event(index))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_events(events))
    }

    /// Write the sequence to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), events = self.len(), "saved sequence");
        Ok(())
    }

    /// Read a sequence from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let sequence = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), events = sequence.len(), "loaded sequence");
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EventSequence {
        EventSequence::from_events(vec![
            Event::pointer_move(Point::new(10, 10), Duration::ZERO),
            Event::button_press("Button.left", Point::new(10, 10), Duration::from_millis(100)),
            Event::button_release("Button.left", Point::new(10, 10), Duration::from_millis(100)),
            Event::scroll(Point::new(10, 10), ScrollDelta::new(-1, 3), Duration::from_micros(16_667)),
            Event::key_press("'d'", Duration::from_nanos(123_456_789)),
            Event::key_release("'d'", Duration::from_secs(2)),
        ])
    }

    #[test]
    fn test_round_trip() {
        let sequence = sample();
        let decoded = EventSequence::from_json(&sequence.to_json().unwrap()).unwrap();
        assert_eq!(decoded, sequence);
    }

    #[test]
    fn test_wire_field_names() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let first = &value[0];
        assert_eq!(first["event_type"], "mouse_move");
        assert_eq!(first["position"], serde_json::json!([10, 10]));
        assert!(first["delta"].is_null());
        assert!(first["button"].is_null());
        assert_eq!(first["when"], 0.0);

        let key = &value[4];
        assert_eq!(key["event_type"], "key_press");
        assert!(key["position"].is_null());
        assert_eq!(key["button"], "'d'");
    }

    #[test]
    fn test_decode_recorded_file() {
        let json = r#"[
            {"event_type": "mouse_move", "position": [300, 300], "delta": null, "button": null, "when": 0},
            {"event_type": "mouse_click", "position": [300, 300], "delta": null, "button": "Button.left", "when": 0.1},
            {"event_type": "mouse_scroll", "position": [300, 300], "delta": [0, -1], "button": null, "when": 0.25}
        ]"#;
        let sequence = EventSequence::from_json(json).unwrap();
        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence.events()[1].delay(), Duration::from_millis(100));
        assert_eq!(sequence.events()[2].delta(), Some(ScrollDelta::new(0, -1)));
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let json = r#"[{"event_type": "teleport", "position": null, "delta": null, "button": null, "when": 0}]"#;
        let err = EventSequence::from_json(json).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        let json = r#"[{"event_type": "key_press", "position": null, "delta": null, "button": "'a'", "when": -0.5}]"#;
        let err = EventSequence::from_json(json).unwrap_err();
        assert!(err.to_string().contains("event 0"));
    }

    #[test]
    fn test_invalid_event_fails_whole_load() {
        let json = r#"[
            {"event_type": "key_press", "position": null, "delta": null, "button": "'a'", "when": 0},
            {"event_type": "mouse_move", "position": null, "delta": null, "button": null, "when": 0}
        ]"#;
        let err = EventSequence::from_json(json).unwrap_err();
        assert!(err.is_persistence());
        assert!(err.to_string().contains("event 1"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macro.json");
        let sequence = sample();

        sequence.save(&path).unwrap();
        assert_eq!(EventSequence::load(&path).unwrap(), sequence);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EventSequence::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
