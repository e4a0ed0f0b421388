use std::time::Duration;

use cadence_recorder::{Error, Event, EventSequence, Point, ScrollDelta};
use proptest::prelude::*;

fn delay() -> impl Strategy<Value = Duration> {
    // Up to an hour, at nanosecond resolution.
    (0u64..3_600_000_000_000).prop_map(Duration::from_nanos)
}

fn point() -> impl Strategy<Value = Point> {
    (-10_000i32..10_000, -10_000i32..10_000).prop_map(|(x, y)| Point::new(x, y))
}

fn input() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Button.left".to_string()),
        Just("Key.shift".to_string()),
        Just("Key.f8".to_string()),
        "[a-z0-9]".prop_map(|c| format!("'{c}'")),
    ]
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (point(), delay()).prop_map(|(p, d)| Event::pointer_move(p, d)),
        (input(), point(), delay()).prop_map(|(b, p, d)| Event::button_press(b, p, d)),
        (input(), point(), delay()).prop_map(|(b, p, d)| Event::button_release(b, p, d)),
        (point(), -20i32..20, -20i32..20, delay())
            .prop_map(|(p, dx, dy, d)| Event::scroll(p, ScrollDelta::new(dx, dy), d)),
        (input(), delay()).prop_map(|(k, d)| Event::key_press(k, d)),
        (input(), delay()).prop_map(|(k, d)| Event::key_release(k, d)),
    ]
}

proptest! {
    #[test]
    fn json_round_trip_is_lossless(events in prop::collection::vec(event(), 0..40)) {
        let sequence = EventSequence::from_events(events);
        let json = sequence.to_json().unwrap();
        prop_assert_eq!(EventSequence::from_json(&json).unwrap(), sequence);
    }
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macro.json");
    let sequence = EventSequence::from_events(vec![
        Event::pointer_move(Point::new(10, 10), Duration::ZERO),
        Event::scroll(Point::new(10, 10), ScrollDelta::new(0, -3), Duration::from_millis(250)),
        Event::key_press("Key.enter", Duration::from_secs(2)),
    ]);

    sequence.save(&path).unwrap();
    assert_eq!(EventSequence::load(&path).unwrap(), sequence);
}

#[test]
fn truncated_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, r#"[{"event_type": "key_press", "button": "'a'""#).unwrap();

    let err = EventSequence::load(&path).unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
}
