//! Routing of pointer and key events to separate sinks.

use super::InputSink;
use crate::event::Event;
use crate::Result;

/// Routes pointer events to one sink and key events to another.
///
/// Some platform libraries place the cursor reliably but lose key state, or
/// the other way round; the composite lets one of each be used together.
pub struct CompositeSink<P, K> {
    pointer: P,
    keyboard: K,
}

impl<P: InputSink, K: InputSink> CompositeSink<P, K> {
    /// Combine a pointer sink and a keyboard sink.
    pub fn new(pointer: P, keyboard: K) -> Self {
        Self { pointer, keyboard }
    }

    pub fn pointer(&self) -> &P {
        &self.pointer
    }

    pub fn keyboard(&self) -> &K {
        &self.keyboard
    }
}

impl<P: InputSink, K: InputSink> InputSink for CompositeSink<P, K> {
    fn execute(&mut self, event: &Event) -> Result<()> {
        if event.kind().is_key() {
            self.keyboard.execute(event)
        } else {
            self.pointer.execute(event)
        }
    }

    /// Close both sinks, even when the first fails.
    fn close(&mut self) -> Result<()> {
        let pointer = self.pointer.close();
        let keyboard = self.keyboard.close();
        if let (Err(_), Err(e)) = (&pointer, &keyboard) {
            tracing::warn!(error = %e, "failed to close keyboard sink");
        }
        pointer.and(keyboard)
    }
}
