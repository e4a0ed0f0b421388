use super::InputBackend;
use crate::event::{InputId, Point, ScrollDelta};
use crate::Result;

/// Backend that logs every action instead of injecting it.
///
/// Used for dry runs: a sequence can be replayed with real timing and the
/// log shows exactly what would have been sent to the devices.
#[derive(Debug, Default)]
pub struct LogBackend {
    actions: u64,
}

impl LogBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actions logged so far.
    pub fn actions(&self) -> u64 {
        self.actions
    }

    fn log(&mut self, action: &str, detail: std::fmt::Arguments<'_>) -> Result<()> {
        self.actions += 1;
        tracing::info!(target: "cadence::input", "{action} {detail}");
        Ok(())
    }
}

impl InputBackend for LogBackend {
    fn move_to(&mut self, position: Point) -> Result<()> {
        self.log("move", format_args!("x={} y={}", position.x, position.y))
    }

    fn button_down(&mut self, button: &InputId) -> Result<()> {
        self.log("button_down", format_args!("{}", button.button_name()))
    }

    fn button_up(&mut self, button: &InputId) -> Result<()> {
        self.log("button_up", format_args!("{}", button.button_name()))
    }

    fn scroll(&mut self, delta: ScrollDelta) -> Result<()> {
        self.log("scroll", format_args!("dx={} dy={}", delta.dx, delta.dy))
    }

    fn key_down(&mut self, key: &InputId) -> Result<()> {
        self.log("key_down", format_args!("{}", key.key_name()))
    }

    fn key_up(&mut self, key: &InputId) -> Result<()> {
        self.log("key_up", format_args!("{}", key.key_name()))
    }
}
