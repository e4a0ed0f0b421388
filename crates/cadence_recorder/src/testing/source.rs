//! Scripted input observation for recorder tests.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::capture::{InputNotification, InputSource, NotificationHandler};
use crate::event::Point;
use crate::{Error, Result};

type Slot = Arc<Mutex<Option<NotificationHandler>>>;

/// Input source driven by the test through a [`SourceHandle`].
#[derive(Default)]
pub struct ScriptedSource {
    cursor: Point,
    handler: Slot,
    fail_subscribe: bool,
}

impl ScriptedSource {
    /// Create a source reporting `cursor` as the pointer position.
    pub fn new(cursor: Point) -> Self {
        Self {
            cursor,
            ..Default::default()
        }
    }

    /// Make `subscribe` fail.
    pub fn failing_subscribe(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    pub fn handle(&self) -> SourceHandle {
        SourceHandle {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl InputSource for ScriptedSource {
    fn cursor_position(&self) -> Result<Point> {
        Ok(self.cursor)
    }

    fn subscribe(&mut self, handler: NotificationHandler) -> Result<()> {
        if self.fail_subscribe {
            return Err(Error::Backend("input hook unavailable".into()));
        }
        *self.handler.lock() = Some(handler);
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<()> {
        self.handler.lock().take();
        Ok(())
    }
}

/// Test-side handle for delivering notifications.
#[derive(Clone)]
pub struct SourceHandle {
    handler: Slot,
}

impl SourceHandle {
    /// Deliver a notification to the current subscriber, if any.
    pub fn emit(&self, notification: InputNotification) {
        // Clone out of the lock so the handler may re-enter the source.
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(notification);
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// The current subscriber's callback.
    pub fn handler(&self) -> Option<NotificationHandler> {
        self.handler.lock().clone()
    }
}
