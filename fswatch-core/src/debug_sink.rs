//! A diagnostic sink that traces every raw event before it reaches the
//! real handler, for `WatchConfig`'s `debug` option: every raw event gets
//! a `log::debug!` line before filtering happens further downstream.

use crate::EventHandler;
use fswatch_types::{RawEvent, Result};

/// Wraps an [`EventHandler`], logging each event at `debug` level before
/// forwarding it unchanged.
pub struct TracingEventHandler<H> {
    inner: H,
}

impl<H: EventHandler> TracingEventHandler<H> {
    /// Wrap `inner` so every event it receives is also traced.
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H: EventHandler> EventHandler for TracingEventHandler<H> {
    fn handle_event(&mut self, event: Result<RawEvent>) {
        match &event {
            Ok(e) => log::debug!("raw event: {:?} {}", e.kind, e.path.display()),
            Err(e) => log::debug!("raw event error: {e}"),
        }
        self.inner.handle_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fswatch_types::ChangeKind;
    use std::sync::{Arc, Mutex};

    #[test]
    fn forwards_events_unchanged() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let captured = received.clone();
        let handler = move |event: Result<RawEvent>| {
            captured.lock().unwrap().push(event.unwrap());
        };
        let mut traced = TracingEventHandler::new(handler);
        traced.handle_event(Ok(RawEvent::new(ChangeKind::Added, "/a")));
        assert_eq!(received.lock().unwrap().len(), 1);
    }
}
