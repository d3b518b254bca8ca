//! The bounded handoff between a backend's worker thread and a debouncer
//! pushes never block, pops wait up to a deadline, and
//! overflow drops the oldest queued event rather than blocking the
//! producer or losing the newest one.

use crate::{EventHandler, RawEvent, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

struct Inner {
    queue: Mutex<VecDeque<Result<RawEvent>>>,
    cvar: Condvar,
    capacity: usize,
    dropped: AtomicU64,
}

/// The producer/consumer handle for one backend's event stream.
///
/// Cloning shares the same underlying queue: the backend thread holds one
/// clone wrapped as an [`EventHandler`] and a consumer (the debouncer) holds
/// another for [`EventChannel::recv_deadline`].
#[derive(Clone)]
pub struct EventChannel {
    inner: Arc<Inner>,
}

impl EventChannel {
    /// Create a channel that retains at most `capacity` queued events.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
                cvar: Condvar::new(),
                capacity: capacity.max(1),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Push an event (or error) onto the queue. Never blocks: if the queue
    /// is already at capacity, the oldest entry is dropped to make room and
    /// the drop counter is incremented.
    pub fn push(&self, event: Result<RawEvent>) {
        let mut queue = self.inner.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= self.inner.capacity {
            queue.pop_front();
            let total = self.inner.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            log::warn!(
                "event channel at capacity ({}), dropped oldest entry ({} dropped so far)",
                self.inner.capacity,
                total
            );
        }
        queue.push_back(event);
        self.inner.cvar.notify_one();
    }

    /// Block until an event is available or `deadline` passes.
    ///
    /// Returns `None` on timeout with nothing queued.
    pub fn recv_deadline(&self, deadline: Instant) -> Option<Result<RawEvent>> {
        let mut queue = self.inner.queue.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(event) = queue.pop_front() {
                return Some(event);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, timeout) = self
                .inner
                .cvar
                .wait_timeout(queue, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            queue = guard;
            if timeout.timed_out() && queue.is_empty() {
                return None;
            }
        }
    }

    /// Number of events dropped for capacity overflow since creation.
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Wrap this channel as the `EventHandler` a [`crate::Watcher`] pushes
    /// into from its worker thread.
    pub fn sender(&self) -> EventChannelSender {
        EventChannelSender(self.clone())
    }
}

/// The producer side of an [`EventChannel`], installed as a `Watcher`'s
/// event handler.
pub struct EventChannelSender(EventChannel);

impl EventHandler for EventChannelSender {
    fn handle_event(&mut self, event: Result<RawEvent>) {
        self.0.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fswatch_types::ChangeKind;
    use std::time::Duration;

    #[test]
    fn push_then_recv_returns_event() {
        let chan = EventChannel::new(4);
        chan.push(Ok(RawEvent::new(ChangeKind::Added, "/a")));
        let got = chan.recv_deadline(Instant::now() + Duration::from_millis(50));
        assert!(matches!(got, Some(Ok(e)) if e.path.to_str() == Some("/a")));
    }

    #[test]
    fn recv_times_out_when_empty() {
        let chan = EventChannel::new(4);
        let start = Instant::now();
        let got = chan.recv_deadline(start + Duration::from_millis(20));
        assert!(got.is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn overflow_drops_oldest() {
        let chan = EventChannel::new(2);
        chan.push(Ok(RawEvent::new(ChangeKind::Added, "/a")));
        chan.push(Ok(RawEvent::new(ChangeKind::Added, "/b")));
        chan.push(Ok(RawEvent::new(ChangeKind::Added, "/c")));
        assert_eq!(chan.dropped_count(), 1);
        let first = chan.recv_deadline(Instant::now() + Duration::from_millis(50));
        assert!(matches!(first, Some(Ok(e)) if e.path.to_str() == Some("/b")));
    }
}
