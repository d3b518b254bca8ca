//! The debouncer's central loop.
//!
//! A free function rather than a struct with its own state: all the state
//! a cycle needs (`T0`, the accumulator, `first_event_time`) lives on the
//! stack of one call, matching `watch`'s description as a
//! single blocking operation rather than an object with lifecycle.

use crate::stop::StopSignal;
use fswatch_core::channel::EventChannel;
use fswatch_types::{ErrorKind, RawEvent};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// What one cycle of the loop produced, before normalization. Distinct
/// from `fswatch_types::Outcome`: that type carries an already-normalized
/// `ChangeBatch`, while this carries the raw accumulator the normalizer
/// still needs to see.
pub(crate) enum DebounceResult {
    Changes(HashSet<RawEvent>),
    Timeout,
    Stop,
    BackendFailed,
}

/// Run one debounce cycle against `channel`, honoring `stop` between every
/// wait. Blocks the calling thread.
pub(crate) fn run(
    channel: &EventChannel,
    debounce: Duration,
    step: Duration,
    timeout: Duration,
    stop: &dyn StopSignal,
) -> DebounceResult {
    let t0 = Instant::now();
    let hard_deadline = if timeout.is_zero() { None } else { Some(t0 + timeout) };

    // Steps 2 & 5: wait for the first event of this cycle, or give up.
    let first = loop {
        if stop.is_set() {
            return DebounceResult::Stop;
        }
        let now = Instant::now();
        if let Some(hard) = hard_deadline {
            if now >= hard {
                return DebounceResult::Timeout;
            }
        }
        let mut wait_until = now + step;
        if let Some(hard) = hard_deadline {
            wait_until = wait_until.min(hard);
        }
        match channel.recv_deadline(wait_until) {
            Some(Ok(event)) => break event,
            Some(Err(e)) => {
                if matches!(e.kind, ErrorKind::BackendFailed) {
                    return DebounceResult::BackendFailed;
                }
                log::warn!("backend error while waiting for first event: {e}");
            }
            None => {}
        }
    };

    let mut accumulator = HashSet::new();
    accumulator.insert(first);
    let first_event_time = Instant::now();

    // Step 3: accumulate until debounce, step-quiescence, stop, or the
    // overall deadline fires. Deadlines are checked before each wait so a
    // condition already satisfied delivers immediately (the tie-break
    // rule), rather than waiting out a doomed `step_ms` first.
    loop {
        if stop.is_set() {
            return DebounceResult::Stop;
        }
        let now = Instant::now();
        if now.duration_since(first_event_time) >= debounce {
            return DebounceResult::Changes(accumulator);
        }
        if let Some(hard) = hard_deadline {
            if now >= hard {
                return DebounceResult::Changes(accumulator);
            }
        }

        let debounce_deadline = first_event_time + debounce;
        let mut wait_until = (now + step).min(debounce_deadline);
        if let Some(hard) = hard_deadline {
            wait_until = wait_until.min(hard);
        }

        match channel.recv_deadline(wait_until) {
            Some(Ok(event)) => {
                accumulator.insert(event);
            }
            Some(Err(e)) => {
                if matches!(e.kind, ErrorKind::BackendFailed) {
                    return DebounceResult::BackendFailed;
                }
                log::warn!("backend error while accumulating: {e}");
            }
            None => {
                // The pop itself timed out; if it was the step deadline
                // (not the debounce/hard deadline, already checked above
                // on the next iteration) with a non-empty accumulator,
                // that's step-quiescence: deliver.
                return DebounceResult::Changes(accumulator);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stop::StopHandle;
    use fswatch_core::channel::EventChannel;
    use fswatch_types::ChangeKind;

    #[test]
    fn timeout_with_no_events() {
        let channel = EventChannel::new(8);
        let stop = StopHandle::new();
        let result = run(
            &channel,
            Duration::from_millis(200),
            Duration::from_millis(10),
            Duration::from_millis(30),
            &stop,
        );
        assert!(matches!(result, DebounceResult::Timeout));
    }

    #[test]
    fn stop_before_any_event() {
        let channel = EventChannel::new(8);
        let stop = StopHandle::new();
        stop.set();
        let result = run(
            &channel,
            Duration::from_millis(200),
            Duration::from_millis(10),
            Duration::from_millis(0),
            &stop,
        );
        assert!(matches!(result, DebounceResult::Stop));
    }

    #[test]
    fn step_quiescence_delivers_accumulated_event() {
        let channel = EventChannel::new(8);
        channel.push(Ok(RawEvent::new(ChangeKind::Added, "/a")));
        let stop = StopHandle::new();
        let result = run(
            &channel,
            Duration::from_secs(10),
            Duration::from_millis(20),
            Duration::from_millis(0),
            &stop,
        );
        match result {
            DebounceResult::Changes(set) => {
                assert_eq!(set.len(), 1);
                assert!(set.contains(&RawEvent::new(ChangeKind::Added, "/a")));
            }
            _ => panic!("expected Changes"),
        }
    }

    #[test]
    fn duplicate_events_collapse_to_one() {
        let channel = EventChannel::new(8);
        channel.push(Ok(RawEvent::new(ChangeKind::Modified, "/a")));
        channel.push(Ok(RawEvent::new(ChangeKind::Modified, "/a")));
        let stop = StopHandle::new();
        let result = run(
            &channel,
            Duration::from_secs(10),
            Duration::from_millis(20),
            Duration::from_millis(0),
            &stop,
        );
        match result {
            DebounceResult::Changes(set) => assert_eq!(set.len(), 1),
            _ => panic!("expected Changes"),
        }
    }

    #[test]
    fn debounce_deadline_fires_even_under_continuing_activity() {
        let channel = EventChannel::new(64);
        channel.push(Ok(RawEvent::new(ChangeKind::Added, "/a")));
        let stop = StopHandle::new();
        // step_ms longer than debounce_ms forces the debounce deadline
        // (not step-quiescence) to be the thing that fires.
        let result = run(
            &channel,
            Duration::from_millis(30),
            Duration::from_millis(200),
            Duration::from_millis(0),
            &stop,
        );
        assert!(matches!(result, DebounceResult::Changes(_)));
    }
}
