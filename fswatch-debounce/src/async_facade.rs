//! The cooperative-asynchronous iterator facade: same
//! semantics as [`crate::sync_facade::Watch`], but the blocking
//! `WatchSession::watch` call runs on a `tokio::task::spawn_blocking`
//! worker per tick and the facade only ever awaits that join handle.

use crate::config::WatchConfig;
use crate::session::WatchSession;
use crate::stop::StopHandle;
use fswatch_types::{ChangeBatch, Error, ErrorKind, Outcome, Result};
use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// An async `Stream<Item = Result<ChangeBatch>>` over a [`WatchSession`].
///
/// Cancellation of the stream (dropping it while a tick is in flight) sets
/// the stop capability immediately; the detached
/// `spawn_blocking` task itself observes that within one `step_ms` tick
/// and exits on its own; the `Drop` impl cannot `.await` its completion
/// (Rust has no async `Drop`), so this is a best-effort, not a guaranteed
/// join, and is recorded as such in this crate's design notes.
pub struct AsyncWatch {
    session: Arc<WatchSession>,
    stop: StopHandle,
    yield_on_timeout: bool,
    raise_interrupt: bool,
    in_flight: Option<JoinHandle<Result<Outcome>>>,
}

impl AsyncWatch {
    /// Open a session over `config` with default facade options.
    pub fn open(config: WatchConfig) -> Result<Self> {
        Ok(Self {
            session: Arc::new(WatchSession::open(config)?),
            stop: StopHandle::new(),
            yield_on_timeout: false,
            raise_interrupt: false,
            in_flight: None,
        })
    }

    /// Yield an empty batch on every `Timeout` cycle instead of silently
    /// looping past it.
    pub fn yield_on_timeout(mut self, yes: bool) -> Self {
        self.yield_on_timeout = yes;
        self
    }

    /// Raise `Error { kind: Interrupted, .. }` from the stream instead of
    /// silently ending it when a signal-triggered stop is observed.
    pub fn raise_interrupt(mut self, yes: bool) -> Self {
        self.raise_interrupt = yes;
        self
    }

    /// A handle that stops this watch from any thread or async task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn spawn_tick(&self) -> JoinHandle<Result<Outcome>> {
        let session = self.session.clone();
        let stop = self.stop.clone();
        tokio::task::spawn_blocking(move || session.watch(&stop))
    }
}

impl Stream for AsyncWatch {
    type Item = Result<ChangeBatch>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.in_flight.is_none() {
                this.in_flight = Some(this.spawn_tick());
            }

            let joined = {
                let handle = this.in_flight.as_mut().expect("just set above");
                match Pin::new(handle).poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(joined) => joined,
                }
            };
            this.in_flight = None;

            let outcome = match joined {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => return Poll::Ready(Some(Err(e))),
                Err(join_err) => {
                    log::error!("watch worker thread terminated abnormally: {join_err}");
                    return Poll::Ready(Some(Err(Error::new(ErrorKind::BackendFailed))));
                }
            };

            match outcome {
                Outcome::Changes(batch) => return Poll::Ready(Some(Ok(batch))),
                Outcome::Timeout => {
                    if this.yield_on_timeout {
                        return Poll::Ready(Some(Ok(ChangeBatch::new())));
                    }
                    continue;
                }
                Outcome::Stop if this.stop.was_signaled() => return finish_interrupted(this),
                Outcome::Stop => {
                    this.session.close();
                    return Poll::Ready(None);
                }
                Outcome::Signal => return finish_interrupted(this),
                Outcome::BackendFailed => return Poll::Ready(Some(Err(Error::new(ErrorKind::BackendFailed)))),
            }
        }
    }
}

fn finish_interrupted(this: &mut AsyncWatch) -> Poll<Option<Result<ChangeBatch>>> {
    this.session.close();
    if this.raise_interrupt {
        Poll::Ready(Some(Err(Error::new(ErrorKind::Interrupted))))
    } else {
        log::warn!("watch ended by interrupt signal");
        Poll::Ready(None)
    }
}

impl Drop for AsyncWatch {
    fn drop(&mut self) {
        self.stop.set();
        self.session.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_core::Stream as _;
    use std::time::Duration;

    #[tokio::test]
    async fn yields_empty_batch_on_timeout_when_configured() {
        use std::pin::pin;

        let dir = tempfile::tempdir().unwrap();
        let config = WatchConfig::default()
            .with_path(dir.path())
            .with_step(Duration::from_millis(5))
            .with_timeout(Duration::from_millis(20));
        let watch = AsyncWatch::open(config).unwrap().yield_on_timeout(true);
        let mut watch = pin!(watch);
        let next = std::future::poll_fn(|cx| watch.as_mut().poll_next(cx)).await;
        assert!(next.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_handle_ends_stream() {
        use std::pin::pin;

        let dir = tempfile::tempdir().unwrap();
        let config = WatchConfig::default()
            .with_path(dir.path())
            .with_step(Duration::from_millis(5))
            .with_timeout(Duration::from_secs(5));
        let watch = AsyncWatch::open(config).unwrap();
        let stop = watch.stop_handle();
        let mut watch = pin!(watch);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stop.set();
        });
        let next = std::future::poll_fn(|cx| watch.as_mut().poll_next(cx)).await;
        assert!(next.is_none());
    }
}
