//! [`WatchSession`]: the open, owned resource a facade drives.

use crate::config::WatchConfig;
use crate::debounce::{self, DebounceResult};
use crate::normalize;
use crate::stop::StopSignal;
use fswatch_core::channel::EventChannel;
use fswatch_core::selector::{self, SelectedWatcher};
use fswatch_core::{Config, PollWatcher, RecursiveMode, Watcher, WatcherKind};
use fswatch_types::{Error, ErrorKind, Outcome, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One of the two ways a session's backend was obtained: picked by the
/// full Backend Selector, or forced to polling because
/// `WatchConfig::with_force_polling` was set on this particular session
/// (distinct from the selector's own `WATCHFILES_FORCE_POLLING` env
/// check, which this still also respects via `select_watcher`).
enum Backend {
    Selected(SelectedWatcher),
    Forced(PollWatcher, WatcherKind),
}

impl Backend {
    fn watch(&mut self, path: &Path, mode: RecursiveMode) -> Result<()> {
        match self {
            Backend::Selected(w) => w.watch(path, mode),
            Backend::Forced(w, _) => w.watch(path, mode),
        }
    }

    fn kind(&self) -> WatcherKind {
        match self {
            Backend::Selected(w) => w.kind(),
            Backend::Forced(_, k) => *k,
        }
    }
}

/// Combines a session's own closed flag with the caller-supplied stop
/// capability for one `watch()` call: either firing ends the cycle, per
/// the rule that closing the session from any thread causes every
/// active watch to return Stop.
struct CombinedStop<'a> {
    closed: &'a AtomicBool,
    external: &'a dyn StopSignal,
}

impl StopSignal for CombinedStop<'_> {
    fn is_set(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.external.is_set()
    }
}

/// An open watch over one or more roots.
///
/// Owns the selected backend and the bounded event channel feeding it
/// [`WatchSession::watch`] runs one debounce cycle at a time
/// against that channel. Construction registers every configured root up
/// front and fails fast if one is missing, so a session is never left half
/// open.
pub struct WatchSession {
    backend: Backend,
    channel: EventChannel,
    closed: Arc<AtomicBool>,
    debounce: Duration,
    step: Duration,
    timeout: Duration,
    filter: Option<crate::config::FilterPredicate>,
}

impl WatchSession {
    /// Open a session: build the backend (honoring `force_polling` and,
    /// through [`selector::select_watcher`], the `WATCHFILES_*` env vars),
    /// then register every root in `config`.
    pub fn open(config: WatchConfig) -> Result<Self> {
        let channel = EventChannel::new(config.channel_capacity);
        let mut core_config = Config::default().with_ignore_permission_denied(config.ignore_permission_denied);
        if let Some(poll_delay) = config.poll_delay {
            core_config = core_config.with_poll_interval(poll_delay);
        }

        let mut backend = if config.force_polling {
            let w = if config.debug {
                PollWatcher::new(fswatch_core::TracingEventHandler::new(channel.sender()), core_config)?
            } else {
                PollWatcher::new(channel.sender(), core_config)?
            };
            Backend::Forced(w, WatcherKind::PollWatcher)
        } else if config.debug {
            Backend::Selected(selector::select_watcher(
                fswatch_core::TracingEventHandler::new(channel.sender()),
                core_config,
            )?)
        } else {
            Backend::Selected(selector::select_watcher(channel.sender(), core_config)?)
        };

        for root in &config.roots {
            if !root.path.exists() {
                return Err(Error::path_not_found(root.path.clone()));
            }
            match backend.watch(&root.path, root.recursive_mode) {
                Ok(()) => {}
                Err(e)
                    if matches!(e.kind, ErrorKind::PermissionDenied) && config.ignore_permission_denied =>
                {
                    log::warn!("ignoring permission denied while watching {}", root.path.display());
                }
                Err(e) => return Err(e),
            }
        }

        log::info!(
            "watch session opened: backend={:?} roots={}",
            backend.kind(),
            config.roots.len()
        );

        Ok(Self {
            backend,
            channel,
            closed: Arc::new(AtomicBool::new(false)),
            debounce: config.debounce,
            step: config.step,
            timeout: config.timeout,
            filter: config.filter,
        })
    }

    /// Which backend this session ended up using.
    pub fn backend_kind(&self) -> WatcherKind {
        self.backend.kind()
    }

    /// Run one debounce cycle, blocking the calling thread.
    ///
    /// `stop` is polled alongside the session's own closed flag — either
    /// one firing ends the cycle with `Stop`. A post-filter empty batch is
    /// not delivered: the cycle restarts from scratch rather than handing
    /// an empty batch to the consumer.
    pub fn watch(&self, stop: &dyn StopSignal) -> Result<Outcome> {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::new(ErrorKind::WatcherClosed));
            }
            let combined = CombinedStop {
                closed: &self.closed,
                external: stop,
            };
            let result = debounce::run(&self.channel, self.debounce, self.step, self.timeout, &combined);
            match result {
                DebounceResult::Changes(raw) => {
                    let batch = normalize::normalize_and_filter(raw, self.filter.as_ref());
                    if batch.is_empty() {
                        continue;
                    }
                    log::info!("{} change(s) detected", batch.len());
                    log::debug!("batch contents: {:?}", batch);
                    return Ok(Outcome::Changes(batch));
                }
                DebounceResult::Timeout => return Ok(Outcome::Timeout),
                DebounceResult::Stop => return Ok(Outcome::Stop),
                DebounceResult::BackendFailed => return Ok(Outcome::BackendFailed),
            }
        }
    }

    /// Close the session: every currently blocked or future `watch()` call
    /// returns `Outcome::Stop` or `Err(WatcherClosed)` respectively.
    /// Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether [`WatchSession::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of events the event channel has dropped for capacity
    /// overflow over this session's lifetime.
    pub fn dropped_event_count(&self) -> u64 {
        self.channel.dropped_count()
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stop::StopHandle;

    #[test]
    fn open_rejects_missing_root() {
        let config = WatchConfig::default().with_path("/no/such/path/fswatch-debounce-test");
        let err = WatchSession::open(config).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::PathNotFound));
    }

    #[test]
    fn closed_session_errors_on_watch() {
        let dir = tempfile::tempdir().unwrap();
        let config = WatchConfig::default().with_path(dir.path());
        let session = WatchSession::open(config).unwrap();
        session.close();
        let stop = StopHandle::new();
        let err = session.watch(&stop).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::WatcherClosed));
    }

    #[test]
    fn watch_returns_stop_when_closed_mid_call() {
        let dir = tempfile::tempdir().unwrap();
        let config = WatchConfig::default()
            .with_path(dir.path())
            .with_step(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(5));
        let session = Arc::new(WatchSession::open(config).unwrap());
        let closer = session.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            closer.close();
        });
        let stop = StopHandle::new();
        let outcome = session.watch(&stop).unwrap();
        assert!(matches!(outcome, Outcome::Stop));
    }
}
