//! Subprocess lifecycle for `fswatch run`: the `WATCHFILES_CHANGES`
//! environment contract a reload target observes.
//!
//! Spawns a fresh child per reload, and on the next batch sends an
//! interrupt first, gives it a grace period, then kills it outright:
//! `nix::sys::signal::kill` behind `cfg(unix)`, a blunter platform call
//! behind `cfg(windows)`.

use fswatch_types::{ChangeBatch, ChangeKind};
use std::process::{Child, Command};
use std::time::{Duration, Instant};

/// How long to wait after the interrupt before escalating to a kill.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// A running reload target plus enough bookkeeping to stop it gracefully.
pub struct RunningProcess {
    child: Child,
}

/// Serialize a batch into the `WATCHFILES_CHANGES` wire form: a JSON array
/// of `[kind_name, path]` pairs; an empty batch is `"[]"`.
pub fn changes_env_value(batch: Option<&ChangeBatch>) -> String {
    let pairs: Vec<(&'static str, String)> = batch
        .into_iter()
        .flatten()
        .map(|record| (kind_name(record.kind), record.path.display().to_string()))
        .collect();
    serde_json::to_string(&pairs).expect("Vec<(&str, String)> always serializes")
}

fn kind_name(kind: ChangeKind) -> &'static str {
    kind.as_str()
}

impl RunningProcess {
    /// Spawn `command` with `WATCHFILES_CHANGES` set to the serialized
    /// `batch` (`"[]"` on first launch, before any change has happened).
    pub fn spawn(mut command: Command, batch: Option<&ChangeBatch>) -> anyhow::Result<Self> {
        command.env("WATCHFILES_CHANGES", changes_env_value(batch));
        let child = command.spawn()?;
        Ok(Self { child })
    }

    /// Stop the process: interrupt, wait up to `grace_period`, then kill
    /// if it hasn't exited.
    pub fn stop(mut self, grace_period: Duration) -> anyhow::Result<()> {
        if self.child.try_wait()?.is_some() {
            log::warn!("process already exited before reload");
            return Ok(());
        }

        interrupt(&mut self.child)?;

        let deadline = Instant::now() + grace_period;
        loop {
            if self.child.try_wait()?.is_some() {
                log::debug!("process stopped");
                return Ok(());
            }
            if Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        log::warn!("process has not terminated, sending a kill signal");
        kill(&mut self.child)?;
        self.child.wait()?;
        Ok(())
    }
}

#[cfg(unix)]
fn interrupt(child: &mut Child) -> anyhow::Result<()> {
    use nix::sys::signal::{kill as nix_kill, Signal};
    use nix::unistd::Pid;

    nix_kill(Pid::from_raw(child.id() as i32), Signal::SIGINT)?;
    Ok(())
}

#[cfg(windows)]
fn interrupt(child: &mut Child) -> anyhow::Result<()> {
    // Windows consoles have no SIGINT equivalent a non-console-attached
    // parent can deliver selectively; go straight to a hard stop.
    kill(child)
}

#[cfg(unix)]
fn kill(child: &mut Child) -> anyhow::Result<()> {
    use nix::sys::signal::{kill as nix_kill, Signal};
    use nix::unistd::Pid;

    nix_kill(Pid::from_raw(child.id() as i32), Signal::SIGKILL)?;
    Ok(())
}

#[cfg(windows)]
fn kill(child: &mut Child) -> anyhow::Result<()> {
    child.kill()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fswatch_types::ChangeRecord;

    #[test]
    fn empty_batch_serializes_to_empty_array() {
        assert_eq!(changes_env_value(None), "[]");
    }

    #[test]
    fn batch_serializes_as_kind_path_pairs() {
        let mut batch = ChangeBatch::new();
        batch.insert(ChangeRecord::new(ChangeKind::Added, "/tmp/a"));
        let json = changes_env_value(Some(&batch));
        assert!(json.contains("\"added\""));
        assert!(json.contains("/tmp/a"));
    }

    #[test]
    fn spawn_and_stop_a_real_process() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let Ok(proc) = RunningProcess::spawn(cmd, None) else {
            return; // `sleep` not available in this environment; skip.
        };
        proc.stop(Duration::from_millis(200)).unwrap();
    }
}
