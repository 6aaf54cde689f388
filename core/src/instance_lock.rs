//! Single-instance lock (§5 "only one primary process may run at a time")
//!
//! Grounded on the same [`sysinfo`] PID-liveness check the teacher uses
//! in [`crate::agent::tools::system::SystemMonitorTool`], applied here to
//! detect a stale lockfile left behind by a crashed process rather than
//! to report live process stats.

use crate::persist::write_json_atomic;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sysinfo::{Pid, System};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockRecord {
    pid: u32,
    started_at: chrono::DateTime<chrono::Utc>,
    host: String,
    cwd: String,
}

/// Holds the lockfile for the lifetime of the process; the file is
/// removed on [`Drop`] so a clean shutdown never leaves a stale lock.
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Acquires `<data_dir>/orcbot.lock`. Fails if a live process already
    /// holds it; overwrites it if the recorded PID is no longer running.
    pub fn acquire(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("orcbot.lock");

        if let Some(existing) = Self::read_record(&path)? {
            if Self::pid_is_alive(existing.pid) {
                bail!(
                    "another instance is already running (pid {}, started {})",
                    existing.pid,
                    existing.started_at
                );
            }
            tracing::warn!(
                stale_pid = existing.pid,
                "found stale lockfile from a dead process, taking over"
            );
        }

        let record = LockRecord {
            pid: std::process::id(),
            started_at: chrono::Utc::now(),
            host: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
            cwd: std::env::current_dir()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
        };
        write_json_atomic(&path, &record).context("failed to write instance lockfile")?;

        Ok(Self { path })
    }

    fn read_record(path: &Path) -> Result<Option<LockRecord>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&content).ok())
    }

    fn pid_is_alive(pid: u32) -> bool {
        let mut sys = System::new();
        sys.refresh_processes();
        sys.process(Pid::from(pid as usize)).is_some()
    }

    pub fn release(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Waits for SIGINT or SIGTERM and returns. Callers use this to trigger
/// an orderly `Core::stop()` before the process exits, mirroring the
/// teacher's approach of awaiting [`tokio::signal::ctrl_c`] directly in
/// `main` rather than installing a custom handler.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_then_release_leaves_no_lockfile() {
        let dir = tempfile::tempdir().unwrap();
        let lock = InstanceLock::acquire(dir.path()).unwrap();
        assert!(dir.path().join("orcbot.lock").exists());
        drop(lock);
        assert!(!dir.path().join("orcbot.lock").exists());
    }

    #[test]
    fn second_acquire_fails_while_first_is_alive() {
        let dir = tempfile::tempdir().unwrap();
        let _first = InstanceLock::acquire(dir.path()).unwrap();
        let second = InstanceLock::acquire(dir.path());
        assert!(second.is_err());
    }

    #[test]
    fn stale_lock_from_dead_pid_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let stale = LockRecord {
            pid: 0, // pid 0 never matches a real process entry in sysinfo
            started_at: chrono::Utc::now(),
            host: "old-host".into(),
            cwd: "/old".into(),
        };
        write_json_atomic(&dir.path().join("orcbot.lock"), &stale).unwrap();
        let lock = InstanceLock::acquire(dir.path());
        assert!(lock.is_ok());
    }
}
