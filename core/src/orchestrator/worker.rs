//! Worker process lifecycle — real OS processes, not tokio tasks.
//!
//! The spec requires forked workers each holding their own queue/memory/
//! decision loop, communicating over IPC only (§4.6, §5 "Workers"). This
//! diverges from the teacher's [`crate::agent::worker::WorkerManager`],
//! which spawns tokio tasks sharing the parent's address space — that
//! shape can't give a crashed worker an independent process to crash
//! *in*. [`tokio::process::Command`] plus newline-delimited JSON over
//! stdio is the natural fit, and is itself how the teacher already
//! shells out in [`crate::scheduler::daemon::SchedulerDaemon::execute_job`].

use crate::orchestrator::ipc::{ParentMessage, WorkerMessage};
use crate::orchestrator::agent::AgentId;
use anyhow::{Context, Result};
use serde_json::Value;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// A running worker child process plus the handles needed to talk to it.
pub struct WorkerHandle {
    pub agent_id: AgentId,
    child: Child,
    stdin: ChildStdin,
    pub pid: Option<u32>,
}

impl WorkerHandle {
    /// Spawns the worker binary, wires a reader task that forwards every
    /// parsed [`WorkerMessage`] line to `events`, and returns the handle
    /// once the process itself is up (not yet `ready` — that's a
    /// subsequent message the caller awaits separately).
    pub fn spawn(
        agent_id: AgentId,
        program: &str,
        args: &[String],
        events: mpsc::Sender<(AgentId, WorkerMessage)>,
    ) -> Result<Self> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().with_context(|| format!("failed to spawn worker process '{program}'"))?;
        let pid = child.id();

        let stdout = child.stdout.take().context("worker child had no stdout pipe")?;
        let stderr = child.stderr.take().context("worker child had no stderr pipe")?;
        let stdin = child.stdin.take().context("worker child had no stdin pipe")?;

        tokio::spawn(read_worker_stdout(agent_id, stdout, events));
        tokio::spawn(forward_worker_stderr_to_logs(agent_id, stderr));

        Ok(Self {
            agent_id,
            child,
            stdin,
            pid,
        })
    }

    pub async fn send(&mut self, msg: &ParentMessage) -> Result<()> {
        let mut line = msg.to_line().context("failed to serialize IPC message")?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await.context("failed to write to worker stdin")?;
        self.stdin.flush().await.context("failed to flush worker stdin")
    }

    /// SIGTERM first, escalating to SIGKILL after a grace period, via
    /// [`nix::sys::signal`]; falls back to [`Child::kill`] (SIGKILL only)
    /// if the process has no PID (already reaped).
    pub async fn terminate(&mut self, grace: std::time::Duration) -> Result<()> {
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            let deadline = tokio::time::Instant::now() + grace;
            loop {
                if self.child.try_wait().ok().flatten().is_some() {
                    return Ok(());
                }
                if tokio::time::Instant::now() >= deadline {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        }
        self.child.kill().await.context("failed to force-kill worker process")
    }

    /// Non-blocking exit check. Returns `Some(exit_code)` once the
    /// process has exited, consuming the wait.
    pub fn try_wait_exit_code(&mut self) -> Option<i32> {
        self.child.try_wait().ok().flatten().map(|status| status.code().unwrap_or(-1))
    }
}

async fn read_worker_stdout(
    agent_id: AgentId,
    stdout: tokio::process::ChildStdout,
    events: mpsc::Sender<(AgentId, WorkerMessage)>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match WorkerMessage::from_line(&line) {
                    Ok(msg) => {
                        if events.send((agent_id, msg)).await.is_err() {
                            break; // orchestrator shut down
                        }
                    }
                    Err(e) => warn!(%agent_id, error = %e, line, "worker emitted an unparseable IPC line"),
                }
            }
            Ok(None) => break, // stdout closed: worker exited
            Err(e) => {
                warn!(%agent_id, error = %e, "error reading worker stdout");
                break;
            }
        }
    }
}

async fn forward_worker_stderr_to_logs(agent_id: AgentId, stderr: tokio::process::ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        info!(worker = %agent_id, "{}", line);
    }
}

#[allow(dead_code)]
pub fn build_init_message(data_dir: &std::path::Path, config: Value) -> ParentMessage {
    ParentMessage::Init {
        data_dir: data_dir.to_string_lossy().into_owned(),
        config,
    }
}
