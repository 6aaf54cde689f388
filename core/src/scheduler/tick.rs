//! The Tick scheduler (§4.7) — fires every ~10s and drives:
//! queue drain (via the caller's dispatcher), stalled-action detection,
//! stale-`waiting` resumption, heartbeat cron evaluation, and one-off
//! fire/missed-fire-replay. Re-entrancy-guarded the same way the
//! teacher's [`crate::scheduler::daemon::SchedulerDaemon`] is guarded by
//! its single-threaded `sleep`-then-`tick` loop, but with an explicit
//! `AtomicBool` since the core's tick can be invoked from more than one
//! caller path (an external CLI driver, tests).

use crate::queue::{Action, ActionQueue, Lane};
use crate::scheduler::entry::{ScheduleEntry, ScheduleKind, ScheduleStore};
use crate::scheduler::heartbeat::HeartbeatBackoff;
use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct TickConfig {
    pub max_stale_waiting_minutes: i64,
    pub max_action_run_minutes: i64,
    pub gc_retention_minutes: i64,
    pub heartbeat_base_interval_secs: i64,
    pub heartbeat_priority: u8,
    pub oneoff_priority_default: u8,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            max_stale_waiting_minutes: 60,
            max_action_run_minutes: 30,
            gc_retention_minutes: 1440,
            heartbeat_base_interval_secs: 900,
            heartbeat_priority: 3,
            oneoff_priority_default: 5,
        }
    }
}

pub struct TickScheduler {
    config: TickConfig,
    queue: Arc<ActionQueue>,
    heartbeats: ScheduleStore,
    oneoffs: ScheduleStore,
    backoff: parking_lot::Mutex<HeartbeatBackoff>,
    busy: AtomicBool,
    autonomy_enabled: AtomicBool,
}

impl TickScheduler {
    pub fn new(config: TickConfig, queue: Arc<ActionQueue>, data_dir: impl AsRef<Path>) -> Self {
        let backoff = HeartbeatBackoff::new(config.heartbeat_base_interval_secs);
        Self {
            heartbeats: ScheduleStore::heartbeats(&data_dir),
            oneoffs: ScheduleStore::oneoffs(&data_dir),
            backoff: parking_lot::Mutex::new(backoff),
            busy: AtomicBool::new(false),
            autonomy_enabled: AtomicBool::new(true),
            config,
            queue,
        }
    }

    pub fn set_autonomy_enabled(&self, enabled: bool) {
        self.autonomy_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Called once at process start: fires any past-due one-offs
    /// immediately (tagged "(delayed)"), re-arms future ones untouched,
    /// and marks any action left `in-progress` from a previous run as
    /// `failed` (crash recovery).
    pub fn recover_on_start(&self) -> Result<()> {
        // Crash recovery: anything left `in-progress` from a previous run
        // is stale by definition, regardless of the normal stalled-action
        // threshold.
        let failed = self.queue.fail_stalled(0);
        if !failed.is_empty() {
            warn!(count = failed.len(), "crash recovery: forced stale in-progress actions to failed");
        }
        self.fire_past_due_oneoffs()?;
        Ok(())
    }

    fn fire_past_due_oneoffs(&self) -> Result<()> {
        let mut entries = self.oneoffs.load()?;
        let now = Utc::now();
        let mut remaining = Vec::with_capacity(entries.len());
        let mut fired = 0;
        for entry in entries.drain(..) {
            if entry.is_past_due_oneoff(now) {
                self.push_oneoff_action(&entry, true);
                fired += 1;
            } else {
                remaining.push(entry);
            }
        }
        if fired > 0 {
            self.oneoffs.save(&remaining)?;
            info!(count = fired, "fired past-due one-off schedules on load");
        }
        Ok(())
    }

    /// The periodic (~10s) tick body. Re-entrancy-guarded: a slow
    /// previous tick still running causes this call to no-op rather than
    /// overlap.
    pub async fn tick(&self) -> Result<()> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.tick_inner().await;
        self.busy.store(false, Ordering::SeqCst);
        result
    }

    async fn tick_inner(&self) -> Result<()> {
        let resumed = self.queue.resume_stale_waiting(self.config.max_stale_waiting_minutes);
        if !resumed.is_empty() {
            info!(count = resumed.len(), "resumed stale waiting actions");
        }
        let failed = self.queue.fail_stalled(self.config.max_action_run_minutes);
        if !failed.is_empty() {
            warn!(count = failed.len(), "forced stalled in-progress actions to failed");
        }
        self.queue.garbage_collect(self.config.gc_retention_minutes);

        self.evaluate_oneoffs()?;
        self.evaluate_heartbeats()?;

        Ok(())
    }

    fn evaluate_oneoffs(&self) -> Result<()> {
        let mut entries = self.oneoffs.load()?;
        let now = Utc::now();
        let mut remaining = Vec::with_capacity(entries.len());
        let mut fired = 0;
        for entry in entries.drain(..) {
            let due = match &entry.schedule {
                crate::scheduler::entry::ScheduleSpec::At(at) => *at <= now,
                crate::scheduler::entry::ScheduleSpec::Cron(_) => entry
                    .schedule
                    .next_fire_after(entry.created_at)
                    .map(|next| next <= now)
                    .unwrap_or(false),
            };
            if due {
                self.push_oneoff_action(&entry, false);
                fired += 1;
            } else {
                remaining.push(entry);
            }
        }
        if fired > 0 {
            self.oneoffs.save(&remaining)?;
        }
        Ok(())
    }

    fn push_oneoff_action(&self, entry: &ScheduleEntry, delayed: bool) {
        let description = if delayed {
            format!("{} (delayed)", entry.task)
        } else {
            entry.task.clone()
        };
        let action = Action::new(
            entry.priority,
            Lane::Autonomy,
            crate::queue::ActionPayload {
                description,
                ..Default::default()
            },
        );
        self.queue.push(action);
    }

    /// Heartbeat emission rules: autonomy enabled, no pending/in-progress
    /// heartbeat already queued, cross-heartbeat cooldown elapsed, and
    /// the idle-backoff-adjusted interval elapsed. Does not push if the
    /// dispatcher is currently busy (an action is in-progress).
    fn evaluate_heartbeats(&self) -> Result<()> {
        if !self.autonomy_enabled.load(Ordering::SeqCst) {
            return Ok(());
        }
        let snapshot = self.queue.snapshot();
        if snapshot.iter().any(|a| a.payload.is_heartbeat && !a.is_terminal()) {
            return Ok(()); // a heartbeat is already pending/in-progress/waiting
        }
        if snapshot.iter().any(|a| a.status == crate::queue::ActionStatus::InProgress) {
            return Ok(()); // dispatcher busy with other work
        }

        let entries = self.heartbeats.load()?;
        if entries.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let mut backoff = self.backoff.lock();
        if !backoff.should_fire(now) {
            return Ok(());
        }

        let due = entries.iter().any(|e| {
            e.kind == ScheduleKind::Heartbeat
                && e.schedule
                    .next_fire_after(now - chrono::Duration::minutes(1))
                    .map(|next| next <= now)
                    .unwrap_or(false)
        });
        if !due {
            return Ok(());
        }

        backoff.record_fire(now);
        drop(backoff);

        let action = Action::new(
            self.config.heartbeat_priority,
            Lane::Autonomy,
            crate::queue::ActionPayload {
                description: "(heartbeat — rebuilt at execution time)".to_string(),
                is_heartbeat: true,
                ..Default::default()
            },
        );
        self.queue.push(action);
        Ok(())
    }

    /// One-line summaries of every active recurring heartbeat and pending
    /// one-off, for the heartbeat prompt's "Active recurring schedules"
    /// section.
    pub fn active_schedule_summaries(&self) -> Vec<String> {
        let mut summaries = Vec::new();
        if let Ok(entries) = self.heartbeats.load() {
            for e in entries {
                if let crate::scheduler::entry::ScheduleSpec::Cron(expr) = &e.schedule {
                    summaries.push(format!("heartbeat: {} ({})", e.task, expr));
                }
            }
        }
        if let Ok(entries) = self.oneoffs.load() {
            for e in entries {
                summaries.push(format!("one-off: {}", e.task));
            }
        }
        summaries
    }

    /// Called by the dispatcher after a heartbeat action reaches a
    /// terminal state, to feed the idle-backoff multiplier.
    pub fn record_heartbeat_outcome(&self, productive: bool) {
        let mut backoff = self.backoff.lock();
        if productive {
            backoff.record_productive();
        } else {
            backoff.record_unproductive();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn past_due_oneoff_fires_immediately_on_recover() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(ActionQueue::new(dir.path()).unwrap());
        let oneoffs = ScheduleStore::oneoffs(dir.path());
        let entry = ScheduleEntry::new_oneoff("say hi", Utc::now() - chrono::Duration::minutes(1), 5, "in 1 minute say hi");
        oneoffs.save(&[entry]).unwrap();

        let scheduler = TickScheduler::new(TickConfig::default(), queue.clone(), dir.path());
        scheduler.recover_on_start().unwrap();

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].payload.description.contains("(delayed)"));
        assert!(ScheduleStore::oneoffs(dir.path()).load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tick_is_reentrancy_guarded() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(ActionQueue::new(dir.path()).unwrap());
        let scheduler = Arc::new(TickScheduler::new(TickConfig::default(), queue, dir.path()));
        scheduler.busy.store(true, Ordering::SeqCst);
        // A tick that finds `busy` already true should return immediately
        // without touching the guard itself.
        scheduler.tick().await.unwrap();
        assert!(scheduler.busy.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stale_waiting_is_resumed_by_tick() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(ActionQueue::new(dir.path()).unwrap());
        let action = Action::new(5, Lane::User, crate::queue::ActionPayload {
            description: "waiting for reply".into(),
            ..Default::default()
        });
        let id = action.id;
        queue.push(action);
        queue.update_status(id, crate::queue::ActionStatus::Waiting);
        {
            let snapshot = queue.get(id).unwrap();
            let _ = snapshot;
        }

        let mut config = TickConfig::default();
        config.max_stale_waiting_minutes = 0;
        let scheduler = TickScheduler::new(config, queue.clone(), dir.path());
        scheduler.tick().await.unwrap();

        let resumed = queue.get(id).unwrap();
        assert_eq!(resumed.status, crate::queue::ActionStatus::Pending);
    }
}
