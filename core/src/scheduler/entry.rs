//! ScheduleEntry — the persisted shape behind both the heartbeat cron
//! scheduler and the one-off scheduler (§4.7, §6).
//!
//! Deliberately separate from [`crate::scheduler::model::ScheduledJob`],
//! the teacher's general-purpose interval/cron job runner for shell and
//! agent-task actions: a `ScheduleEntry` only ever produces one thing — a
//! queued autonomy-lane [`crate::queue::Action`] — and lives in one of two
//! dedicated files (`heartbeat-schedules.json`, `scheduled-tasks.json`)
//! rather than the general `jobs.json`.

use crate::persist::{read_json_or_default, write_json_atomic};
use anyhow::Result;
use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

pub type ScheduleId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Oneoff,
    Heartbeat,
}

/// Either an absolute instant (one-offs) or a cron expression (heartbeats,
/// and one-offs authored as "every Monday at 9" collapsed to their next
/// single fire by the caller).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum ScheduleSpec {
    At(DateTime<Utc>),
    Cron(String),
}

impl ScheduleSpec {
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            ScheduleSpec::At(instant) => {
                if *instant > after {
                    Some(*instant)
                } else {
                    None
                }
            }
            ScheduleSpec::Cron(expr) => {
                CronSchedule::from_str(expr)
                    .ok()
                    .and_then(|s| s.after(&after).next())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: ScheduleId,
    pub kind: ScheduleKind,
    pub schedule: ScheduleSpec,
    pub task: String,
    pub priority: u8,
    pub created_at: DateTime<Utc>,
    pub raw_input: String,
}

impl ScheduleEntry {
    pub fn new_oneoff(task: impl Into<String>, at: DateTime<Utc>, priority: u8, raw_input: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ScheduleKind::Oneoff,
            schedule: ScheduleSpec::At(at),
            task: task.into(),
            priority: priority.clamp(1, 10),
            created_at: Utc::now(),
            raw_input: raw_input.into(),
        }
    }

    pub fn new_heartbeat(task: impl Into<String>, cron_expr: impl Into<String>, priority: u8, raw_input: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ScheduleKind::Heartbeat,
            schedule: ScheduleSpec::Cron(cron_expr.into()),
            task: task.into(),
            priority: priority.clamp(1, 10),
            created_at: Utc::now(),
            raw_input: raw_input.into(),
        }
    }

    /// True if this is a one-off whose absolute instant has already
    /// passed — fired immediately on load with a "(delayed)" marker, then
    /// deleted.
    pub fn is_past_due_oneoff(&self, now: DateTime<Utc>) -> bool {
        self.kind == ScheduleKind::Oneoff && matches!(&self.schedule, ScheduleSpec::At(at) if *at <= now)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ScheduleFile {
    entries: Vec<ScheduleEntry>,
}

/// One instance per file (`heartbeat-schedules.json` or
/// `scheduled-tasks.json`), kept separate per the spec's §6 persisted
/// state list rather than collapsed into one file with a `kind` filter —
/// mirrors [`crate::scheduler::store::JobStore`]'s one-store-one-file
/// shape but without its `jobs` subdirectory nesting.
pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    pub fn new(data_dir: impl AsRef<Path>, file_name: &str) -> Self {
        Self {
            path: data_dir.as_ref().join(file_name),
        }
    }

    pub fn heartbeats(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir, "heartbeat-schedules.json")
    }

    pub fn oneoffs(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir, "scheduled-tasks.json")
    }

    pub fn load(&self) -> Result<Vec<ScheduleEntry>> {
        let file: ScheduleFile = read_json_or_default(&self.path)?;
        Ok(file.entries)
    }

    pub fn save(&self, entries: &[ScheduleEntry]) -> Result<()> {
        let file = ScheduleFile {
            entries: entries.to_vec(),
        };
        write_json_atomic(&self.path, &file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_due_oneoff_is_detected() {
        let entry = ScheduleEntry::new_oneoff("say hi", Utc::now() - chrono::Duration::minutes(5), 5, "in 5 minutes say hi");
        assert!(entry.is_past_due_oneoff(Utc::now()));
    }

    #[test]
    fn future_oneoff_is_not_past_due() {
        let entry = ScheduleEntry::new_oneoff("say hi", Utc::now() + chrono::Duration::minutes(5), 5, "in 5 minutes say hi");
        assert!(!entry.is_past_due_oneoff(Utc::now()));
    }

    #[test]
    fn cron_next_fire_advances() {
        let entry = ScheduleEntry::new_heartbeat("heartbeat", "0 */15 * * * *", 3, "every 15 minutes");
        let next = entry.schedule.next_fire_after(Utc::now());
        assert!(next.is_some());
        assert!(next.unwrap() > Utc::now());
    }

    #[test]
    fn round_trip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::heartbeats(dir.path());
        let entry = ScheduleEntry::new_heartbeat("heartbeat", "0 */15 * * * *", 3, "every 15 minutes");
        store.save(&[entry.clone()]).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, entry.id);
    }
}
