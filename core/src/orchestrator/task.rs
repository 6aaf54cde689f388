//! DelegatedTask — orchestrator-level unit of delegated work (§3).
//!
//! Distinct from [`crate::queue::Action`]: an `Action` is what a
//! dispatcher's own DecisionLoop executes; a `DelegatedTask` is what the
//! primary hands to a worker over IPC and waits on.

use crate::orchestrator::agent::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type TaskId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegatedTaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegatedTask {
    pub id: TaskId,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<AgentId>,
    pub status: DelegatedTaskStatus,
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl DelegatedTask {
    pub fn new(description: impl Into<String>, priority: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            assigned_to: None,
            status: DelegatedTaskStatus::Pending,
            priority: priority.clamp(1, 10),
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, DelegatedTaskStatus::Completed | DelegatedTaskStatus::Failed)
    }

    /// Invariant: `assigned_to` is set iff status is one of
    /// assigned/in-progress/terminal-from-that-worker.
    pub fn invariant_holds(&self) -> bool {
        match self.status {
            DelegatedTaskStatus::Pending => self.assigned_to.is_none(),
            DelegatedTaskStatus::Assigned | DelegatedTaskStatus::InProgress => self.assigned_to.is_some(),
            DelegatedTaskStatus::Completed | DelegatedTaskStatus::Failed => true,
        }
    }

    pub fn revert_to_pending(&mut self, reason: impl Into<String>) {
        self.assigned_to = None;
        self.status = DelegatedTaskStatus::Pending;
        self.error = Some(reason.into());
    }

    pub fn mark_completed(&mut self, result: Value) {
        self.status = DelegatedTaskStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = DelegatedTaskStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_satisfies_invariant() {
        let task = DelegatedTask::new("research something", 5);
        assert!(task.invariant_holds());
        assert_eq!(task.status, DelegatedTaskStatus::Pending);
    }

    #[test]
    fn revert_clears_assignment_and_records_reason() {
        let mut task = DelegatedTask::new("research something", 5);
        task.assigned_to = Some(Uuid::new_v4());
        task.status = DelegatedTaskStatus::InProgress;
        task.revert_to_pending("worker exited unexpectedly with code 1");
        assert_eq!(task.status, DelegatedTaskStatus::Pending);
        assert!(task.assigned_to.is_none());
        assert!(task.error.as_deref().unwrap().contains("exited unexpectedly"));
    }
}
