//! AgentInstance — an orchestrator-level worker record (§3).
//!
//! Distinct from the teacher's [`crate::agent::worker::WorkerHandle`]
//! (an in-process tokio-task handle): this is the persisted, IPC-facing
//! record the Orchestrator tracks across worker process restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use uuid::Uuid;

pub type AgentId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Working,
    Paused,
    Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInstance {
    pub id: AgentId,
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<AgentId>,
    pub capabilities: BTreeSet<String>,
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<Uuid>,
    pub memory_path: PathBuf,
    pub profile_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The implicit primary instance is never terminable and always has
/// id `Uuid::nil()`, mirroring the spec's "one `primary` instance is
/// implicit and never terminable".
pub const PRIMARY_AGENT_ID: Uuid = Uuid::nil();

impl AgentInstance {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        parent_id: Option<AgentId>,
        capabilities: impl IntoIterator<Item = String>,
        data_dir: PathBuf,
    ) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Self {
            id,
            name: name.into(),
            role: role.into(),
            parent_id,
            capabilities: normalize_capabilities(capabilities),
            status: AgentStatus::Idle,
            current_task: None,
            memory_path: data_dir.join(format!("worker-{}", id)).join("memory.json"),
            profile_path: data_dir.join(format!("worker-{}", id)).join("profile.md"),
            pid: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminable(&self) -> bool {
        self.id != PRIMARY_AGENT_ID
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Lowercases, trims, de-duplicates, drops empty strings, and always
/// includes `"execute"` — §4.6's capability normalization rule.
pub fn normalize_capabilities(caps: impl IntoIterator<Item = String>) -> BTreeSet<String> {
    let mut set: BTreeSet<String> = caps
        .into_iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect();
    set.insert("execute".to_string());
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_always_includes_execute() {
        let caps = normalize_capabilities(vec![]);
        assert!(caps.contains("execute"));
    }

    #[test]
    fn normalize_dedupes_and_lowercases() {
        let caps = normalize_capabilities(vec![
            " Research ".to_string(),
            "research".to_string(),
            "".to_string(),
            "WRITE".to_string(),
        ]);
        assert_eq!(caps.len(), 3); // research, write, execute
        assert!(caps.contains("research"));
        assert!(caps.contains("write"));
    }

    #[test]
    fn primary_is_never_terminable() {
        let mut primary = AgentInstance::new("primary", "primary", None, vec![], PathBuf::from("/tmp"));
        primary.id = PRIMARY_AGENT_ID;
        assert!(!primary.is_terminable());
    }
}
