//! MemoryEntry store — `memory.json`
//!
//! Distinct from [`crate::memory::store::VectorStore`], which is the
//! embedding-backed recall layer the skill surface consumes for semantic
//! search (out of scope for the core per the spec). This module is the
//! append-log the DecisionLoop itself reads and writes every step: task
//! starts/conclusions, tool observations, guardrail denials, and injected
//! "try something else" nudges.

use crate::persist::{read_json_or_default, write_json_atomic};
use crate::queue::ActionId;
use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryEntryType {
    Short,
    Episodic,
    Long,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<ActionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub r#type: MemoryEntryType,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: MemoryMetadata,
}

impl MemoryEntry {
    pub fn new(r#type: MemoryEntryType, content: impl Into<String>, metadata: MemoryMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            r#type,
            content: content.into(),
            timestamp: Utc::now(),
            metadata,
        }
    }

    /// Step-scoped entries are tied to one action and purged when it
    /// reaches a terminal state. Episodic task-start/conclusion entries
    /// are tagged with an `action_id` too but survive purge because their
    /// `type` is `Episodic`, not `Short`.
    pub fn is_step_scoped(&self) -> bool {
        self.r#type == MemoryEntryType::Short && self.metadata.action_id.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MemoryFile {
    memories: Vec<MemoryEntry>,
}

/// The core's view of memory: a flat, append-mostly log, single-writer
/// (the dispatcher), persisted as one JSON file.
pub struct AgentMemoryManager {
    inner: Mutex<Vec<MemoryEntry>>,
    path: PathBuf,
}

impl AgentMemoryManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let path = data_dir.into().join("memory.json");
        let file: MemoryFile = read_json_or_default(&path)?;
        Ok(Self {
            inner: Mutex::new(file.memories),
            path,
        })
    }

    fn flush(&self, memories: &[MemoryEntry]) {
        let file = MemoryFile {
            memories: memories.to_vec(),
        };
        let _ = write_json_atomic(&self.path, &file);
    }

    pub fn write(&self, entry: MemoryEntry) {
        let mut memories = self.inner.lock();
        memories.push(entry);
        self.flush(&memories);
    }

    pub fn write_short(&self, action_id: ActionId, content: impl Into<String>) {
        self.write(MemoryEntry::new(
            MemoryEntryType::Short,
            content,
            MemoryMetadata {
                action_id: Some(action_id),
                ..Default::default()
            },
        ));
    }

    pub fn write_episodic(&self, action_id: ActionId, content: impl Into<String>) {
        self.write(MemoryEntry::new(
            MemoryEntryType::Episodic,
            content,
            MemoryMetadata {
                action_id: Some(action_id),
                ..Default::default()
            },
        ));
    }

    /// All step-scoped memories for `action_id`, oldest first — feeds the
    /// next DecisionLoop deliberation and the ReviewGate prompt tail.
    pub fn step_scoped_for(&self, action_id: ActionId) -> Vec<MemoryEntry> {
        self.inner
            .lock()
            .iter()
            .filter(|m| m.r#type == MemoryEntryType::Short && m.metadata.action_id == Some(action_id))
            .cloned()
            .collect()
    }

    pub fn episodic_for(&self, action_id: ActionId) -> Vec<MemoryEntry> {
        self.inner
            .lock()
            .iter()
            .filter(|m| m.r#type == MemoryEntryType::Episodic && m.metadata.action_id == Some(action_id))
            .cloned()
            .collect()
    }

    /// Drop all step-scoped memories for a terminal action. Episodic
    /// conclusions are untouched.
    pub fn purge_step_scoped(&self, action_id: ActionId) -> usize {
        let mut memories = self.inner.lock();
        let before = memories.len();
        memories.retain(|m| {
            !(m.r#type == MemoryEntryType::Short && m.metadata.action_id == Some(action_id))
        });
        let removed = before - memories.len();
        if removed > 0 {
            self.flush(&memories);
        }
        removed
    }

    /// Fires an asynchronous consolidation pass for a just-finished action
    /// without blocking the caller. The teacher's [`crate::memory::scribe::Scribe`]
    /// does the real fact-extraction-into-categories work here, but that
    /// pipeline is embedding-backed — semantic recall is out of scope, so
    /// this only records that consolidation ran. Keeps the exit hook the
    /// DecisionLoop needs without pulling in `VectorStore`.
    pub fn trigger_consolidation(self: &Arc<Self>, action_id: ActionId) {
        let episodic_count = self.episodic_for(action_id).len();
        let mgr = self.clone();
        tokio::spawn(async move {
            mgr.write(MemoryEntry::new(
                MemoryEntryType::Episodic,
                format!("memory consolidation ran over {episodic_count} episodic entries"),
                MemoryMetadata {
                    action_id: Some(action_id),
                    ..Default::default()
                },
            ));
        });
    }

    /// Most recent `n` entries across all actions, newest last — used by
    /// the heartbeat prompt builder and the ReviewGate.
    pub fn tail(&self, n: usize) -> Vec<MemoryEntry> {
        let memories = self.inner.lock();
        let len = memories.len();
        memories[len.saturating_sub(n)..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purge_step_scoped_keeps_episodic_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = AgentMemoryManager::new(dir.path()).unwrap();
        let action_id = ActionId::new_v4();

        mgr.write_short(action_id, "observed tool output");
        mgr.write_episodic(action_id, "task-start");
        mgr.write_episodic(action_id, "task-conclusion");

        assert_eq!(mgr.step_scoped_for(action_id).len(), 1);
        let removed = mgr.purge_step_scoped(action_id);
        assert_eq!(removed, 1);
        assert!(mgr.step_scoped_for(action_id).is_empty());
        assert_eq!(mgr.episodic_for(action_id).len(), 2);
    }

    #[test]
    fn tail_returns_most_recent_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = AgentMemoryManager::new(dir.path()).unwrap();
        let action_id = ActionId::new_v4();
        for i in 0..5 {
            mgr.write_short(action_id, format!("entry {}", i));
        }
        let tail = mgr.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[1].content, "entry 4");
    }
}
