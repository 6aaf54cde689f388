//! Worker IPC wire format (§4.6, §6)
//!
//! Newline-delimited JSON frames over the worker child process's stdin/
//! stdout, the same shape the spec gives for both directions. Mirrors the
//! teacher's [`crate::agent::contract::transport::EventTransport`]
//! abstraction (publish/next_batch over an opaque channel) but with a
//! concrete process-pipe implementation, since the spec requires real
//! forked processes rather than in-process tokio tasks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parent -> worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ParentMessage {
    Init {
        data_dir: String,
        config: Value,
    },
    Task {
        task_id: String,
        payload: Value,
    },
    Command {
        action: String,
    },
    Ping,
    StatusRequest,
    Shutdown,
}

/// Worker -> parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerMessage {
    Ready,
    TaskStarted {
        task_id: String,
    },
    TaskCompleted {
        task_id: String,
        result: Value,
    },
    TaskFailed {
        task_id: String,
        error: String,
    },
    Status {
        idle: bool,
    },
    Pong,
    Log {
        level: String,
        message: String,
    },
    Error {
        message: String,
    },
}

impl ParentMessage {
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl WorkerMessage {
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parent_init_round_trips() {
        let msg = ParentMessage::Init {
            data_dir: "/tmp/worker-1".into(),
            config: json!({"lane": "autonomy"}),
        };
        let line = msg.to_line().unwrap();
        let back: ParentMessage = serde_json::from_str(&line).unwrap();
        assert!(matches!(back, ParentMessage::Init { .. }));
    }

    #[test]
    fn worker_task_completed_round_trips() {
        let msg = WorkerMessage::TaskCompleted {
            task_id: "t1".into(),
            result: json!({"ok": true}),
        };
        let line = msg.to_line().unwrap();
        let back = WorkerMessage::from_line(&line).unwrap();
        assert!(matches!(back, WorkerMessage::TaskCompleted { .. }));
    }

    #[test]
    fn unknown_shape_fails_to_parse_rather_than_panicking() {
        assert!(WorkerMessage::from_line("{\"type\": \"not-a-real-variant\"}").is_err());
    }
}
