//! Action data model
//!
//! `Action` is the unit of work the dispatcher picks up. It is intentionally
//! a plain serializable struct with no runtime handles (no `Arc`, no
//! `Mutex`) so that the whole queue round-trips through `actions.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type ActionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
    Pending,
    Waiting,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    User,
    Autonomy,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RetryInfo {
    pub attempts: u32,
    pub max_attempts: u32,
}

/// Everything about an action besides its queue-level bookkeeping.
///
/// Kept as a loose bag of optional fields (mirroring the spec's data
/// model) rather than a deep type hierarchy: the dispatcher only ever
/// patches a handful of these at a time and serializes the rest back out
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActionPayload {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub is_heartbeat: bool,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub requires_response: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_user_message_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumed_from_waiting_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    #[serde(default = "Action::default_type")]
    pub r#type: String,
    pub priority: u8,
    pub lane: Lane,
    pub status: ActionStatus,
    pub payload: ActionPayload,
    pub timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryInfo>,
}

impl Action {
    fn default_type() -> String {
        "TASK".to_string()
    }

    pub fn new(priority: u8, lane: Lane, payload: ActionPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            r#type: Self::default_type(),
            priority: priority.clamp(1, 10),
            lane,
            status: ActionStatus::Pending,
            payload,
            timestamp: now,
            updated_at: now,
            retry: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ActionStatus::Completed | ActionStatus::Failed)
    }

    /// Apply a patch of payload fields, merging rather than replacing.
    /// Unknown keys are ignored; this mirrors the spec's `updatePayload`,
    /// which merges a partial object into the existing payload.
    pub fn apply_payload_patch(&mut self, patch: Value) {
        if let Value::Object(map) = patch {
            for (key, value) in map {
                apply_field(&mut self.payload, &key, value);
            }
        }
        self.updated_at = Utc::now();
    }
}

fn apply_field(payload: &mut ActionPayload, key: &str, value: Value) {
    match key {
        "description" => {
            if let Some(s) = value.as_str() {
                payload.description = s.to_string();
            }
        }
        "source" => payload.source = value.as_str().map(str::to_string),
        "sourceId" | "source_id" => payload.source_id = value.as_str().map(str::to_string),
        "userId" | "user_id" => payload.user_id = value.as_str().map(str::to_string),
        "chatId" | "chat_id" => payload.chat_id = value.as_str().map(str::to_string),
        "messageId" | "message_id" => payload.message_id = value.as_str().map(str::to_string),
        "senderName" | "sender_name" => payload.sender_name = value.as_str().map(str::to_string),
        "isHeartbeat" | "is_heartbeat" => {
            if let Some(b) = value.as_bool() {
                payload.is_heartbeat = b;
            }
        }
        "isOwner" | "is_owner" => {
            if let Some(b) = value.as_bool() {
                payload.is_owner = b;
            }
        }
        "isAdmin" | "is_admin" => {
            if let Some(b) = value.as_bool() {
                payload.is_admin = b;
            }
        }
        "requiresResponse" | "requires_response" => {
            if let Some(b) = value.as_bool() {
                payload.requires_response = b;
            }
        }
        "lastUserMessageText" | "last_user_message_text" => {
            payload.last_user_message_text = value.as_str().map(str::to_string);
        }
        _ => {}
    }
}
