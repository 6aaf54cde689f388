//! Narrow interfaces to the collaborators this crate treats as external:
//! the LLM provider, the chat channel adapters, and the skill/tool plugin
//! surface. None of these are implemented here — only the traits the
//! DecisionLoop, GuardrailEngine, and Orchestrator are written against.
//!
//! Mirrors the split already in `agent::runtime::capability`, where
//! `LLMCapability`/`ToolCapability`/`ApprovalCapability` are traits the
//! runtime depends on without knowing a concrete implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider returned an unparseable response: {0}")]
    Malformed(String),
}

/// The LLM provider boundary. Concrete clients (OpenAI, Claude, Gemini,
/// ...) live outside this crate; the DecisionLoop, complexity classifier,
/// and ReviewGate only ever see this trait.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, CompletionError>;
    async fn analyze_media(&self, path: &str, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel '{channel}' send failed: {reason}")]
    SendFailed { channel: String, reason: String },
    #[error("channel '{0}' is not registered")]
    Unknown(String),
}

/// A chat channel adapter. `send_message` is the one the GuardrailEngine's
/// one-send-per-step and cooldown policies gate most closely.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;
    async fn send_message(&self, to: &str, text: &str) -> Result<(), ChannelError>;
    async fn send_file(&self, to: &str, path: &str, caption: Option<&str>) -> Result<(), ChannelError>;
    async fn send_voice_note(&self, to: &str, path: &str) -> Result<(), ChannelError>;
    async fn react(&self, to: &str, message_id: &str, emoji: &str) -> Result<(), ChannelError>;
}

/// Registry of channel adapters keyed by channel name (`"telegram"`,
/// `"discord"`, ...), used by the ChannelPolicy to resolve a send target.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: HashMap<String, std::sync::Arc<dyn Channel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: std::sync::Arc<dyn Channel>) {
        self.channels.insert(channel.name().to_string(), channel);
    }

    pub fn get(&self, name: &str) -> Option<std::sync::Arc<dyn Channel>> {
        self.channels.get(name).cloned()
    }

    /// Names of every registered adapter, for the heartbeat prompt's
    /// "Active channels" line.
    pub fn names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }
}

/// A tool call proposed by the DecisionEngine: a name and a JSON argument
/// bag. Handlers validate and coerce `args` themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// `(name, args)` fingerprint used for intra-step and cross-step dedup.
    pub fn signature(&self) -> String {
        format!("{}:{}", self.name, self.args)
    }
}

/// Outcome of executing a tool. Structured success/failure takes priority;
/// a bare string is classified by an `Error`/`Failed` prefix, matching the
/// spec's "structured when available, else string-prefix" rule.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    Structured { success: bool, detail: String },
    Text(String),
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            ToolOutcome::Structured { success, .. } => *success,
            ToolOutcome::Text(s) => !(s.starts_with("Error") || s.starts_with("Failed")),
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ToolOutcome::Structured { detail, .. } => detail,
            ToolOutcome::Text(s) => s,
        }
    }
}

#[derive(Debug, Error)]
pub enum SkillError {
    #[error("skill '{0}' is not registered")]
    Unknown(String),
}

/// A skill/tool plugin. Handlers are opaque beyond this trait: the
/// DecisionLoop never inspects their implementation, only their name,
/// `usage`/`description` (for prompt building), and outcome.
#[async_trait]
pub trait Skill: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn usage(&self) -> &str;
    async fn handler(&self, args: serde_json::Value) -> ToolOutcome;
}

#[derive(Default)]
pub struct SkillRegistry {
    skills: HashMap<String, std::sync::Arc<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, skill: std::sync::Arc<dyn Skill>) {
        self.skills.insert(skill.name().to_string(), skill);
    }

    pub fn get(&self, name: &str) -> Option<std::sync::Arc<dyn Skill>> {
        self.skills.get(name).cloned()
    }

    pub async fn execute(&self, call: &ToolCall) -> Result<ToolOutcome, SkillError> {
        let skill = self
            .get(&call.name)
            .ok_or_else(|| SkillError::Unknown(call.name.clone()))?;
        Ok(skill.handler(call.args.clone()).await)
    }

    pub fn prompt_descriptors(&self) -> Vec<(String, String, String)> {
        self.skills
            .values()
            .map(|s| (s.name().to_string(), s.description().to_string(), s.usage().to_string()))
            .collect()
    }
}
