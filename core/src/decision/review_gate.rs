//! ReviewGate
//!
//! A secondary LLM consultation invoked before any forced kill (message
//! budget, skill-frequency ceiling, max-steps exhaustion). Builds a
//! compact prompt and expects a strict JSON verdict back; any parse or
//! provider failure defaults to `Terminate` — the same fail-closed
//! posture the teacher's `RetryExecutor` takes on an unparseable tool
//! response (`agent/runtime/impls/retry.rs`).

use crate::contracts::{CompletionClient, CompletionError};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewReason {
    MessageBudget,
    SkillFrequencyCeiling,
    StepExhaustion,
}

impl ReviewReason {
    fn label(self) -> &'static str {
        match self {
            ReviewReason::MessageBudget => "message budget exhausted",
            ReviewReason::SkillFrequencyCeiling => "skill-frequency ceiling breached",
            ReviewReason::StepExhaustion => "step budget exhausted",
        }
    }
}

pub struct ReviewContext<'a> {
    pub task_description: &'a str,
    pub reason: ReviewReason,
    pub detail: &'a str,
    pub current_step: usize,
    pub recent_memories: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewVerdict {
    Continue,
    Terminate,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    decision: String,
    #[allow(dead_code)]
    #[serde(default)]
    reason: String,
}

pub struct ReviewGate;

impl ReviewGate {
    pub fn new() -> Self {
        Self
    }

    pub async fn consult(&self, client: &dyn CompletionClient, ctx: ReviewContext<'_>) -> ReviewVerdict {
        let prompt = build_prompt(&ctx);
        match client.complete(&prompt, SYSTEM_PROMPT).await {
            Ok(response) => parse_verdict(&response),
            Err(_) => ReviewVerdict::Terminate,
        }
    }
}

impl Default for ReviewGate {
    fn default() -> Self {
        Self::new()
    }
}

const SYSTEM_PROMPT: &str = "You are a strict reviewer deciding whether an autonomous agent should be granted more time. Respond with only a JSON object: {\"decision\": \"continue\"|\"terminate\", \"reason\": string}.";

fn build_prompt(ctx: &ReviewContext) -> String {
    let memory_tail = if ctx.recent_memories.is_empty() {
        "(none)".to_string()
    } else {
        ctx.recent_memories.join("\n")
    };
    format!(
        "Task: {}\n\nReason for review: {}\nDetail: {}\nCurrent step: {}\n\nRecent memories:\n{}\n\nShould this task continue?",
        ctx.task_description,
        ctx.reason.label(),
        ctx.detail,
        ctx.current_step,
        memory_tail,
    )
}

fn parse_verdict(response: &str) -> ReviewVerdict {
    let trimmed = response.trim();
    match serde_json::from_str::<RawVerdict>(trimmed) {
        Ok(raw) if raw.decision.eq_ignore_ascii_case("continue") => ReviewVerdict::Continue,
        Ok(_) => ReviewVerdict::Terminate,
        Err(_) => ReviewVerdict::Terminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubClient(&'static str);

    #[async_trait::async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, CompletionError> {
            Ok(self.0.to_string())
        }
        async fn analyze_media(&self, _path: &str, _prompt: &str) -> Result<String, CompletionError> {
            Ok(String::new())
        }
    }

    struct FailingClient;

    #[async_trait::async_trait]
    impl CompletionClient for FailingClient {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, CompletionError> {
            Err(CompletionError::Request("timed out".into()))
        }
        async fn analyze_media(&self, _path: &str, _prompt: &str) -> Result<String, CompletionError> {
            Ok(String::new())
        }
    }

    fn ctx() -> ReviewContext<'static> {
        ReviewContext {
            task_description: "research the latest rust release",
            reason: ReviewReason::SkillFrequencyCeiling,
            detail: "web_search called 15 times",
            current_step: 14,
            recent_memories: &[],
        }
    }

    #[tokio::test]
    async fn continue_decision_is_honored() {
        let client = StubClient(r#"{"decision": "continue", "reason": "making progress"}"#);
        let gate = ReviewGate::new();
        assert_eq!(gate.consult(&client, ctx()).await, ReviewVerdict::Continue);
    }

    #[tokio::test]
    async fn malformed_json_defaults_to_terminate() {
        let client = StubClient("not json at all");
        let gate = ReviewGate::new();
        assert_eq!(gate.consult(&client, ctx()).await, ReviewVerdict::Terminate);
    }

    #[tokio::test]
    async fn provider_error_defaults_to_terminate() {
        let client = FailingClient;
        let gate = ReviewGate::new();
        assert_eq!(gate.consult(&client, ctx()).await, ReviewVerdict::Terminate);
    }

    #[tokio::test]
    async fn explicit_terminate_decision_is_honored() {
        let client = StubClient(r#"{"decision": "terminate", "reason": "no progress"}"#);
        let gate = ReviewGate::new();
        assert_eq!(gate.consult(&client, ctx()).await, ReviewVerdict::Terminate);
    }
}
