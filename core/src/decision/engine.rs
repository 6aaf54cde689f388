//! DecisionEngine — the LLM call that proposes the next step.
//!
//! Unlike the teacher's [`crate::agent::cognition::engine::CognitiveEngine`],
//! which is pure and emits `AgentDecision::RequestLLM` for the runtime to
//! fulfill, this trait owns the LLM round trip itself: the DecisionLoop
//! needs a single awaitable `decide()` call per step, guardrail evaluation
//! and tool execution in between steps, not a request/fulfill split.

use crate::contracts::{CompletionClient, SkillRegistry, ToolCall};
use crate::decision::state::StepState;
use crate::memory::MemoryEntry;
use crate::queue::Action;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Verification {
    pub goals_met: bool,
    #[serde(default)]
    pub analysis: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolCall>,
    pub verification: Verification,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("llm request failed: {0}")]
    Request(String),
    #[error("could not parse a decision out of the model response: {0}")]
    Unparseable(String),
}

/// The one-LLM-call-per-step proposal source. `decide` returns a
/// [`Decision`] — never throws for a refused/empty proposal, only for a
/// transport-level failure, matching §9's "decision outcomes are data,
/// never exceptions".
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn decide(&self, action: &Action, step_state: &StepState, history: &[MemoryEntry]) -> Result<Decision, EngineError>;

    /// One-shot execution-plan simulation for non-trivial/non-simple
    /// tasks, built once before the main loop starts.
    async fn build_plan(&self, description: &str) -> Result<String, EngineError>;
}

/// Default [`DecisionEngine`]: a single structured-JSON completion call
/// per step, in the same "ask for strict JSON, tolerate code fences"
/// style as [`crate::decision::review_gate::ReviewGate`].
pub struct LlmDecisionEngine {
    client: std::sync::Arc<dyn CompletionClient>,
    skills: std::sync::Arc<SkillRegistry>,
    system_prompt: String,
}

impl LlmDecisionEngine {
    pub fn new(client: std::sync::Arc<dyn CompletionClient>, skills: std::sync::Arc<SkillRegistry>) -> Self {
        Self {
            client,
            skills,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    fn tool_catalog(&self) -> String {
        self.skills
            .prompt_descriptors()
            .into_iter()
            .map(|(name, desc, usage)| format!("- {name}: {desc}\n  usage: {usage}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are an autonomous task executor. Respond with a single JSON object: \
{\"reasoning\": string, \"content\": string|null, \"tools\": [{\"name\": string, \"args\": object}], \
\"verification\": {\"goals_met\": boolean, \"analysis\": string}}. Only the JSON object, nothing else.";

#[async_trait]
impl DecisionEngine for LlmDecisionEngine {
    async fn decide(&self, action: &Action, step_state: &StepState, history: &[MemoryEntry]) -> Result<Decision, EngineError> {
        let history_text = history
            .iter()
            .map(|m| format!("- {}", m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Task: {}\n\nAvailable tools:\n{}\n\nStep: {}\nMessages sent so far: {}\n\nRecent memory:\n{}\n\nWhat should happen next?",
            action.payload.description,
            self.tool_catalog(),
            step_state.step_count,
            step_state.messages_sent,
            if history_text.is_empty() { "(none)".to_string() } else { history_text },
        );

        let response = self
            .client
            .complete(&prompt, &self.system_prompt)
            .await
            .map_err(|e| EngineError::Request(e.to_string()))?;

        parse_decision(&response)
    }

    async fn build_plan(&self, description: &str) -> Result<String, EngineError> {
        let prompt = format!(
            "Sketch a brief numbered execution plan (no more than 5 steps) for this task, without executing anything:\n\n{}",
            description
        );
        self.client
            .complete(&prompt, "You are a terse planning assistant.")
            .await
            .map_err(|e| EngineError::Request(e.to_string()))
    }
}

fn parse_decision(response: &str) -> Result<Decision, EngineError> {
    let trimmed = strip_code_fence(response.trim());
    serde_json::from_str(trimmed).map_err(|e| EngineError::Unparseable(e.to_string()))
}

fn strip_code_fence(s: &str) -> &str {
    let s = s.strip_prefix("```json").or_else(|| s.strip_prefix("```")).unwrap_or(s);
    s.strip_suffix("```").unwrap_or(s).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_decision() {
        let raw = r#"{"reasoning":"look things up","content":null,"tools":[{"name":"web_search","args":{"q":"rust"}}],"verification":{"goals_met":false,"analysis":"need more info"}}"#;
        let decision = parse_decision(raw).unwrap();
        assert_eq!(decision.tools.len(), 1);
        assert!(!decision.verification.goals_met);
    }

    #[test]
    fn strips_markdown_code_fences() {
        let raw = "```json\n{\"tools\":[],\"verification\":{\"goals_met\":true,\"analysis\":\"done\"}}\n```";
        let decision = parse_decision(raw).unwrap();
        assert!(decision.verification.goals_met);
    }

    #[test]
    fn malformed_json_is_an_error_not_a_panic() {
        assert!(parse_decision("not json").is_err());
    }
}
