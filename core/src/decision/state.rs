//! Per-action step state
//!
//! Unlike the teacher's `AgentState` (immutable, `with_*`-consuming,
//! re-snapshotted each step), this state is deliberately a single mutable
//! value owned by one DecisionLoop run: every guardrail policy needs to
//! read *and* update counters in the same pass (skill call counts, the
//! recent-skill ring buffer, consecutive failures), and threading a fresh
//! immutable copy through seventeen policies in one step buys nothing here.

use crate::contracts::ToolCall;
use std::collections::{HashMap, VecDeque};

const RECENT_SKILL_WINDOW: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct StepState {
    pub step_count: usize,
    pub messages_sent: usize,
    pub sent_message_texts: Vec<String>,
    pub skill_call_counts: HashMap<String, u32>,
    pub recent_skills: VecDeque<(String, String)>,
    pub consecutive_tool_failures: HashMap<String, u32>,
    pub deep_tool_executed_since_last_message: bool,
    pub steps_since_last_message: usize,
    pub image_generated_in_action: bool,
    pub last_decision_signature: Option<String>,
    pub same_signature_streak: u32,
    pub planning_only_streak: u32,
    pub no_tool_retries: u32,
    pub silent_termination_retries: u32,
    pub browser_steps_since_message: usize,
    pub non_browser_steps_since_message: usize,
    pub banned_skills: Vec<String>,
    pub message_budget_bonus: usize,
}

impl StepState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_step(&mut self) {
        self.step_count += 1;
        self.steps_since_last_message += 1;
    }

    /// Bumps the browser or non-browser silent-step counter, depending on
    /// whether this step's whole tool batch was browser/computer-use
    /// tools. Reset to 0 in [`Self::record_message_sent`].
    pub fn record_step_kind(&mut self, all_browser: bool) {
        if all_browser {
            self.browser_steps_since_message += 1;
        } else {
            self.non_browser_steps_since_message += 1;
        }
    }

    pub fn record_skill_call(&mut self, call: &ToolCall) {
        *self.skill_call_counts.entry(call.name.clone()).or_insert(0) += 1;
        let fingerprint = arg_key_fingerprint(&call.args);
        self.recent_skills.push_back((call.name.clone(), fingerprint));
        while self.recent_skills.len() > RECENT_SKILL_WINDOW {
            self.recent_skills.pop_front();
        }
    }

    pub fn record_skill_call_batch(&mut self, calls: &[ToolCall]) {
        for call in calls {
            self.record_skill_call(call);
        }
    }

    pub fn record_tool_failure(&mut self, tool: &str) -> u32 {
        let count = self.consecutive_tool_failures.entry(tool.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn record_tool_success(&mut self, tool: &str) {
        self.consecutive_tool_failures.remove(tool);
    }

    pub fn record_message_sent(&mut self, text: String) {
        self.messages_sent += 1;
        self.sent_message_texts.push(text);
        self.steps_since_last_message = 0;
        self.browser_steps_since_message = 0;
        self.non_browser_steps_since_message = 0;
        self.deep_tool_executed_since_last_message = false;
    }

    pub fn already_sent(&self, text: &str) -> bool {
        self.sent_message_texts.iter().any(|s| s == text)
    }

    pub fn decision_signature(calls: &[ToolCall]) -> String {
        calls.iter().map(ToolCall::signature).collect::<Vec<_>>().join("|")
    }

    /// Update the repeat streak against the previous decision's signature,
    /// returning the new streak.
    pub fn update_signature_streak(&mut self, signature: &str) -> u32 {
        if self.last_decision_signature.as_deref() == Some(signature) {
            self.same_signature_streak += 1;
        } else {
            self.same_signature_streak = 1;
        }
        self.last_decision_signature = Some(signature.to_string());
        self.same_signature_streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_step_kind_increments_the_matching_counter() {
        let mut state = StepState::new();
        state.record_step_kind(true);
        state.record_step_kind(true);
        state.record_step_kind(false);
        assert_eq!(state.browser_steps_since_message, 2);
        assert_eq!(state.non_browser_steps_since_message, 1);
    }

    #[test]
    fn record_message_sent_resets_both_step_kind_counters() {
        let mut state = StepState::new();
        state.record_step_kind(true);
        state.record_step_kind(false);
        state.record_message_sent("done".to_string());
        assert_eq!(state.browser_steps_since_message, 0);
        assert_eq!(state.non_browser_steps_since_message, 0);
    }
}

/// Fingerprint that captures argument *keys* only, not values — used by
/// the pattern-based loop detector (policy 5), which should trip on
/// `A,B,A,B,A,B` with identical shapes but not when args genuinely differ.
pub fn arg_key_fingerprint(args: &serde_json::Value) -> String {
    match args {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            keys.into_iter().cloned().collect::<Vec<_>>().join(",")
        }
        other => other.to_string(),
    }
}
