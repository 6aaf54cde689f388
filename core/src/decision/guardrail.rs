//! GuardrailEngine
//!
//! A pure, synchronous evaluator — no IO, no async — deliberately mirroring
//! the teacher's `CognitiveEngine` purity rule (`cognition/engine.rs`: "no
//! async, no IO, no external deps"). It takes the DecisionEngine's proposed
//! tool batch plus the action's `StepState` and emits a filtered batch, an
//! optional forced break, and memories to inject before the next
//! deliberation.

use super::question::QuestionDetector;
use super::state::{arg_key_fingerprint, StepState};
use crate::channel_policy::{is_elevated_skill, ChannelPolicy};
use crate::contracts::ToolCall;
use crate::decision::complexity::ComplexityProfile;
use crate::queue::model::Lane;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tools exempt from the skill-frequency ceiling's default cap of 5,
/// capped at 15 instead — open-ended investigative tools that
/// legitimately need more iterations than a typical write/send action.
pub const RESEARCH_TOOLS: &[&str] = &[
    "web_search",
    "extract_article",
    "http_fetch",
    "recall_memory",
];

fn is_research_tool(name: &str) -> bool {
    RESEARCH_TOOLS.contains(&name) || is_browser_tool(name)
}

/// Browser/computer-use tools, tracked separately from other tool calls
/// for the progress-nudge policy (17), which gives browser sessions a
/// tighter silent-step leash than other work.
pub fn is_browser_tool(name: &str) -> bool {
    name.starts_with("browser_") || name.starts_with("computer_")
}

/// Tools that don't count as "real progress" for the planning-only-loop
/// and cooldown/deep-tool-executed checks.
pub const NON_DEEP_TOOLS: &[&str] = &[
    "journal",
    "learning",
    "identity",
    "screenshot",
    "trace_start",
    "trace_stop",
    "request_supporting_data",
];

fn is_non_deep_tool(name: &str) -> bool {
    NON_DEEP_TOOLS.contains(&name)
}

const SEND_TOOLS: &[&str] = &["send_message", "send_file", "send_image", "send_voice_note"];

fn is_send_tool(name: &str) -> bool {
    SEND_TOOLS.contains(&name)
}

const DANGEROUS_TOOLS_PREFIXES: &[&str] = &["write_", "delete_", "install_"];
const DANGEROUS_TOOLS: &[&str] = &["run_command", "manage_skills"];

fn is_dangerous_tool(name: &str) -> bool {
    DANGEROUS_TOOLS.contains(&name) || DANGEROUS_TOOLS_PREFIXES.iter().any(|p| name.starts_with(p))
}

lazy_static! {
    static ref TEMPLATE_PLACEHOLDER: Regex =
        Regex::new(r"\{\{[^}]*\}\}|\[\[[^\]]*\]\]|<<[^>]*>>|\{%[^%]*%\}").unwrap();
}

const FILE_DELIVERY_KEYWORDS: &[&str] = &[
    "send", "file", "resend", "deliver", "share", "image", "picture", "draw", "generate",
    "truncat", "incomplete",
];

#[derive(Debug, Clone)]
pub struct GuardrailConfig {
    pub default_skill_ceiling: u32,
    pub research_skill_ceiling: u32,
    pub redundant_loop_streak: u32,
    pub planning_only_streak: u32,
    pub cooldown_steps: usize,
    pub consecutive_failure_limit: u32,
    pub browser_progress_nudge_steps: usize,
    pub non_browser_progress_nudge_steps: usize,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            default_skill_ceiling: 5,
            research_skill_ceiling: 15,
            redundant_loop_streak: 3,
            planning_only_streak: 5,
            cooldown_steps: 15,
            consecutive_failure_limit: 3,
            browser_progress_nudge_steps: 2,
            non_browser_progress_nudge_steps: 4,
        }
    }
}

/// Per-evaluation context that doesn't belong in `StepState` because it's
/// fixed for the whole action rather than mutated step to step.
pub struct EvaluationContext<'a> {
    pub lane: Lane,
    pub sudo_mode: bool,
    pub is_admin: bool,
    pub origin_channel: &'a str,
    pub task_description: &'a str,
    pub step_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BreakReason {
    RedundantLoop,
    PlanningOnlyLoop,
    SkillFrequencyCeiling { tool: String },
    PatternLoop,
    AdminDenial { channel: String },
    FileDeliveryComplete,
    MessageBudget,
}

#[derive(Debug, Clone)]
pub struct InjectedMemory {
    pub content: String,
}

impl InjectedMemory {
    fn new(content: impl Into<String>) -> Self {
        Self { content: content.into() }
    }
}

#[derive(Debug, Default)]
pub struct GuardrailVerdict {
    pub allowed: Vec<ToolCall>,
    pub denied: Vec<(ToolCall, String)>,
    pub force_break: Option<BreakReason>,
    pub injected_memories: Vec<InjectedMemory>,
}

pub struct GuardrailEngine {
    config: GuardrailConfig,
    channel_policy: ChannelPolicy,
    question_detector: QuestionDetector,
}

impl GuardrailEngine {
    pub fn new(config: GuardrailConfig, channel_policy: ChannelPolicy) -> Self {
        Self {
            config,
            channel_policy,
            question_detector: QuestionDetector::with_default_patterns(),
        }
    }

    pub fn question_detector(&self) -> &QuestionDetector {
        &self.question_detector
    }

    pub fn evaluate(
        &self,
        batch: &[ToolCall],
        step_state: &StepState,
        profile: &ComplexityProfile,
        ctx: &EvaluationContext,
    ) -> GuardrailVerdict {
        let mut verdict = GuardrailVerdict::default();

        // Policy 11: admin gating short-circuits the whole batch.
        if !ctx.is_admin {
            if let Some(call) = batch.iter().find(|c| is_elevated_skill(&c.name)) {
                verdict.denied.push((
                    call.clone(),
                    format!("'{}' requires admin privileges", call.name),
                ));
                verdict.force_break = Some(BreakReason::AdminDenial {
                    channel: ctx.origin_channel.to_string(),
                });
                verdict
                    .injected_memories
                    .push(InjectedMemory::new(format!(
                        "Denied: {} requires admin access. Politely decline via a send to the originating channel.",
                        call.name
                    )));
                return verdict;
            }
        }

        // Policy 1: intra-step dedup.
        let mut seen_signatures: HashSet<String> = HashSet::new();
        let mut sent_this_step = false;

        for call in batch {
            let signature = call.signature();
            if !seen_signatures.insert(signature) {
                continue; // exact duplicate within this decision, drop silently
            }

            // Policy 10: lane-based safety.
            if ctx.lane == Lane::Autonomy && !ctx.sudo_mode && is_dangerous_tool(&call.name) {
                verdict.denied.push((
                    call.clone(),
                    format!("'{}' is not permitted in the autonomy lane", call.name),
                ));
                verdict.injected_memories.push(InjectedMemory::new(format!(
                    "'{}' is blocked outside user-initiated actions. Ask for permission via a send instead.",
                    call.name
                )));
                continue;
            }

            // Policy 4: skill-frequency ceiling.
            let ceiling = if is_research_tool(&call.name) {
                self.config.research_skill_ceiling
            } else {
                self.config.default_skill_ceiling
            };
            let calls_so_far = step_state.skill_call_counts.get(&call.name).copied().unwrap_or(0);
            if calls_so_far >= ceiling && step_state.banned_skills.iter().all(|b| b != &call.name) {
                verdict.denied.push((
                    call.clone(),
                    format!("'{}' has reached its per-action call ceiling ({})", call.name, ceiling),
                ));
                verdict.force_break = Some(BreakReason::SkillFrequencyCeiling {
                    tool: call.name.clone(),
                });
                continue;
            }
            if step_state.banned_skills.iter().any(|b| b == &call.name) {
                verdict.denied.push((call.clone(), format!("'{}' has been banned this action", call.name)));
                continue;
            }

            if is_send_tool(&call.name) {
                // Policy 16: message budget (§8 messages_sent <= max_messages).
                let message_limit = profile.max_messages + step_state.message_budget_bonus;
                if step_state.messages_sent >= message_limit {
                    verdict.denied.push((
                        call.clone(),
                        format!("message budget ({}) exhausted", message_limit),
                    ));
                    verdict.force_break = Some(BreakReason::MessageBudget);
                    continue;
                }

                // Policy 6: template placeholders.
                if let Some(text) = call.args.get("text").and_then(|v| v.as_str()) {
                    if TEMPLATE_PLACEHOLDER.is_match(text) {
                        verdict.denied.push((call.clone(), "message contains an unresolved template placeholder".into()));
                        verdict.injected_memories.push(InjectedMemory::new(
                            "Stop hallucinating template placeholders — fill in real values or omit the send.",
                        ));
                        continue;
                    }

                    // Policy 7: exact-duplicate message.
                    if step_state.already_sent(text) {
                        continue;
                    }

                    // Policy 12: channel policy (sends only target the
                    // origin channel, excluding exempt tools).
                    if let Some(target) = call.args.get("channel").and_then(|v| v.as_str()) {
                        if !self.channel_policy.allows(&call.name, ctx.origin_channel, target) {
                            verdict.denied.push((
                                call.clone(),
                                format!("'{}' may not target channel '{}'", call.name, target),
                            ));
                            continue;
                        }
                    }
                }

                // Policy 8: cooldown.
                if step_state.step_count > 1
                    && !step_state.deep_tool_executed_since_last_message
                    && step_state.steps_since_last_message < self.config.cooldown_steps
                {
                    verdict.denied.push((call.clone(), "cooldown: no deep progress since the last send".into()));
                    continue;
                }

                // Policy 9: one send per step.
                if sent_this_step {
                    continue;
                }
                sent_this_step = true;
            }

            // Policy 14: generate-image dedup.
            if call.name == "generate_image" && step_state.image_generated_in_action {
                verdict.denied.push((call.clone(), "an image was already generated this action".into()));
                verdict.injected_memories.push(InjectedMemory::new(
                    "An image already exists for this action — send_file the existing path, or set goals_met=true.",
                ));
                continue;
            }

            verdict.allowed.push(call.clone());
        }

        if verdict.force_break.is_some() {
            return verdict;
        }

        // Policy 2: redundant-logic loop, evaluated over the allowed batch
        // signature against the caller-supplied running streak.
        if !verdict.allowed.is_empty() {
            let non_core_non_research = verdict
                .allowed
                .iter()
                .all(|c| !is_research_tool(&c.name) && c.name != "journal" && c.name != "learning");
            let signature = StepState::decision_signature(&verdict.allowed);
            let would_be_streak = if step_state.last_decision_signature.as_deref() == Some(signature.as_str()) {
                step_state.same_signature_streak + 1
            } else {
                1
            };
            if non_core_non_research && would_be_streak >= self.config.redundant_loop_streak {
                verdict.force_break = Some(BreakReason::RedundantLoop);
                verdict.injected_memories.push(InjectedMemory::new(
                    "You've repeated the same tool calls several times with no new result. Try a materially different approach.",
                ));
                return verdict;
            }
        }

        // Policy 3: planning-only loop.
        if step_state.planning_only_streak + 1 >= self.config.planning_only_streak {
            let all_non_deep = verdict.allowed.iter().all(|c| is_non_deep_tool(&c.name));
            if all_non_deep && !verdict.allowed.is_empty() {
                verdict.force_break = Some(BreakReason::PlanningOnlyLoop);
                return verdict;
            }
        }

        // Policy 5: pattern-based loop, A,B,A,B,A,B over the last six
        // recorded skill calls plus what this decision is about to add.
        if let Some(reason) = detect_pattern_loop(step_state, &verdict.allowed) {
            verdict.force_break = Some(reason);
            return verdict;
        }

        // Policy 15: file-delivery completion.
        if verdict
            .allowed
            .iter()
            .any(|c| c.name == "send_file" || c.name == "send_image")
        {
            let description = ctx.task_description.to_lowercase();
            if FILE_DELIVERY_KEYWORDS.iter().any(|kw| description.contains(kw)) {
                verdict.force_break = Some(BreakReason::FileDeliveryComplete);
                return verdict;
            }
        }

        // Policy 17: progress nudge.
        if verdict.allowed.iter().all(|c| !is_send_tool(&c.name)) {
            let browser_steps = ctx.step_index;
            if browser_steps >= self.config.browser_progress_nudge_steps
                && step_state.browser_steps_since_message >= self.config.browser_progress_nudge_steps
            {
                verdict
                    .injected_memories
                    .push(InjectedMemory::new("Send a brief status update now before continuing."));
            } else if step_state.step_count >= 4
                && step_state.non_browser_steps_since_message >= self.config.non_browser_progress_nudge_steps
            {
                verdict
                    .injected_memories
                    .push(InjectedMemory::new("Send a brief status update now before continuing."));
            }
        }

        verdict
    }
}

fn detect_pattern_loop(step_state: &StepState, allowed: &[ToolCall]) -> Option<BreakReason> {
    let mut window: Vec<(String, String)> = step_state.recent_skills.iter().cloned().collect();
    for call in allowed {
        window.push((call.name.clone(), arg_key_fingerprint(&call.args)));
    }
    if window.len() < 6 {
        return None;
    }
    let tail = &window[window.len() - 6..];
    let names_match = tail[0].0 == tail[2].0
        && tail[2].0 == tail[4].0
        && tail[1].0 == tail[3].0
        && tail[3].0 == tail[5].0
        && tail[0].0 != tail[1].0;
    if !names_match {
        return None;
    }
    let fingerprints_match = tail[0].1 == tail[2].1 && tail[2].1 == tail[4].1 && tail[1].1 == tail[3].1 && tail[3].1 == tail[5].1;
    if fingerprints_match {
        Some(BreakReason::PatternLoop)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_policy::ChannelPolicyConfig;
    use serde_json::json;

    fn engine() -> GuardrailEngine {
        GuardrailEngine::new(GuardrailConfig::default(), ChannelPolicy::new(ChannelPolicyConfig::default()))
    }

    fn ctx(lane: Lane, is_admin: bool) -> EvaluationContext<'static> {
        EvaluationContext {
            lane,
            sudo_mode: false,
            is_admin,
            origin_channel: "telegram",
            task_description: "summarize the news",
            step_index: 1,
        }
    }

    #[test]
    fn drops_intra_step_duplicate_calls() {
        let e = engine();
        let batch = vec![
            ToolCall::new("web_search", json!({"q": "rust"})),
            ToolCall::new("web_search", json!({"q": "rust"})),
        ];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &StepState::new(), &profile, &ctx(Lane::User, true));
        assert_eq!(verdict.allowed.len(), 1);
    }

    #[test]
    fn blocks_dangerous_tool_in_autonomy_lane_without_sudo() {
        let e = engine();
        let batch = vec![ToolCall::new("run_command", json!({"cmd": "ls"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &StepState::new(), &profile, &ctx(Lane::Autonomy, true));
        assert!(verdict.allowed.is_empty());
        assert_eq!(verdict.denied.len(), 1);
    }

    #[test]
    fn admin_gating_denies_elevated_skill_for_non_admin() {
        let e = engine();
        let batch = vec![ToolCall::new("run_command", json!({"cmd": "ls"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &StepState::new(), &profile, &ctx(Lane::User, false));
        assert!(matches!(verdict.force_break, Some(BreakReason::AdminDenial { .. })));
    }

    #[test]
    fn skill_frequency_ceiling_breaks_on_sixth_default_call() {
        let e = engine();
        let mut state = StepState::new();
        state.skill_call_counts.insert("send_email".to_string(), 5);
        let batch = vec![ToolCall::new("send_email", json!({"to": "x@example.com"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &state, &profile, &ctx(Lane::User, true));
        assert!(matches!(verdict.force_break, Some(BreakReason::SkillFrequencyCeiling { .. })));
    }

    #[test]
    fn research_tool_gets_higher_ceiling() {
        let e = engine();
        let mut state = StepState::new();
        state.skill_call_counts.insert("web_search".to_string(), 10);
        let batch = vec![ToolCall::new("web_search", json!({"q": "x"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &state, &profile, &ctx(Lane::User, true));
        assert_eq!(verdict.allowed.len(), 1);
        assert!(verdict.force_break.is_none());
    }

    #[test]
    fn message_budget_breaks_once_limit_reached() {
        let e = engine();
        let mut state = StepState::new();
        state.messages_sent = 5;
        state.deep_tool_executed_since_last_message = true;
        let batch = vec![ToolCall::new("send_message", json!({"channel": "telegram", "text": "one more"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &state, &profile, &ctx(Lane::User, true));
        assert!(verdict.allowed.is_empty());
        assert!(matches!(verdict.force_break, Some(BreakReason::MessageBudget)));
    }

    #[test]
    fn message_budget_bonus_extends_the_limit() {
        let e = engine();
        let mut state = StepState::new();
        state.messages_sent = 5;
        state.message_budget_bonus = 2;
        state.deep_tool_executed_since_last_message = true;
        let batch = vec![ToolCall::new("send_message", json!({"channel": "telegram", "text": "extended"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &state, &profile, &ctx(Lane::User, true));
        assert_eq!(verdict.allowed.len(), 1);
        assert!(verdict.force_break.is_none());
    }

    #[test]
    fn template_placeholder_message_is_blocked() {
        let e = engine();
        let batch = vec![ToolCall::new(
            "send_message",
            json!({"channel": "telegram", "text": "Hi {{name}}, here's your report"}),
        )];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &StepState::new(), &profile, &ctx(Lane::User, true));
        assert!(verdict.allowed.is_empty());
        assert_eq!(verdict.denied.len(), 1);
    }

    #[test]
    fn duplicate_message_text_is_silently_dropped() {
        let e = engine();
        let mut state = StepState::new();
        state.sent_message_texts.push("Done!".to_string());
        let batch = vec![ToolCall::new("send_message", json!({"channel": "telegram", "text": "Done!"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &state, &profile, &ctx(Lane::User, true));
        assert!(verdict.allowed.is_empty());
        assert!(verdict.denied.is_empty());
    }

    #[test]
    fn cooldown_blocks_send_without_deep_progress() {
        let e = engine();
        let mut state = StepState::new();
        state.step_count = 2;
        state.steps_since_last_message = 3;
        state.deep_tool_executed_since_last_message = false;
        let batch = vec![ToolCall::new("send_message", json!({"channel": "telegram", "text": "hi"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &state, &profile, &ctx(Lane::User, true));
        assert!(verdict.allowed.is_empty());
        assert_eq!(verdict.denied.len(), 1);
    }

    #[test]
    fn only_first_send_per_step_survives() {
        let e = engine();
        let mut state = StepState::new();
        state.deep_tool_executed_since_last_message = true;
        let batch = vec![
            ToolCall::new("send_message", json!({"channel": "telegram", "text": "first"})),
            ToolCall::new("send_message", json!({"channel": "telegram", "text": "second"})),
        ];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &state, &profile, &ctx(Lane::User, true));
        assert_eq!(verdict.allowed.len(), 1);
        assert_eq!(verdict.allowed[0].args.get("text").and_then(|v| v.as_str()), Some("first"));
    }

    #[test]
    fn channel_policy_blocks_cross_channel_send() {
        let e = engine();
        let mut state = StepState::new();
        state.deep_tool_executed_since_last_message = true;
        let batch = vec![ToolCall::new("send_message", json!({"channel": "discord", "text": "hi"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &state, &profile, &ctx(Lane::User, true));
        assert!(verdict.allowed.is_empty());
    }

    #[test]
    fn generate_image_dedup_blocks_second_call() {
        let e = engine();
        let mut state = StepState::new();
        state.image_generated_in_action = true;
        let batch = vec![ToolCall::new("generate_image", json!({"prompt": "a cat"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &state, &profile, &ctx(Lane::User, true));
        assert!(verdict.allowed.is_empty());
        assert_eq!(verdict.denied.len(), 1);
    }

    #[test]
    fn file_delivery_completion_triggers_force_break() {
        let e = engine();
        let mut state = StepState::new();
        state.deep_tool_executed_since_last_message = true;
        let batch = vec![ToolCall::new("send_file", json!({"channel": "telegram", "path": "/tmp/report.pdf"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let mut c = ctx(Lane::User, true);
        c.task_description = "please send the report file";
        let verdict = e.evaluate(&batch, &state, &profile, &c);
        assert!(matches!(verdict.force_break, Some(BreakReason::FileDeliveryComplete)));
    }

    #[test]
    fn pattern_loop_detects_period_two_repetition() {
        let e = engine();
        let mut state = StepState::new();
        for (name, args) in [
            ("tool_a", json!({"x": 1})),
            ("tool_b", json!({"y": 1})),
            ("tool_a", json!({"x": 2})),
            ("tool_b", json!({"y": 2})),
        ] {
            state.record_skill_call(&ToolCall::new(name, args));
        }
        let batch = vec![ToolCall::new("tool_a", json!({"x": 3}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        // window becomes A,B,A,B,A (5) + this decision's B -> 6 total
        let batch2 = vec![ToolCall::new("tool_b", json!({"y": 3}))];
        let mut state2 = state.clone();
        state2.record_skill_call(&batch[0]);
        let verdict = e.evaluate(&batch2, &state2, &profile, &ctx(Lane::User, true));
        assert!(matches!(verdict.force_break, Some(BreakReason::PatternLoop)));
    }

    #[test]
    fn pattern_loop_does_not_trigger_when_args_differ_in_value_but_fingerprint_same() {
        // Same keys, same shape -> this is exactly what SHOULD trigger;
        // verifies we fingerprint by key-shape not value (values differ: 1,2,3...).
        let e = engine();
        let mut state = StepState::new();
        for (name, args) in [
            ("tool_a", json!({"x": 1})),
            ("tool_b", json!({"x": 1})),
            ("tool_a", json!({"x": 2})),
        ] {
            state.record_skill_call(&ToolCall::new(name, args));
        }
        let batch = vec![ToolCall::new("tool_b", json!({"y": "different-shape"}))];
        let profile = ComplexityProfile { max_steps: 25, max_messages: 5 };
        let verdict = e.evaluate(&batch, &state, &profile, &ctx(Lane::User, true));
        // names match A,B,A,B but fingerprints diverge (x vs y) on the B slot
        assert!(verdict.force_break.is_none());
    }
}
