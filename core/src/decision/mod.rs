//! DecisionLoop — the per-action step loop and all its guardrails.
//!
//! Owns one [`crate::queue::Action`] from `in-progress` to a terminal
//! state. Each step: ask the [`DecisionEngine`] for the next move, run it
//! through the [`GuardrailEngine`], execute whatever survives via the
//! [`crate::contracts::SkillRegistry`], write observations to
//! [`crate::memory::AgentMemoryManager`], and re-evaluate. Mirrors the
//! teacher's `cognition::engine::step(state, input) -> Transition` shape,
//! but the decision itself comes from an LLM call rather than a pure
//! state machine, and the guardrail pass sits between proposal and
//! execution.

pub mod complexity;
pub mod engine;
pub mod guardrail;
pub mod question;
pub mod review_gate;
pub mod state;

pub use complexity::{classify, Complexity, ComplexityProfile};
pub use engine::{Decision, DecisionEngine, Verification};
pub use guardrail::{BreakReason, EvaluationContext, GuardrailConfig, GuardrailEngine, GuardrailVerdict};
pub use question::QuestionDetector;
pub use review_gate::{ReviewContext, ReviewGate, ReviewReason, ReviewVerdict};
pub use state::StepState;

use crate::bootstrap;
use crate::channel_policy::ChannelPolicy;
use crate::contracts::{Channel, ChannelRegistry, CompletionClient, SkillRegistry, ToolCall, ToolOutcome};
use crate::known_users::KnownUserRegistry;
use crate::memory::AgentMemoryManager;
use crate::orchestrator::Orchestrator;
use crate::queue::{Action, ActionId, ActionQueue, ActionStatus};
use crate::scheduler::heartbeat::HeartbeatContext;
use crate::scheduler::TickScheduler;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

/// Tunables the spec calls out as implementer-exposed constants (§9 Open
/// Questions): cooldown steps, pattern window, backoff multiplier all
/// live in [`GuardrailConfig`]; this struct collects the rest.
#[derive(Debug, Clone)]
pub struct DecisionLoopConfig {
    pub configured_max_steps: usize,
    pub configured_max_messages: usize,
    pub status_update_every_n_silent_steps: usize,
    pub max_no_tool_retries: u32,
    pub max_silent_termination_retries: u32,
    pub bonus_steps_after_review: usize,
    pub bonus_messages_after_review: usize,
    pub llm_retry_attempts: u32,
}

impl Default for DecisionLoopConfig {
    fn default() -> Self {
        Self {
            configured_max_steps: 25,
            configured_max_messages: 5,
            status_update_every_n_silent_steps: 5,
            max_no_tool_retries: 3,
            max_silent_termination_retries: 3,
            bonus_steps_after_review: 5,
            bonus_messages_after_review: 2,
            llm_retry_attempts: 2,
        }
    }
}

/// Why the loop stopped executing an action, used by the caller to decide
/// the final [`ActionStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    GoalsMet,
    Waiting,
    Exhausted,
    Cancelled,
    Error(String),
}

pub struct DecisionLoop {
    config: DecisionLoopConfig,
    guardrails: GuardrailEngine,
    review_gate: ReviewGate,
    question_detector: QuestionDetector,
    queue: Arc<ActionQueue>,
    memory: Arc<AgentMemoryManager>,
    skills: Arc<SkillRegistry>,
    channels: Arc<ChannelRegistry>,
    llm: Arc<dyn CompletionClient>,
    engine: Arc<dyn DecisionEngine>,
    cancellations: Arc<crate::state::CancellationSet>,
    known_users: Arc<KnownUserRegistry>,
    tick_scheduler: Arc<TickScheduler>,
    orchestrator: Arc<AsyncMutex<Orchestrator>>,
    data_dir: PathBuf,
}

impl DecisionLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: DecisionLoopConfig,
        channel_policy: ChannelPolicy,
        guardrail_config: GuardrailConfig,
        queue: Arc<ActionQueue>,
        memory: Arc<AgentMemoryManager>,
        skills: Arc<SkillRegistry>,
        channels: Arc<ChannelRegistry>,
        llm: Arc<dyn CompletionClient>,
        engine: Arc<dyn DecisionEngine>,
        cancellations: Arc<crate::state::CancellationSet>,
        known_users: Arc<KnownUserRegistry>,
        tick_scheduler: Arc<TickScheduler>,
        orchestrator: Arc<AsyncMutex<Orchestrator>>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            guardrails: GuardrailEngine::new(guardrail_config, channel_policy),
            review_gate: ReviewGate::new(),
            question_detector: QuestionDetector::with_default_patterns(),
            queue,
            memory,
            skills,
            channels,
            llm,
            engine,
            cancellations,
            known_users,
            tick_scheduler,
            orchestrator,
            data_dir: data_dir.into(),
        }
    }

    /// Gathers live memory/queue/schedule/profile/journal/contact state
    /// into a [`HeartbeatContext`] for the rich autonomy-lane prompt
    /// (§4.5). Called fresh at heartbeat execution time rather than at
    /// enqueue time, since a heartbeat may sit behind higher-priority work
    /// long enough for a queue-time snapshot to go stale.
    async fn build_heartbeat_context(&self) -> HeartbeatContext {
        let now = Utc::now();
        let recent_memory = self.memory.tail(10);
        let idle_minutes = recent_memory
            .last()
            .map(|e| (now - e.timestamp).num_minutes().max(0))
            .unwrap_or(0);

        let queue_tail = {
            let mut snapshot = self.queue.snapshot();
            snapshot.sort_by_key(|a| a.timestamp);
            snapshot
                .into_iter()
                .rev()
                .take(5)
                .rev()
                .map(|a| format!("[{:?}] {}", a.status, a.payload.description))
                .collect()
        };

        let bootstrap_files = bootstrap::read_bootstrap_files(&self.data_dir).unwrap_or_default();
        let user_profile = bootstrap_files
            .iter()
            .find(|(name, _)| *name == "USER.md")
            .map(|(_, content)| content.clone());
        let journal_tail = bootstrap_files
            .iter()
            .find(|(name, _)| *name == "JOURNAL.md")
            .map(|(_, content)| tail_lines(content, 20));
        let learning_tail = bootstrap_files
            .iter()
            .find(|(name, _)| *name == "LEARNING.md")
            .map(|(_, content)| tail_lines(content, 20));

        let contact_summaries = self
            .known_users
            .snapshot()
            .into_iter()
            .map(|u| {
                format!(
                    "{} on {} (last seen {})",
                    u.display_name.unwrap_or_else(|| u.user_id.clone()),
                    u.channel,
                    u.last_seen.to_rfc3339(),
                )
            })
            .collect();

        let active_channels = self.channels.names();
        let active_schedules = self.tick_scheduler.active_schedule_summaries();
        let idle_worker_count = self.orchestrator.lock().await.idle_worker_count();

        HeartbeatContext {
            recent_memory,
            active_schedules,
            queue_tail,
            user_profile,
            journal_tail,
            learning_tail,
            contact_summaries,
            idle_minutes,
            active_channels,
            idle_worker_count,
        }
    }

    /// Run one action from `in-progress` to a terminal (or `waiting`)
    /// state. The caller is responsible for having already transitioned
    /// the action to `in-progress` via [`ActionQueue::next`] +
    /// `update_status` before calling this.
    pub async fn run(&self, action_id: ActionId, sudo_mode: bool) -> LoopOutcome {
        let Some(mut action) = self.queue.get(action_id) else {
            return LoopOutcome::Error("action disappeared from queue".into());
        };

        self.memory.write_episodic(
            action_id,
            format!("task-start: {}", action.payload.description),
        );

        // Heartbeats are built fresh at execution time: the queued prompt
        // goes stale sitting in the queue behind higher-priority work.
        if action.payload.is_heartbeat {
            let heartbeat_ctx = self.build_heartbeat_context().await;
            let rebuilt = crate::scheduler::heartbeat::HeartbeatGenerator::build(&heartbeat_ctx, Utc::now());
            action.payload.description = rebuilt.clone();
            self.queue
                .update_payload(action_id, json!({ "description": rebuilt }));
        }

        let complexity = match classify(self.llm.as_ref(), &action.payload.description).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "complexity classification failed; defaulting to standard");
                Complexity::Standard
            }
        };
        let profile = complexity.profile(self.config.configured_max_steps, self.config.configured_max_messages);

        if !matches!(complexity, Complexity::Trivial | Complexity::Simple) {
            if let Ok(plan) = self.engine.build_plan(&action.payload.description).await {
                self.memory.write_short(action_id, format!("plan: {}", plan));
            }
        }

        let mut step_state = StepState::new();
        let is_channel_sourced = action.payload.source.is_some();
        let origin_channel = action.payload.source.clone().unwrap_or_default();

        let mut bonus_steps_granted = false;
        let mut suppress_non_final_messages = false;
        let mut step = 0usize;

        let outcome = loop {
            if self.cancellations.is_cancelled(action_id) {
                self.cancellations.clear(action_id);
                break LoopOutcome::Cancelled;
            }

            if step >= profile.max_steps {
                if bonus_steps_granted {
                    break LoopOutcome::Exhausted;
                }
                let verdict = self
                    .review_gate
                    .consult(
                        self.llm.as_ref(),
                        ReviewContext {
                            task_description: &action.payload.description,
                            reason: ReviewReason::StepExhaustion,
                            detail: &format!("reached max steps ({})", profile.max_steps),
                            current_step: step,
                            recent_memories: &memory_tail_strings(&self.memory, action_id),
                        },
                    )
                    .await;
                match verdict {
                    ReviewVerdict::Continue => {
                        bonus_steps_granted = true;
                        suppress_non_final_messages = true;
                        self.memory
                            .write_short(action_id, "Step budget extended. Wrap up NOW — final answer only.");
                    }
                    ReviewVerdict::Terminate => break LoopOutcome::Exhausted,
                }
            }
            let effective_max_steps = if bonus_steps_granted {
                profile.max_steps + self.config.bonus_steps_after_review
            } else {
                profile.max_steps
            };
            if step >= effective_max_steps {
                break LoopOutcome::Exhausted;
            }

            step += 1;
            step_state.begin_step();

            if is_channel_sourced
                && step_state.steps_since_last_message > 0
                && step_state.steps_since_last_message % self.config.status_update_every_n_silent_steps == 0
                && !suppress_non_final_messages
            {
                self.send_best_effort(&origin_channel, &action, "Still working on this...").await;
            }

            let decision = match self.deliberate(&action, &step_state).await {
                Ok(d) => d,
                Err(e) => break LoopOutcome::Error(format!("decision engine failed: {e}")),
            };

            let mut tool_calls = dedup_within_decision(decision.tools);

            let ctx = EvaluationContext {
                lane: action.lane,
                sudo_mode,
                is_admin: action.payload.is_admin,
                origin_channel: &origin_channel,
                task_description: &action.payload.description,
                step_index: step,
            };
            let verdict = self.guardrails.evaluate(&tool_calls, &step_state, &profile, &ctx);

            for memory in &verdict.injected_memories {
                self.memory.write_short(action_id, memory.content.clone());
            }
            for (call, reason) in &verdict.denied {
                self.memory
                    .write_short(action_id, format!("denied '{}': {}", call.name, reason));
            }

            if let Some(reason) = verdict.force_break.clone() {
                if let BreakReason::SkillFrequencyCeiling { tool } = &reason {
                    let review = self
                        .review_gate
                        .consult(
                            self.llm.as_ref(),
                            ReviewContext {
                                task_description: &action.payload.description,
                                reason: ReviewReason::SkillFrequencyCeiling,
                                detail: &format!("'{}' hit its per-action call ceiling", tool),
                                current_step: step,
                                recent_memories: &memory_tail_strings(&self.memory, action_id),
                            },
                        )
                        .await;
                    if review == ReviewVerdict::Continue {
                        step_state.skill_call_counts.remove(tool);
                        step_state.banned_skills.retain(|b| b != tool);
                        self.memory.write_short(
                            action_id,
                            format!("'{}' frequency ceiling lifted; switch approach before reusing it.", tool),
                        );
                        continue;
                    } else {
                        step_state.banned_skills.push(tool.clone());
                        break LoopOutcome::Exhausted;
                    }
                }
                if let BreakReason::AdminDenial { channel } = &reason {
                    if let Some(call) = verdict.denied.first() {
                        self.send_best_effort(channel, &action, &format!("I can't do that ({}) without admin approval.", call.0.name)).await;
                    }
                    break LoopOutcome::Exhausted;
                }
                if let BreakReason::MessageBudget = &reason {
                    let limit = profile.max_messages + step_state.message_budget_bonus;
                    let review = self
                        .review_gate
                        .consult(
                            self.llm.as_ref(),
                            ReviewContext {
                                task_description: &action.payload.description,
                                reason: ReviewReason::MessageBudget,
                                detail: &format!("reached max messages ({})", limit),
                                current_step: step,
                                recent_memories: &memory_tail_strings(&self.memory, action_id),
                            },
                        )
                        .await;
                    if review == ReviewVerdict::Continue {
                        step_state.message_budget_bonus += self.config.bonus_messages_after_review;
                        suppress_non_final_messages = true;
                        self.memory
                            .write_short(action_id, "Message budget extended. Wrap up NOW — final answer only.");
                        continue;
                    } else {
                        break LoopOutcome::Exhausted;
                    }
                }
                // RedundantLoop / PlanningOnlyLoop / PatternLoop / FileDeliveryComplete
                // all fall through to exhaustion after recording why.
                self.memory
                    .write_short(action_id, format!("loop forced a break: {:?}", reason));
                break LoopOutcome::Exhausted;
            }

            tool_calls = verdict.allowed;

            step_state.update_signature_streak(&StepState::decision_signature(&tool_calls));
            if tool_calls.iter().all(|c| guardrail::NON_DEEP_TOOLS.contains(&c.name.as_str())) {
                step_state.planning_only_streak += 1;
            } else {
                step_state.planning_only_streak = 0;
            }

            if tool_calls.is_empty() {
                let tools_were_filtered = !verdict.denied.is_empty();
                if tools_were_filtered && !decision.verification.goals_met {
                    step_state.no_tool_retries += 1;
                    self.memory
                        .write_short(action_id, "Your previous tool calls were invalid or blocked. Try again.");
                    if step_state.no_tool_retries > self.config.max_no_tool_retries {
                        break LoopOutcome::Exhausted;
                    }
                    continue;
                }
                if !decision.verification.goals_met {
                    step_state.no_tool_retries += 1;
                    self.memory
                        .write_short(action_id, "No tools proposed and goals are not yet met. Continue working.");
                    if step_state.no_tool_retries > self.config.max_no_tool_retries {
                        break LoopOutcome::Exhausted;
                    }
                    continue;
                }

                // goals_met = true, no tools: check silent-termination block.
                if is_channel_sourced && step_state.messages_sent == 0 {
                    step_state.silent_termination_retries += 1;
                    if step_state.silent_termination_retries <= self.config.max_silent_termination_retries {
                        self.memory.write_short(
                            action_id,
                            "You must send a final message to the user before finishing this task.",
                        );
                        continue;
                    }
                    warn!(action = %action_id, "silent termination block exhausted retries; terminating anyway");
                }
                break LoopOutcome::GoalsMet;
            }

            step_state.record_skill_call_batch(&tool_calls);
            step_state.record_step_kind(tool_calls.iter().all(|c| guardrail::is_browser_tool(&c.name)));

            let mut waiting_break = false;
            for call in &tool_calls {
                let result = self.skills.execute(&call).await;
                let outcome = match result {
                    Ok(o) => o,
                    Err(e) => ToolOutcome::Text(format!("Error: {e}")),
                };

                if !outcome.is_success() {
                    let failures = step_state.record_tool_failure(&call.name);
                    self.memory
                        .write_short(action_id, format!("tool '{}' failed: {}", call.name, outcome.detail()));
                    if failures >= 3 {
                        self.memory.write_short(
                            action_id,
                            format!("'{}' has failed 3 times in a row; stop using it.", call.name),
                        );
                    }
                    continue;
                }
                step_state.record_tool_success(&call.name);
                self.memory
                    .write_short(action_id, format!("tool '{}' succeeded: {}", call.name, outcome.detail()));

                if !guardrail::NON_DEEP_TOOLS.contains(&call.name.as_str()) {
                    step_state.deep_tool_executed_since_last_message = true;
                }

                if call.name == "generate_image" {
                    step_state.image_generated_in_action = true;
                }

                if call.name == "request_supporting_data" {
                    let question_text = call.args.get("question").and_then(|v| v.as_str()).unwrap_or(outcome.detail());
                    if self.send_best_effort(&origin_channel, &action, question_text).await {
                        self.queue.update_status(action_id, ActionStatus::Waiting);
                        waiting_break = true;
                        break;
                    }
                }

                if call.name == "send_message" || call.name == "send_file" || call.name == "send_image" || call.name == "send_voice_note" {
                    let text = call.args.get("text").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    step_state.record_message_sent(text.clone());
                    if !suppress_non_final_messages && !decision.verification.goals_met
                        && self.question_detector.is_question(&text)
                    {
                        self.queue.update_status(action_id, ActionStatus::Waiting);
                        waiting_break = true;
                        break;
                    }
                }

                if call.name == "schedule_task" {
                    waiting_break = true;
                    break;
                }

                if (call.name == "send_file" || call.name == "send_image") && step_state.image_generated_in_action {
                    waiting_break = true;
                    break;
                }
            }

            if waiting_break {
                let final_status = self.queue.get(action_id).map(|a| a.status);
                if final_status == Some(ActionStatus::Waiting) {
                    break LoopOutcome::Waiting;
                }
                break LoopOutcome::GoalsMet;
            }

            if decision.verification.goals_met {
                break LoopOutcome::GoalsMet;
            }
        };

        self.memory.write_episodic(
            action_id,
            format!("task-conclusion: {:?}", outcome),
        );

        match &outcome {
            LoopOutcome::Waiting => {}
            LoopOutcome::Cancelled => {
                self.queue.update_status(action_id, ActionStatus::Failed);
                self.memory.purge_step_scoped(action_id);
            }
            LoopOutcome::Error(e) => {
                self.queue.update_status(action_id, ActionStatus::Failed);
                if is_channel_sourced {
                    self.send_best_effort(&origin_channel, &action, &format!("Something went wrong: {e}")).await;
                }
                self.memory.purge_step_scoped(action_id);
            }
            LoopOutcome::GoalsMet | LoopOutcome::Exhausted => {
                self.queue.update_status(action_id, ActionStatus::Completed);
                self.memory.purge_step_scoped(action_id);
                self.memory.trigger_consolidation(action_id);
            }
        }

        outcome
    }

    async fn deliberate(&self, action: &Action, step_state: &StepState) -> anyhow::Result<Decision> {
        let history = self.memory.step_scoped_for(action.id);
        let mut last_err = None;
        for attempt in 0..=self.config.llm_retry_attempts {
            match self.engine.decide(action, step_state, &history).await {
                Ok(d) => return Ok(d),
                Err(e) => {
                    warn!(attempt, error = %e, "decision engine call failed; retrying");
                    last_err = Some(e);
                }
            }
        }
        Err(anyhow::anyhow!("{}", last_err.unwrap()))
    }

    async fn send_best_effort(&self, channel_name: &str, action: &Action, text: &str) -> bool {
        let Some(channel) = self.channels.get(channel_name) else {
            return false;
        };
        let to = action.payload.chat_id.clone().or_else(|| action.payload.source_id.clone()).unwrap_or_default();
        match channel.send_message(&to, text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "best-effort send failed");
                false
            }
        }
    }
}

fn dedup_within_decision(tools: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut seen = std::collections::HashSet::new();
    tools
        .into_iter()
        .filter(|c| seen.insert(c.signature()))
        .collect()
}

/// Last `n` non-empty lines of a bootstrap file's content, for the
/// heartbeat prompt's journal/learning tails.
fn tail_lines(content: &str, n: usize) -> String {
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

fn memory_tail_strings(memory: &AgentMemoryManager, action_id: ActionId) -> Vec<String> {
    memory
        .step_scoped_for(action_id)
        .into_iter()
        .rev()
        .take(10)
        .rev()
        .map(|m| m.content)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_policy::{ChannelPolicyConfig, ELEVATED_SKILLS};
    use crate::contracts::{ChannelError, CompletionError};
    use parking_lot::Mutex as SyncMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Routes canned responses by prompt content: the same trick
    /// [`crate::decision::complexity`]'s own `StubClient` uses, extended
    /// to also answer the ReviewGate's distinct prompt shape.
    struct FakeClient {
        classify_as: &'static str,
        review_verdict: &'static str,
        review_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CompletionClient for FakeClient {
        async fn complete(&self, prompt: &str, _system: &str) -> Result<String, CompletionError> {
            if prompt.contains("Classify the complexity") {
                return Ok(self.classify_as.to_string());
            }
            if prompt.contains("Reason for review") {
                self.review_calls.fetch_add(1, Ordering::SeqCst);
                return Ok(self.review_verdict.to_string());
            }
            Ok(String::new())
        }
        async fn analyze_media(&self, _path: &str, _prompt: &str) -> Result<String, CompletionError> {
            Ok(String::new())
        }
    }

    /// Always proposes the same fixed decision, handed in by the test.
    struct FixedEngine {
        decision: Decision,
    }

    #[async_trait::async_trait]
    impl DecisionEngine for FixedEngine {
        async fn decide(&self, _action: &Action, _step_state: &StepState, _history: &[crate::memory::MemoryEntry]) -> Result<Decision, engine::EngineError> {
            Ok(self.decision.clone())
        }
        async fn build_plan(&self, _description: &str) -> Result<String, engine::EngineError> {
            Ok("1. do the thing".to_string())
        }
    }

    struct RecordingChannel {
        sent: SyncMutex<Vec<(String, String)>>,
    }

    impl RecordingChannel {
        fn new() -> Self {
            Self { sent: SyncMutex::new(Vec::new()) }
        }
    }

    #[async_trait::async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            "telegram"
        }
        async fn send_message(&self, to: &str, text: &str) -> Result<(), ChannelError> {
            self.sent.lock().push((to.to_string(), text.to_string()));
            Ok(())
        }
        async fn send_file(&self, _to: &str, _path: &str, _caption: Option<&str>) -> Result<(), ChannelError> {
            Ok(())
        }
        async fn send_voice_note(&self, _to: &str, _path: &str) -> Result<(), ChannelError> {
            Ok(())
        }
        async fn react(&self, _to: &str, _message_id: &str, _emoji: &str) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    struct EchoSkill;

    #[async_trait::async_trait]
    impl crate::contracts::Skill for EchoSkill {
        fn name(&self) -> &str {
            "do_thing"
        }
        fn description(&self) -> &str {
            "test skill"
        }
        fn usage(&self) -> &str {
            "do_thing()"
        }
        async fn handler(&self, _args: serde_json::Value) -> crate::contracts::ToolOutcome {
            crate::contracts::ToolOutcome::Text("did it".to_string())
        }
    }

    fn loop_with(
        engine: Arc<dyn DecisionEngine>,
        client: Arc<dyn CompletionClient>,
        channels: Arc<ChannelRegistry>,
        skills: Arc<SkillRegistry>,
        config: DecisionLoopConfig,
        guardrails: GuardrailConfig,
        data_dir: &std::path::Path,
    ) -> DecisionLoop {
        let queue = Arc::new(ActionQueue::new(data_dir).unwrap());
        let memory = Arc::new(AgentMemoryManager::new(data_dir).unwrap());
        let known_users = Arc::new(KnownUserRegistry::new(data_dir).unwrap());
        let tick_scheduler = Arc::new(TickScheduler::new(
            crate::scheduler::TickConfig::default(),
            queue.clone(),
            data_dir,
        ));
        let orchestrator = Arc::new(AsyncMutex::new(Orchestrator::new(data_dir.join("orchestrator")).unwrap()));
        DecisionLoop::new(
            config,
            ChannelPolicy::new(ChannelPolicyConfig::default()),
            guardrails,
            queue,
            memory,
            skills,
            channels,
            client,
            engine,
            Arc::new(crate::state::CancellationSet::new()),
            known_users,
            tick_scheduler,
            orchestrator,
            data_dir,
        )
    }

    #[tokio::test]
    async fn admin_denial_sends_polite_refusal_and_exhausts() {
        let dir = tempfile::tempdir().unwrap();
        let elevated = ELEVATED_SKILLS[0];
        let engine: Arc<dyn DecisionEngine> = Arc::new(FixedEngine {
            decision: Decision {
                tools: vec![ToolCall::new(elevated, json!({"cmd": "ls"}))],
                verification: Verification { goals_met: false, analysis: String::new() },
                ..Default::default()
            },
        });
        let client: Arc<dyn CompletionClient> = Arc::new(FakeClient {
            classify_as: "trivial",
            review_verdict: "terminate",
            review_calls: AtomicUsize::new(0),
        });
        let channel = Arc::new(RecordingChannel::new());
        let mut registry = ChannelRegistry::new();
        registry.register(channel.clone());
        let channels = Arc::new(registry);
        let skills = Arc::new(SkillRegistry::new());

        let decision_loop = loop_with(
            engine,
            client,
            channels,
            skills,
            DecisionLoopConfig::default(),
            GuardrailConfig::default(),
            dir.path(),
        );

        let action = Action::new(
            5,
            Lane::User,
            ActionPayload {
                description: "hi".to_string(),
                source: Some("telegram".to_string()),
                chat_id: Some("chat-1".to_string()),
                is_admin: false,
                ..Default::default()
            },
        );
        let action_id = action.id;
        decision_loop.queue.push(action);
        decision_loop.queue.update_status(action_id, ActionStatus::InProgress);

        let outcome = decision_loop.run(action_id, false).await;
        assert_eq!(outcome, LoopOutcome::Exhausted);

        let sent = channel.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("admin approval"));
        assert_eq!(decision_loop.queue.get(action_id).unwrap().status, ActionStatus::Completed);
    }

    #[tokio::test]
    async fn skill_frequency_ceiling_consults_review_gate_before_terminating() {
        let dir = tempfile::tempdir().unwrap();
        let engine: Arc<dyn DecisionEngine> = Arc::new(FixedEngine {
            decision: Decision {
                tools: vec![ToolCall::new("do_thing", json!({}))],
                verification: Verification { goals_met: false, analysis: String::new() },
                ..Default::default()
            },
        });
        let client = Arc::new(FakeClient {
            classify_as: "standard",
            review_verdict: "terminate",
            review_calls: AtomicUsize::new(0),
        });
        let channels = Arc::new(ChannelRegistry::new());
        let mut registry = SkillRegistry::new();
        registry.register(Arc::new(EchoSkill));
        let skills = Arc::new(registry);

        let mut guardrails = GuardrailConfig::default();
        guardrails.default_skill_ceiling = 2;

        let decision_loop = loop_with(
            engine,
            client.clone(),
            channels,
            skills,
            DecisionLoopConfig::default(),
            guardrails,
            dir.path(),
        );

        let action = Action::new(
            5,
            Lane::User,
            ActionPayload {
                description: "summarize the quarterly report".to_string(),
                ..Default::default()
            },
        );
        let action_id = action.id;
        decision_loop.queue.push(action);
        decision_loop.queue.update_status(action_id, ActionStatus::InProgress);

        let outcome = decision_loop.run(action_id, false).await;
        assert_eq!(outcome, LoopOutcome::Exhausted);
        assert!(client.review_calls.load(Ordering::SeqCst) >= 1, "ReviewGate should have been consulted");
        assert_eq!(decision_loop.queue.get(action_id).unwrap().status, ActionStatus::Completed);
    }

    /// Records every text it's asked to send and always succeeds, so the
    /// decision loop's `send_message` tool execution doesn't error out
    /// before reaching the `record_message_sent` bookkeeping.
    struct RecordingSendSkill {
        sent: SyncMutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl crate::contracts::Skill for RecordingSendSkill {
        fn name(&self) -> &str {
            "send_message"
        }
        fn description(&self) -> &str {
            "test skill"
        }
        fn usage(&self) -> &str {
            "send_message(channel, text)"
        }
        async fn handler(&self, args: serde_json::Value) -> crate::contracts::ToolOutcome {
            let text = args.get("text").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            self.sent.lock().push(text);
            crate::contracts::ToolOutcome::Text("sent".to_string())
        }
    }

    /// Proposes a distinct `send_message` each call, so repeated sends
    /// survive the exact-duplicate-message guardrail policy.
    struct CountingSendEngine {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl DecisionEngine for CountingSendEngine {
        async fn decide(&self, _action: &Action, _step_state: &StepState, _history: &[crate::memory::MemoryEntry]) -> Result<Decision, engine::EngineError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Decision {
                tools: vec![ToolCall::new("send_message", json!({"channel": "telegram", "text": format!("update {n}")}))],
                verification: Verification { goals_met: false, analysis: String::new() },
                ..Default::default()
            })
        }
        async fn build_plan(&self, _description: &str) -> Result<String, engine::EngineError> {
            Ok("1. do the thing".to_string())
        }
    }

    #[tokio::test]
    async fn message_budget_consults_review_gate_before_terminating() {
        let dir = tempfile::tempdir().unwrap();
        let engine: Arc<dyn DecisionEngine> = Arc::new(CountingSendEngine { calls: AtomicUsize::new(0) });
        let client = Arc::new(FakeClient {
            classify_as: "standard",
            review_verdict: "terminate",
            review_calls: AtomicUsize::new(0),
        });
        let channel = Arc::new(RecordingChannel::new());
        let mut registry = ChannelRegistry::new();
        registry.register(channel.clone());
        let channels = Arc::new(registry);
        let send_skill = Arc::new(RecordingSendSkill { sent: SyncMutex::new(Vec::new()) });
        let mut skill_registry = SkillRegistry::new();
        skill_registry.register(send_skill.clone());
        let skills = Arc::new(skill_registry);

        let mut config = DecisionLoopConfig::default();
        config.configured_max_steps = 20;
        config.configured_max_messages = 2;
        let mut guardrails = GuardrailConfig::default();
        guardrails.cooldown_steps = 0;

        let decision_loop = loop_with(engine, client.clone(), channels, skills, config, guardrails, dir.path());

        let action = Action::new(
            5,
            Lane::User,
            ActionPayload {
                description: "keep sending updates".to_string(),
                source: Some("telegram".to_string()),
                chat_id: Some("chat-1".to_string()),
                ..Default::default()
            },
        );
        let action_id = action.id;
        decision_loop.queue.push(action);
        decision_loop.queue.update_status(action_id, ActionStatus::InProgress);

        let outcome = decision_loop.run(action_id, false).await;
        assert_eq!(outcome, LoopOutcome::Exhausted);
        assert!(client.review_calls.load(Ordering::SeqCst) >= 1, "ReviewGate should have been consulted");
        assert_eq!(send_skill.sent.lock().len(), 2, "only the budgeted messages should have gone out");
    }

    #[tokio::test]
    async fn silent_termination_is_blocked_until_a_message_is_sent() {
        let dir = tempfile::tempdir().unwrap();
        let engine: Arc<dyn DecisionEngine> = Arc::new(FixedEngine {
            decision: Decision {
                tools: vec![],
                verification: Verification { goals_met: true, analysis: "looks done".to_string() },
                ..Default::default()
            },
        });
        let client = Arc::new(FakeClient {
            classify_as: "standard",
            review_verdict: "terminate",
            review_calls: AtomicUsize::new(0),
        });
        let channels = Arc::new(ChannelRegistry::new());
        let skills = Arc::new(SkillRegistry::new());

        let mut config = DecisionLoopConfig::default();
        config.configured_max_steps = 10;
        config.max_silent_termination_retries = 2;

        let decision_loop = loop_with(
            engine,
            client,
            channels,
            skills,
            config,
            GuardrailConfig::default(),
            dir.path(),
        );

        let action = Action::new(
            5,
            Lane::User,
            ActionPayload {
                description: "draft a summary, no need to reply".to_string(),
                source: Some("telegram".to_string()),
                chat_id: Some("chat-1".to_string()),
                ..Default::default()
            },
        );
        let action_id = action.id;
        decision_loop.queue.push(action);
        decision_loop.queue.update_status(action_id, ActionStatus::InProgress);

        let outcome = decision_loop.run(action_id, false).await;
        assert_eq!(outcome, LoopOutcome::GoalsMet);
        assert_eq!(decision_loop.queue.get(action_id).unwrap().status, ActionStatus::Completed);
    }
}
