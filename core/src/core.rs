//! Core — top-level wiring (§6 External Interfaces)
//!
//! Assembles the queue, the decision loop and its guardrails, the tick
//! scheduler, and the orchestrator into one `start()`/`stop()`-able
//! handle, the way the teacher's top-level agent session type wires
//! `CognitiveEngine` + `WorkerManager` + memory together in
//! `agent::session`. Channel adapters, LLM provider SDKs, and skill
//! plugins are supplied by the caller through the narrow
//! [`crate::contracts`] traits — none of that lives here.

use crate::bootstrap::seed_bootstrap_files;
use crate::channel_policy::{AdminRegistry, ChannelPolicy, ChannelPolicyConfig};
use crate::contracts::{ChannelRegistry, CompletionClient, SkillRegistry};
use crate::decision::{DecisionEngine, DecisionLoop, DecisionLoopConfig, GuardrailConfig, LoopOutcome};
use crate::instance_lock::InstanceLock;
use crate::known_users::KnownUserRegistry;
use crate::memory::AgentMemoryManager;
use crate::orchestrator::Orchestrator;
use crate::queue::{Action, ActionId, ActionPayload, ActionQueue, ActionStatus, Lane, PushOutcome};
use crate::scheduler::{TickConfig, TickScheduler};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

/// Knobs a deployment picks once, at startup.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub tick_interval: Duration,
    pub decision_loop: DecisionLoopConfig,
    pub guardrails: GuardrailConfig,
    pub tick: TickConfig,
    pub channel_policy: ChannelPolicyConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            decision_loop: DecisionLoopConfig::default(),
            guardrails: GuardrailConfig::default(),
            tick: TickConfig::default(),
            channel_policy: ChannelPolicyConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Loads `config.toml` from `data_dir`, same read-whole-file-then-
    /// `toml::from_str` shape as `config::store::Config::load`. Only
    /// `channel_policy` round-trips through TOML today — the rest stay
    /// process-level constants a deployment sets in code, per §1.1
    /// ("config is loaded once at startup").
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("config.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let stored: StoredCoreConfig = toml::from_str(&content)?;
        Ok(Self {
            channel_policy: stored.channel_policy,
            ..Self::default()
        })
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let stored = StoredCoreConfig {
            channel_policy: self.channel_policy.clone(),
        };
        let content = toml::to_string_pretty(&stored)?;
        std::fs::create_dir_all(data_dir)?;
        std::fs::write(data_dir.join("config.toml"), content)?;
        Ok(())
    }
}

/// The TOML-serializable subset of [`CoreConfig`]. Tick intervals and
/// guardrail ceilings are deployment constants, not something an
/// operator edits on disk; a filesystem watcher for live edits is out
/// of scope (§9) — `reload()` is an explicit, caller-invoked re-read.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoredCoreConfig {
    channel_policy: ChannelPolicyConfig,
}

/// A new request arriving from a channel adapter, before it becomes an
/// [`Action`]. The caller is expected to already have resolved
/// `is_owner`; `Core` resolves `is_admin` itself via [`AdminRegistry`].
pub struct IncomingRequest {
    pub description: String,
    pub source: String,
    pub source_id: String,
    pub user_id: String,
    pub chat_id: String,
    pub message_id: String,
    pub sender_name: Option<String>,
    pub is_owner: bool,
    pub priority: u8,
}

pub struct Core {
    data_dir: PathBuf,
    config: CoreConfig,
    queue: Arc<ActionQueue>,
    memory: Arc<AgentMemoryManager>,
    skills: Arc<SkillRegistry>,
    channels: Arc<ChannelRegistry>,
    admin_registry: AdminRegistry,
    known_users: Arc<KnownUserRegistry>,
    tick_scheduler: Arc<TickScheduler>,
    decision_loop: Arc<DecisionLoop>,
    orchestrator: Arc<AsyncMutex<Orchestrator>>,
    cancellations: Arc<crate::state::CancellationSet>,
    lock: Option<InstanceLock>,
    running: Arc<AtomicBool>,
}

impl Core {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data_dir: impl Into<PathBuf>,
        config: CoreConfig,
        skills: Arc<SkillRegistry>,
        channels: Arc<ChannelRegistry>,
        llm: Arc<dyn CompletionClient>,
        engine: Arc<dyn DecisionEngine>,
    ) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        seed_bootstrap_files(&data_dir)?;

        let queue = Arc::new(ActionQueue::new(&data_dir)?);
        let memory = Arc::new(AgentMemoryManager::new(&data_dir)?);
        let orchestrator = Arc::new(AsyncMutex::new(Orchestrator::new(data_dir.join("orchestrator"))?));
        let cancellations = Arc::new(crate::state::CancellationSet::new());

        let admin_registry = AdminRegistry::new(config.channel_policy.clone());
        let channel_policy = ChannelPolicy::new(config.channel_policy.clone());
        let known_users = Arc::new(KnownUserRegistry::new(&data_dir)?);

        let tick_scheduler = Arc::new(TickScheduler::new(config.tick.clone(), queue.clone(), &data_dir));

        let decision_loop = Arc::new(DecisionLoop::new(
            config.decision_loop.clone(),
            channel_policy,
            config.guardrails.clone(),
            queue.clone(),
            memory.clone(),
            skills.clone(),
            channels.clone(),
            llm,
            engine,
            cancellations.clone(),
            known_users.clone(),
            tick_scheduler.clone(),
            orchestrator.clone(),
            data_dir.clone(),
        ));

        Ok(Self {
            data_dir,
            config,
            queue,
            memory,
            skills,
            channels,
            admin_registry,
            known_users,
            tick_scheduler,
            decision_loop,
            orchestrator,
            cancellations,
            lock: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Acquires the single-instance lock, recovers crashed state, and
    /// spawns the tick loop and the orchestrator event loop as
    /// background tasks. Returns once the loops are spawned, not once
    /// they finish — call [`Self::stop`] for an orderly shutdown.
    pub async fn start(&mut self) -> Result<()> {
        self.lock = Some(InstanceLock::acquire(&self.data_dir)?);

        self.tick_scheduler.recover_on_start()?;
        {
            let mut orch = self.orchestrator.lock().await;
            let recovered = orch.recover_on_start()?;
            if recovered > 0 {
                info!(recovered, "orchestrator recovered delegated tasks after restart");
            }
        }

        self.running.store(true, Ordering::SeqCst);

        let tick_scheduler = self.tick_scheduler.clone();
        let interval = self.config.tick_interval;
        let running_for_tick = self.running.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            while running_for_tick.load(Ordering::SeqCst) {
                ticker.tick().await;
                if let Err(e) = tick_scheduler.tick().await {
                    warn!(error = %e, "tick failed");
                }
            }
        });

        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move {
            let mut orch = orchestrator.lock().await;
            orch.run_event_loop().await;
        });

        self.spawn_dispatch_loop();

        info!("core started");
        Ok(())
    }

    fn spawn_dispatch_loop(&self) {
        let queue = self.queue.clone();
        let decision_loop = self.decision_loop.clone();
        let tick_scheduler = self.tick_scheduler.clone();
        let orchestrator = self.orchestrator.clone();
        let running_for_task = self.running.clone();

        tokio::spawn(async move {
            loop {
                if !running_for_task.load(Ordering::SeqCst) {
                    break;
                }
                let Some(action) = queue.next() else {
                    tokio::time::sleep(Duration::from_millis(250)).await;
                    continue;
                };
                queue.update_status(action.id, ActionStatus::InProgress);
                let is_heartbeat = action.payload.is_heartbeat;

                // §4.5: a heartbeat prompt is delegated to an idle worker
                // rather than executed on the primary, when one exists.
                if is_heartbeat {
                    let idle_worker = orchestrator.lock().await.idle_worker_id();
                    if let Some(agent_id) = idle_worker {
                        let mut orch = orchestrator.lock().await;
                        let delegated = orch
                            .delegate(agent_id, action.payload.description.clone(), action.priority)
                            .await;
                        drop(orch);
                        match delegated {
                            Ok(_) => {
                                queue.update_status(action.id, ActionStatus::Completed);
                                tick_scheduler.record_heartbeat_outcome(true);
                                continue;
                            }
                            Err(e) => {
                                warn!(error = %e, "failed to delegate heartbeat to idle worker; running on primary instead");
                            }
                        }
                    }
                }

                let outcome = decision_loop.run(action.id, false).await;
                if is_heartbeat {
                    let productive = matches!(outcome, LoopOutcome::GoalsMet);
                    tick_scheduler.record_heartbeat_outcome(productive);
                }
            }
        });
    }

    /// Orderly shutdown: stops the dispatch/tick loops, tells every
    /// worker process to shut down, and releases the instance lock.
    pub async fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        {
            let mut orch = self.orchestrator.lock().await;
            orch.shutdown_all().await?;
        }
        if let Some(lock) = self.lock.take() {
            lock.release();
        }
        info!("core stopped");
        Ok(())
    }

    /// Resolves `is_admin` via [`AdminRegistry`], builds an [`Action`],
    /// and pushes it through dedup/resume-on-reply.
    pub fn submit_request(&self, request: IncomingRequest) -> PushOutcome {
        let is_admin = self.admin_registry.is_admin(&request.source, &request.user_id);
        if let Err(e) = self
            .known_users
            .note_seen(&request.source, &request.user_id, request.sender_name.clone())
        {
            warn!(error = %e, "failed to record known-user sighting");
        }
        let payload = ActionPayload {
            description: request.description,
            source: Some(request.source),
            source_id: Some(request.source_id),
            user_id: Some(request.user_id),
            chat_id: Some(request.chat_id),
            message_id: Some(request.message_id),
            sender_name: request.sender_name,
            is_owner: request.is_owner,
            is_admin,
            requires_response: true,
            ..Default::default()
        };
        let outcome = self.queue.push(Action::new(request.priority, Lane::User, payload));
        if let PushOutcome::Resumed { note, .. } = &outcome {
            self.memory.write_short(note.action_id, note.content.clone());
        }
        outcome
    }

    pub fn cancel_action(&self, action_id: ActionId) {
        self.cancellations.cancel(action_id);
    }

    /// Re-reads `config.toml` and swaps in the parts of [`CoreConfig`]
    /// that are safe to change without restarting subsystems that were
    /// constructed from it (the channel policy). No filesystem watcher:
    /// callers invoke this explicitly, matching §1.1/§9's "no live
    /// config watcher" stance.
    pub fn reload(&mut self) -> Result<()> {
        let reloaded = CoreConfig::load(&self.data_dir)?;
        self.admin_registry = AdminRegistry::new(reloaded.channel_policy.clone());
        self.config.channel_policy = reloaded.channel_policy;
        info!("config reloaded");
        Ok(())
    }

    pub fn known_users(&self) -> &Arc<KnownUserRegistry> {
        &self.known_users
    }

    pub fn queue(&self) -> &Arc<ActionQueue> {
        &self.queue
    }

    pub fn orchestrator(&self) -> Arc<AsyncMutex<Orchestrator>> {
        self.orchestrator.clone()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
