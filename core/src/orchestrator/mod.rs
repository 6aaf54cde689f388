//! Orchestrator & Worker IPC (§4.6)
//!
//! The primary agent's delegation surface: spawn named sub-agents as
//! child processes, hand them [`task::DelegatedTask`]s over the
//! [`ipc`] wire format, and keep the delegated-task state machine
//! consistent when workers go ready, finish, fail, or simply die.

pub mod agent;
pub mod ipc;
pub mod task;
pub mod worker;

pub use agent::{normalize_capabilities, AgentId, AgentInstance, AgentStatus, PRIMARY_AGENT_ID};
pub use ipc::{ParentMessage, WorkerMessage};
pub use task::{DelegatedTask, DelegatedTaskStatus, TaskId};
pub use worker::WorkerHandle;

use crate::persist::{read_json_or_default, write_json_atomic};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const WORKER_EXIT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Serialize, Deserialize)]
struct AgentsFile {
    agents: Vec<AgentInstance>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TasksFile {
    tasks: Vec<DelegatedTask>,
}

/// Spawn configuration for a new worker, supplied by whatever skill or
/// DecisionLoop step requests delegation.
pub struct SpawnConfig {
    pub name: String,
    pub role: String,
    pub parent_id: Option<AgentId>,
    pub capabilities: Vec<String>,
    pub program: String,
    pub args: Vec<String>,
}

impl SpawnConfig {
    /// A worker spawned as a re-exec of the current binary with a
    /// `--worker` flag, the shape §4.6 describes ("forks a worker
    /// process... via re-exec"). Callers that genuinely need an arbitrary
    /// program (tests, a future non-self-hosted worker kind) still go
    /// through the plain struct literal.
    pub fn worker(name: impl Into<String>, role: impl Into<String>, parent_id: Option<AgentId>, capabilities: Vec<String>) -> Result<Self> {
        let program = std::env::current_exe()?
            .to_str()
            .ok_or_else(|| anyhow!("current executable path is not valid UTF-8"))?
            .to_string();
        Ok(Self {
            name: name.into(),
            role: role.into(),
            parent_id,
            capabilities,
            program,
            args: vec!["--worker".to_string()],
        })
    }
}

/// Owns every [`AgentInstance`], every [`DelegatedTask`], and the live
/// [`WorkerHandle`] for whichever agents currently have a process
/// running. Not `Clone`; callers share it behind an owning task (see
/// the event loop pattern in [`Self::run_event_loop`]).
pub struct Orchestrator {
    data_dir: PathBuf,
    agents: HashMap<AgentId, AgentInstance>,
    tasks: HashMap<TaskId, DelegatedTask>,
    workers: HashMap<AgentId, WorkerHandle>,
    ready: std::collections::HashSet<AgentId>,
    pending_task_dispatch: HashMap<AgentId, Vec<TaskId>>,
    cancelled_reasons: HashMap<TaskId, String>,
    events_tx: mpsc::Sender<(AgentId, WorkerMessage)>,
    events_rx: mpsc::Receiver<(AgentId, WorkerMessage)>,
}

impl Orchestrator {
    fn agents_path(&self) -> PathBuf {
        self.data_dir.join("agents.json")
    }

    fn tasks_path(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }

    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let (events_tx, events_rx) = mpsc::channel(256);
        let mut orch = Self {
            data_dir,
            agents: HashMap::new(),
            tasks: HashMap::new(),
            workers: HashMap::new(),
            ready: std::collections::HashSet::new(),
            pending_task_dispatch: HashMap::new(),
            cancelled_reasons: HashMap::new(),
            events_tx,
            events_rx,
        };
        orch.load()?;
        Ok(orch)
    }

    fn load(&mut self) -> Result<()> {
        let agents_file: AgentsFile = read_json_or_default(&self.agents_path())?;
        let tasks_file: TasksFile = read_json_or_default(&self.tasks_path())?;
        for agent in agents_file.agents {
            self.agents.insert(agent.id, agent);
        }
        for task in tasks_file.tasks {
            self.tasks.insert(task.id, task);
        }
        Ok(())
    }

    fn persist_agents(&self) -> Result<()> {
        let file = AgentsFile {
            agents: self.agents.values().cloned().collect(),
        };
        write_json_atomic(&self.agents_path(), &file)
    }

    fn persist_tasks(&self) -> Result<()> {
        let file = TasksFile {
            tasks: self.tasks.values().cloned().collect(),
        };
        write_json_atomic(&self.tasks_path(), &file)
    }

    /// Any tasks whose `assigned_to` points at an agent with no running
    /// worker handle get reverted to `pending` — this is the crash
    /// recovery path run once at startup, mirroring
    /// [`crate::queue::ActionQueue::fail_stalled`]'s "in-progress from a
    /// previous run is stale by definition" stance.
    pub fn recover_on_start(&mut self) -> Result<usize> {
        let mut recovered = 0;
        for task in self.tasks.values_mut() {
            if !task.is_terminal() && task.assigned_to.is_some() {
                task.revert_to_pending("orchestrator restarted with no worker process attached");
                recovered += 1;
            }
        }
        for agent in self.agents.values_mut() {
            if agent.status == AgentStatus::Working {
                agent.status = AgentStatus::Idle;
                agent.current_task = None;
            }
        }
        if recovered > 0 {
            self.persist_tasks()?;
            self.persist_agents()?;
        }
        Ok(recovered)
    }

    /// Creates an [`AgentInstance`], allocates its data directory, and
    /// starts its worker process. Tasks assigned before the process
    /// reports `ready` queue in `pending_task_dispatch`.
    pub async fn spawn_agent(&mut self, config: SpawnConfig) -> Result<AgentId> {
        let instance = AgentInstance::new(
            config.name,
            config.role,
            config.parent_id,
            config.capabilities,
            self.data_dir.clone(),
        );
        let agent_id = instance.id;
        std::fs::create_dir_all(instance.memory_path.parent().unwrap())?;

        let handle = WorkerHandle::spawn(agent_id, &config.program, &config.args, self.events_tx.clone())?;
        let pid = handle.pid;

        let mut instance = instance;
        instance.pid = pid;
        self.agents.insert(agent_id, instance);
        self.workers.insert(agent_id, handle);
        self.persist_agents()?;

        info!(%agent_id, "spawned worker agent");
        Ok(agent_id)
    }

    /// Sends `Init` to a freshly-spawned worker. Split from `spawn_agent`
    /// so callers can build a config payload (bootstrap content, channel
    /// list) after the data directory is known to exist.
    pub async fn initialize_agent(&mut self, agent_id: AgentId, config: serde_json::Value) -> Result<()> {
        let data_dir = self
            .agents
            .get(&agent_id)
            .map(|a| a.memory_path.parent().unwrap().to_path_buf())
            .ok_or_else(|| anyhow!("unknown agent {agent_id}"))?;
        let handle = self
            .workers
            .get_mut(&agent_id)
            .ok_or_else(|| anyhow!("agent {agent_id} has no running worker process"))?;
        handle
            .send(&ParentMessage::Init {
                data_dir: data_dir.to_string_lossy().into_owned(),
                config,
            })
            .await
    }

    /// Creates a [`DelegatedTask`] and assigns it to `agent_id`, queuing
    /// dispatch if the worker isn't `ready` yet. If the agent isn't
    /// `idle`, returns an error rather than silently overwriting its
    /// current assignment.
    pub async fn delegate(&mut self, agent_id: AgentId, description: impl Into<String>, priority: u8) -> Result<TaskId> {
        let agent = self
            .agents
            .get_mut(&agent_id)
            .ok_or_else(|| anyhow!("unknown agent {agent_id}"))?;
        if agent.status != AgentStatus::Idle {
            return Err(anyhow!("agent {agent_id} is not idle (status: {:?})", agent.status));
        }

        let mut task = DelegatedTask::new(description, priority);
        task.assigned_to = Some(agent_id);
        task.status = DelegatedTaskStatus::Assigned;
        let task_id = task.id;

        agent.status = AgentStatus::Working;
        agent.current_task = Some(task_id);
        agent.touch();

        self.tasks.insert(task_id, task);
        self.persist_tasks()?;
        self.persist_agents()?;

        if self.ready.contains(&agent_id) {
            self.dispatch_task(agent_id, task_id).await?;
        } else {
            self.pending_task_dispatch.entry(agent_id).or_default().push(task_id);
        }

        Ok(task_id)
    }

    async fn dispatch_task(&mut self, agent_id: AgentId, task_id: TaskId) -> Result<()> {
        let payload = self
            .tasks
            .get(&task_id)
            .map(|t| serde_json::json!({"description": t.description, "priority": t.priority}))
            .ok_or_else(|| anyhow!("unknown task {task_id}"))?;

        let send_result = match self.workers.get_mut(&agent_id) {
            Some(handle) => {
                handle
                    .send(&ParentMessage::Task {
                        task_id: task_id.to_string(),
                        payload,
                    })
                    .await
            }
            None => Err(anyhow!("agent {agent_id} has no running worker process")),
        };

        if let Err(e) = send_result {
            warn!(%agent_id, %task_id, error = %e, "task dispatch failed, reverting state atomically");
            if let Some(task) = self.tasks.get_mut(&task_id) {
                task.revert_to_pending(format!("dispatch failed: {e}"));
            }
            if let Some(agent) = self.agents.get_mut(&agent_id) {
                agent.status = AgentStatus::Idle;
                agent.current_task = None;
            }
            self.persist_tasks()?;
            self.persist_agents()?;
            return Err(e);
        }

        Ok(())
    }

    /// Marks `task_id` cancelled so the exit handler attributes the
    /// worker's exit to the cancellation rather than an unexpected crash.
    pub fn cancel_task(&mut self, task_id: TaskId, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.mark_failed(format!("cancelled: {reason}"));
        }
        self.cancelled_reasons.insert(task_id, reason);
        self.persist_tasks()
    }

    /// Drains worker events until the channel closes. Intended to run as
    /// its own tokio task alongside the rest of `Core`.
    pub async fn run_event_loop(&mut self) {
        while let Some((agent_id, msg)) = self.events_rx.recv().await {
            if let Err(e) = self.handle_worker_message(agent_id, msg).await {
                warn!(%agent_id, error = %e, "error handling worker message");
            }
        }
    }

    async fn handle_worker_message(&mut self, agent_id: AgentId, msg: WorkerMessage) -> Result<()> {
        match msg {
            WorkerMessage::Ready => {
                self.ready.insert(agent_id);
                let pending = self.pending_task_dispatch.remove(&agent_id).unwrap_or_default();
                for task_id in pending {
                    self.dispatch_task(agent_id, task_id).await?;
                }
            }
            WorkerMessage::TaskCompleted { task_id, result } => {
                let task_id: TaskId = task_id.parse()?;
                if let Some(task) = self.tasks.get_mut(&task_id) {
                    task.mark_completed(result);
                }
                self.release_agent(agent_id)?;
                self.persist_tasks()?;
            }
            WorkerMessage::TaskFailed { task_id, error } => {
                let task_id: TaskId = task_id.parse()?;
                if let Some(task) = self.tasks.get_mut(&task_id) {
                    task.mark_failed(error);
                }
                self.release_agent(agent_id)?;
                self.persist_tasks()?;
            }
            WorkerMessage::TaskStarted { task_id } => {
                let task_id: TaskId = task_id.parse()?;
                if let Some(task) = self.tasks.get_mut(&task_id) {
                    task.status = DelegatedTaskStatus::InProgress;
                }
                self.persist_tasks()?;
            }
            WorkerMessage::Status { .. } | WorkerMessage::Pong => {}
            WorkerMessage::Log { level, message } => {
                info!(%agent_id, level, "{}", message);
            }
            WorkerMessage::Error { message } => {
                warn!(%agent_id, "worker reported error: {}", message);
            }
        }
        Ok(())
    }

    fn release_agent(&mut self, agent_id: AgentId) -> Result<()> {
        if let Some(agent) = self.agents.get_mut(&agent_id) {
            agent.status = AgentStatus::Idle;
            agent.current_task = None;
            agent.touch();
        }
        self.persist_agents()
    }

    /// Polls every tracked worker for an unexpected exit and, for any
    /// task still assigned to it that wasn't explicitly cancelled,
    /// re-queues the task to `pending` recording the exit code. Meant to
    /// be called from the same tick cadence as
    /// [`crate::scheduler::tick::TickScheduler`].
    pub fn reap_exited_workers(&mut self) -> Result<()> {
        let mut exited = Vec::new();
        for (agent_id, handle) in self.workers.iter_mut() {
            if let Some(code) = handle.try_wait_exit_code() {
                exited.push((*agent_id, code));
            }
        }

        for (agent_id, code) in exited {
            self.workers.remove(&agent_id);
            self.ready.remove(&agent_id);

            let assigned_task = self
                .agents
                .get(&agent_id)
                .and_then(|a| a.current_task);

            if let Some(agent) = self.agents.get_mut(&agent_id) {
                agent.status = AgentStatus::Terminated;
                agent.current_task = None;
            }

            if let Some(task_id) = assigned_task {
                let already_cancelled = self.cancelled_reasons.remove(&task_id).is_some();
                if let Some(task) = self.tasks.get_mut(&task_id) {
                    if !already_cancelled && !task.is_terminal() {
                        task.revert_to_pending(format!("worker exited unexpectedly with code {code}"));
                        warn!(%agent_id, %task_id, code, "worker exited unexpectedly, task re-queued");
                    }
                }
            }
        }

        self.persist_agents()?;
        self.persist_tasks()
    }

    /// Sends `Shutdown` to every running worker and waits (bounded by
    /// [`WORKER_EXIT_GRACE`]) for a clean exit before force-killing.
    pub async fn shutdown_all(&mut self) -> Result<()> {
        let agent_ids: Vec<AgentId> = self.workers.keys().copied().collect();
        for agent_id in &agent_ids {
            if let Some(handle) = self.workers.get_mut(agent_id) {
                let _ = handle.send(&ParentMessage::Shutdown).await;
            }
        }
        for agent_id in agent_ids {
            if let Some(mut handle) = self.workers.remove(&agent_id) {
                let _ = handle.terminate(WORKER_EXIT_GRACE).await;
            }
        }
        Ok(())
    }

    pub fn agent(&self, agent_id: AgentId) -> Option<&AgentInstance> {
        self.agents.get(&agent_id)
    }

    /// The id of any non-primary agent currently `idle`, used by the
    /// heartbeat dispatcher (§4.5: "if idle workers exist, delegate
    /// rather than execute on the primary"). Arbitrary among ties.
    pub fn idle_worker_id(&self) -> Option<AgentId> {
        self.agents
            .values()
            .find(|a| a.id != agent::PRIMARY_AGENT_ID && a.status == AgentStatus::Idle)
            .map(|a| a.id)
    }

    /// How many non-primary agents are currently `idle`, for the heartbeat
    /// prompt's "idle workers available for delegation" line.
    pub fn idle_worker_count(&self) -> usize {
        self.agents
            .values()
            .filter(|a| a.id != agent::PRIMARY_AGENT_ID && a.status == AgentStatus::Idle)
            .count()
    }

    pub fn task(&self, task_id: TaskId) -> Option<&DelegatedTask> {
        self.tasks.get(&task_id)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_agent(status: AgentStatus) -> AgentInstance {
        let mut a = AgentInstance::new("scout", "researcher", None, vec!["research".into()], PathBuf::from("/tmp/x"));
        a.status = status;
        a
    }

    #[test]
    fn recover_on_start_reverts_non_terminal_assigned_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel(8);
        let mut orch = Orchestrator {
            data_dir: dir.path().to_path_buf(),
            agents: HashMap::new(),
            tasks: HashMap::new(),
            workers: HashMap::new(),
            ready: Default::default(),
            pending_task_dispatch: HashMap::new(),
            cancelled_reasons: HashMap::new(),
            events_tx: tx,
            events_rx: rx,
        };

        let agent = make_agent(AgentStatus::Working);
        let agent_id = agent.id;
        let mut task = DelegatedTask::new("dig up context", 3);
        task.assigned_to = Some(agent_id);
        task.status = DelegatedTaskStatus::InProgress;
        let task_id = task.id;

        orch.agents.insert(agent_id, agent);
        orch.tasks.insert(task_id, task);

        let recovered = orch.recover_on_start().unwrap();
        assert_eq!(recovered, 1);
        assert_eq!(orch.tasks[&task_id].status, DelegatedTaskStatus::Pending);
        assert!(orch.tasks[&task_id].assigned_to.is_none());
        assert_eq!(orch.agents[&agent_id].status, AgentStatus::Idle);
    }

    #[test]
    fn reap_without_any_workers_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel(8);
        let mut orch = Orchestrator {
            data_dir: dir.path().to_path_buf(),
            agents: HashMap::new(),
            tasks: HashMap::new(),
            workers: HashMap::new(),
            ready: Default::default(),
            pending_task_dispatch: HashMap::new(),
            cancelled_reasons: HashMap::new(),
            events_tx: tx,
            events_rx: rx,
        };
        assert!(orch.reap_exited_workers().is_ok());
    }
}
