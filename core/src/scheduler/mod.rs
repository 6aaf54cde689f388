pub mod daemon;
pub mod entry;
pub mod heartbeat;
pub mod model;
pub mod store;
pub mod tick;

pub use daemon::SchedulerDaemon;
pub use model::{
    AgentContextSpec, AgentTaskAction, CronSchedule, DurationSpec, IntervalSchedule, JobAction,
    JobId, JobPolicy, JobSchedule, JobTimezone, MisfirePolicy, OverlapPolicy, ScheduledJob,
};

pub use store::{JobStore, JobsFile};

pub use entry::{ScheduleEntry, ScheduleId, ScheduleKind, ScheduleSpec, ScheduleStore};
pub use heartbeat::{HeartbeatBackoff, HeartbeatContext, HeartbeatGenerator};
pub use tick::{TickConfig, TickScheduler};

