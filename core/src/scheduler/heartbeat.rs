//! Heartbeat Generator (§4.5)
//!
//! Builds the rich autonomy-lane prompt a heartbeat action carries as its
//! `payload.description`, and the emission-rule bookkeeping (cooldown,
//! exponential idle-backoff) the tick handler consults before pushing a
//! new heartbeat action.

use crate::memory::MemoryEntry;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleSeverity {
    Low,
    Moderate,
    High,
}

impl IdleSeverity {
    fn from_idle_minutes(minutes: i64) -> Self {
        if minutes >= 240 {
            IdleSeverity::High
        } else if minutes >= 60 {
            IdleSeverity::Moderate
        } else {
            IdleSeverity::Low
        }
    }

    fn hint(self) -> &'static str {
        match self {
            IdleSeverity::Low => "Things have been active recently; a light check-in is enough.",
            IdleSeverity::Moderate => "It's been a while since the last productive interaction — consider a more substantial initiative.",
            IdleSeverity::High => "It's been quiet for a long stretch; this is a good moment for deeper creative initiative.",
        }
    }
}

/// Everything the rich heartbeat prompt draws from. Every field is
/// optional/defaulted because a heartbeat can fire very early, before
/// much memory or schedule state exists.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatContext {
    pub recent_memory: Vec<MemoryEntry>,
    pub active_schedules: Vec<String>,
    pub queue_tail: Vec<String>,
    pub user_profile: Option<String>,
    pub journal_tail: Option<String>,
    pub learning_tail: Option<String>,
    pub contact_summaries: Vec<String>,
    pub idle_minutes: i64,
    pub active_channels: Vec<String>,
    pub idle_worker_count: usize,
}

pub struct HeartbeatGenerator;

impl HeartbeatGenerator {
    pub fn build(ctx: &HeartbeatContext, now: DateTime<Utc>) -> String {
        let severity = IdleSeverity::from_idle_minutes(ctx.idle_minutes);
        let weekday = now.weekday();
        let is_weekend = matches!(weekday, chrono::Weekday::Sat | chrono::Weekday::Sun);
        let time_of_day = time_of_day_label(now.hour());

        let memory_block = block("Recent memory", &with_relative_age(&ctx.recent_memory, now));
        let schedules_block = block("Active recurring schedules", &ctx.active_schedules);
        let queue_block = block("Task queue (tail)", &ctx.queue_tail);
        let journal_block = ctx.journal_tail.clone().unwrap_or_else(|| "(empty)".to_string());
        let learning_block = ctx.learning_tail.clone().unwrap_or_else(|| "(empty)".to_string());
        let contacts_block = block("Contacts", &ctx.contact_summaries);
        let channels = if ctx.active_channels.is_empty() {
            "(none currently connected)".to_string()
        } else {
            ctx.active_channels.join(", ")
        };

        format!(
            "=== AUTONOMOUS HEARTBEAT ({now}) ===\n\
             Time of day: {time_of_day} ({weekday}{weekend_tag})\n\
             Idle severity: {severity:?} — {hint}\n\
             Active channels: {channels}\n\
             Idle workers available for delegation: {idle_workers}\n\n\
             {memory_block}\n\n{schedules_block}\n\n{queue_block}\n\n\
             === USER PROFILE ===\n{user_profile}\n\n\
             === JOURNAL (tail) ===\n{journal_block}\n\n\
             === LEARNING (tail) ===\n{learning_block}\n\n\
             {contacts_block}\n\n\
             You may act in one of two modes:\n\
             1. Reactive — follow up on something pending in the queue or a recent conversation.\n\
             2. Creative initiative — use the quiet time productively (research, tidy up memory, \
             draft something useful) without waiting to be asked.\n\n\
             Prioritize: pending user-facing follow-ups > overdue schedules > creative initiative.\n\
             If an idle worker is available and this would take meaningfully long, consider delegating it.",
            now = now.to_rfc3339(),
            time_of_day = time_of_day,
            weekday = weekday,
            weekend_tag = if is_weekend { " (weekend)" } else { "" },
            severity = severity,
            hint = severity.hint(),
            channels = channels,
            idle_workers = ctx.idle_worker_count,
            memory_block = memory_block,
            schedules_block = schedules_block,
            queue_block = queue_block,
            user_profile = ctx.user_profile.clone().unwrap_or_else(|| "(no profile yet)".to_string()),
            journal_block = journal_block,
            learning_block = learning_block,
            contacts_block = contacts_block,
        )
    }
}

fn time_of_day_label(hour: u32) -> &'static str {
    match hour {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=21 => "evening",
        _ => "late night",
    }
}

fn block(title: &str, lines: &[String]) -> String {
    if lines.is_empty() {
        format!("=== {title} ===\n(none)")
    } else {
        format!("=== {title} ===\n{}", lines.join("\n"))
    }
}

/// Tags each memory entry with how long ago it was written, e.g.
/// `[3m ago] task started: ...`. Callers further down only see the
/// flattened, tagged strings — the timestamp itself isn't otherwise
/// surfaced in the prompt.
fn with_relative_age(entries: &[MemoryEntry], now: DateTime<Utc>) -> Vec<String> {
    entries
        .iter()
        .map(|entry| format!("[{} ago] {}", relative_age_label(entry.timestamp, now), entry.content))
        .collect()
}

fn relative_age_label(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - then).num_seconds().max(0);
    if elapsed < 60 {
        format!("{elapsed}s")
    } else if elapsed < 3600 {
        format!("{}m", elapsed / 60)
    } else if elapsed < 86400 {
        format!("{}h", elapsed / 3600)
    } else {
        format!("{}d", elapsed / 86400)
    }
}

/// Emission-rule bookkeeping: 60s cross-heartbeat cooldown plus
/// exponential idle-backoff (doubling per unproductive heartbeat, capped
/// at 8x, reset on a productive outcome).
#[derive(Debug, Clone)]
pub struct HeartbeatBackoff {
    base_interval_secs: i64,
    multiplier: u32,
    last_fired_at: Option<DateTime<Utc>>,
}

const MAX_MULTIPLIER: u32 = 8;
const CROSS_HEARTBEAT_COOLDOWN_SECS: i64 = 60;

impl HeartbeatBackoff {
    pub fn new(base_interval_secs: i64) -> Self {
        Self {
            base_interval_secs,
            multiplier: 1,
            last_fired_at: None,
        }
    }

    pub fn effective_interval_secs(&self) -> i64 {
        self.base_interval_secs * self.multiplier as i64
    }

    pub fn should_fire(&self, now: DateTime<Utc>) -> bool {
        match self.last_fired_at {
            None => true,
            Some(last) => {
                let elapsed = (now - last).num_seconds();
                elapsed >= CROSS_HEARTBEAT_COOLDOWN_SECS && elapsed >= self.effective_interval_secs()
            }
        }
    }

    pub fn record_fire(&mut self, now: DateTime<Utc>) {
        self.last_fired_at = Some(now);
    }

    /// Doubles the backoff multiplier (capped at 8x) after an
    /// unproductive heartbeat (no tools, no messages, goals already met
    /// trivially).
    pub fn record_unproductive(&mut self) {
        self.multiplier = (self.multiplier * 2).min(MAX_MULTIPLIER);
    }

    /// Resets to the base interval after a productive heartbeat.
    pub fn record_productive(&mut self) {
        self.multiplier = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_includes_timestamp_and_mode_guidance() {
        let ctx = HeartbeatContext::default();
        let prompt = HeartbeatGenerator::build(&ctx, Utc::now());
        assert!(prompt.contains("AUTONOMOUS HEARTBEAT"));
        assert!(prompt.contains("Reactive"));
        assert!(prompt.contains("Creative initiative"));
    }

    #[test]
    fn relative_age_tags_recent_and_old_entries_differently() {
        use crate::memory::{MemoryEntryType, MemoryMetadata};

        let now = Utc::now();
        let recent = MemoryEntry {
            id: uuid::Uuid::new_v4(),
            r#type: MemoryEntryType::Short,
            content: "just happened".to_string(),
            timestamp: now - chrono::Duration::seconds(30),
            metadata: MemoryMetadata::default(),
        };
        let old = MemoryEntry {
            id: uuid::Uuid::new_v4(),
            r#type: MemoryEntryType::Episodic,
            content: "a while ago".to_string(),
            timestamp: now - chrono::Duration::hours(3),
            metadata: MemoryMetadata::default(),
        };
        let tagged = with_relative_age(&[recent, old], now);
        assert!(tagged[0].starts_with("[30s ago]"));
        assert!(tagged[1].starts_with("[3h ago]"));
    }

    #[test]
    fn build_includes_relative_age_tags_in_memory_block() {
        let now = Utc::now();
        let mut ctx = HeartbeatContext::default();
        ctx.recent_memory.push(MemoryEntry {
            id: uuid::Uuid::new_v4(),
            r#type: crate::memory::MemoryEntryType::Short,
            content: "checked the inbox".to_string(),
            timestamp: now - chrono::Duration::minutes(5),
            metadata: crate::memory::MemoryMetadata::default(),
        });
        let prompt = HeartbeatGenerator::build(&ctx, now);
        assert!(prompt.contains("5m ago"));
        assert!(prompt.contains("checked the inbox"));
    }

    #[test]
    fn backoff_doubles_on_unproductive_and_resets_on_productive() {
        let mut backoff = HeartbeatBackoff::new(300);
        assert_eq!(backoff.effective_interval_secs(), 300);
        backoff.record_unproductive();
        assert_eq!(backoff.effective_interval_secs(), 600);
        backoff.record_unproductive();
        assert_eq!(backoff.effective_interval_secs(), 1200);
        backoff.record_productive();
        assert_eq!(backoff.effective_interval_secs(), 300);
    }

    #[test]
    fn backoff_caps_at_eight_times() {
        let mut backoff = HeartbeatBackoff::new(300);
        for _ in 0..10 {
            backoff.record_unproductive();
        }
        assert_eq!(backoff.effective_interval_secs(), 300 * 8);
    }

    #[test]
    fn should_not_fire_within_cross_heartbeat_cooldown() {
        let mut backoff = HeartbeatBackoff::new(300);
        let now = Utc::now();
        backoff.record_fire(now);
        assert!(!backoff.should_fire(now + chrono::Duration::seconds(30)));
        assert!(backoff.should_fire(now + chrono::Duration::seconds(301)));
    }
}
