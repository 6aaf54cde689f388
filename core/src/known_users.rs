//! Known-user registry (`known_users.json`, §6)
//!
//! A flat record of users the core has seen before, keyed by
//! `(channel, user_id)`. Distinct from [`crate::channel_policy::AdminRegistry`]:
//! this tracks *who has talked to us*, the other tracks *who is allowed
//! to approve elevated actions*. Grounded on the same load/flush style
//! as [`crate::queue::ActionQueue`], but read far more often than
//! written, so it holds its snapshot behind a [`parking_lot::RwLock`]
//! instead of a plain `Mutex`.

use crate::persist::{read_json_or_default, write_json_atomic};
use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownUser {
    pub channel: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

pub struct KnownUserRegistry {
    path: PathBuf,
    users: RwLock<Vec<KnownUser>>,
}

impl KnownUserRegistry {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let path = data_dir.into().join("known_users.json");
        let users: Vec<KnownUser> = read_json_or_default(&path)?;
        Ok(Self {
            path,
            users: RwLock::new(users),
        })
    }

    /// Records a sighting, updating `last_seen`/`display_name` for an
    /// existing entry or appending a new one.
    pub fn note_seen(&self, channel: &str, user_id: &str, display_name: Option<String>) -> Result<()> {
        let now = Utc::now();
        let mut users = self.users.write();
        if let Some(existing) = users
            .iter_mut()
            .find(|u| u.channel == channel && u.user_id == user_id)
        {
            existing.last_seen = now;
            if display_name.is_some() {
                existing.display_name = display_name;
            }
        } else {
            users.push(KnownUser {
                channel: channel.to_string(),
                user_id: user_id.to_string(),
                display_name,
                first_seen: now,
                last_seen: now,
            });
        }
        write_json_atomic(&self.path, &*users)
    }

    pub fn is_known(&self, channel: &str, user_id: &str) -> bool {
        self.users
            .read()
            .iter()
            .any(|u| u.channel == channel && u.user_id == user_id)
    }

    pub fn snapshot(&self) -> Vec<KnownUser> {
        self.users.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_seen_then_is_known() {
        let dir = tempfile::tempdir().unwrap();
        let registry = KnownUserRegistry::new(dir.path()).unwrap();
        assert!(!registry.is_known("telegram", "u1"));
        registry.note_seen("telegram", "u1", Some("Ada".into())).unwrap();
        assert!(registry.is_known("telegram", "u1"));
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[test]
    fn repeated_sightings_update_rather_than_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let registry = KnownUserRegistry::new(dir.path()).unwrap();
        registry.note_seen("telegram", "u1", None).unwrap();
        registry.note_seen("telegram", "u1", Some("Ada".into())).unwrap();
        let snap = registry.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].display_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let registry = KnownUserRegistry::new(dir.path()).unwrap();
            registry.note_seen("discord", "u9", None).unwrap();
        }
        let reloaded = KnownUserRegistry::new(dir.path()).unwrap();
        assert!(reloaded.is_known("discord", "u9"));
    }
}
