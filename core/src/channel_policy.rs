//! ChannelPolicy + Admin
//!
//! Keeps two small, config-driven registries the GuardrailEngine consults:
//! which channel a tool is allowed to target, and which user ids are
//! admins per channel. Both load from `ChannelPolicyConfig`, following the
//! teacher's config-struct-per-subsystem convention (`config/mod.rs`).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelPolicyConfig {
    /// tool name -> channel it is allowed to target
    pub tool_channel_map: HashMap<String, String>,
    /// tools exempt from the same-channel restriction (e.g. `send_email`,
    /// which always targets its own external channel)
    pub cross_channel_exempt_tools: HashSet<String>,
    /// channel -> set of admin user ids
    pub admin_users: HashMap<String, HashSet<String>>,
}

impl Default for ChannelPolicyConfig {
    fn default() -> Self {
        let mut tool_channel_map = HashMap::new();
        for tool in ["send_message", "send_file", "send_image", "send_voice_note", "react"] {
            tool_channel_map.insert(tool.to_string(), "__origin__".to_string());
        }

        let mut cross_channel_exempt_tools = HashSet::new();
        cross_channel_exempt_tools.insert("send_email".to_string());

        Self {
            tool_channel_map,
            cross_channel_exempt_tools,
            admin_users: HashMap::new(),
        }
    }
}

/// Fixed allowlist of write/execute-class skills that require `is_admin`.
pub const ELEVATED_SKILLS: &[&str] = &[
    "run_command",
    "write_file",
    "delete_file",
    "install_package",
    "manage_skills",
    "browser_navigate",
    "browser_click",
    "browser_type",
    "schedule_task",
    "cancel_scheduled_task",
    "generate_image",
    "generate_voice",
    "update_config",
    "spawn_agent",
    "shutdown_agent",
];

pub struct ChannelPolicy {
    config: ChannelPolicyConfig,
}

impl ChannelPolicy {
    pub fn new(config: ChannelPolicyConfig) -> Self {
        Self { config }
    }

    /// Whether `tool` is allowed to send to `target_channel` given the
    /// action originated on `origin_channel`.
    pub fn allows(&self, tool: &str, origin_channel: &str, target_channel: &str) -> bool {
        if self.config.cross_channel_exempt_tools.contains(tool) {
            return true;
        }
        match self.config.tool_channel_map.get(tool) {
            Some(mapped) if mapped == "__origin__" => target_channel == origin_channel,
            Some(mapped) => mapped == target_channel,
            None => target_channel == origin_channel,
        }
    }
}

pub struct AdminRegistry {
    config: ChannelPolicyConfig,
}

impl AdminRegistry {
    pub fn new(config: ChannelPolicyConfig) -> Self {
        Self { config }
    }

    pub fn is_admin(&self, channel: &str, user_id: &str) -> bool {
        self.config
            .admin_users
            .get(channel)
            .map(|set| set.contains(user_id))
            .unwrap_or(false)
    }
}

pub fn is_elevated_skill(tool: &str) -> bool {
    ELEVATED_SKILLS.contains(&tool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_send_tools_are_restricted_to_origin_channel() {
        let policy = ChannelPolicy::new(ChannelPolicyConfig::default());
        assert!(policy.allows("send_message", "telegram", "telegram"));
        assert!(!policy.allows("send_message", "telegram", "discord"));
    }

    #[test]
    fn exempt_tools_cross_channels_freely() {
        let policy = ChannelPolicy::new(ChannelPolicyConfig::default());
        assert!(policy.allows("send_email", "telegram", "email"));
    }

    #[test]
    fn admin_registry_checks_per_channel_membership() {
        let mut config = ChannelPolicyConfig::default();
        config
            .admin_users
            .entry("telegram".to_string())
            .or_default()
            .insert("owner-1".to_string());
        let registry = AdminRegistry::new(config);
        assert!(registry.is_admin("telegram", "owner-1"));
        assert!(!registry.is_admin("telegram", "stranger"));
        assert!(!registry.is_admin("discord", "owner-1"));
    }

    #[test]
    fn elevated_skill_check() {
        assert!(is_elevated_skill("run_command"));
        assert!(!is_elevated_skill("web_search"));
    }
}
