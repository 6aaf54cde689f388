//! Events that flow into the Agency Kernel
//!
//! Re-exported from shared types.

pub use crate::agent::types::events::*;

// Re-export Context from intents (it's shared)
pub use crate::agent::types::intents::{Context, Message, Role, TokenBudget, ToolSchema};
