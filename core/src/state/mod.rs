use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use serde_json::Value;

pub struct StateStore {
    data: HashMap<String, Value>,
    path: PathBuf,
}

impl StateStore {
    pub fn new() -> Result<Self> {
        let path = dirs::data_dir()
            .context("Could not find data directory")?
            .join("mylm")
            .join("state.json");
        
        let mut store = Self {
            data: HashMap::new(),
            path,
        };
        
        store.load()?;
        Ok(store)
    }

    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(());
        }

        self.data = serde_json::from_str(&content)
            .context("Failed to parse state file")?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, content)
            .context("Failed to write state file")?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).cloned()
    }

    pub fn set(&mut self, key: String, value: Value) -> Result<()> {
        self.data.insert(key, value);
        self.save()
    }

    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.data.remove(key);
        self.save()
    }

    pub fn list(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }
}

/// Cross-cutting cancellation flags the DecisionLoop checks at every step
/// boundary. `cancelAction(id)` (external API) just inserts into this set;
/// `clearActionQueue()` cancels every non-terminal action by inserting all
/// of their ids at once.
#[derive(Default)]
pub struct CancellationSet {
    inner: parking_lot::Mutex<std::collections::HashSet<crate::queue::ActionId>>,
}

impl CancellationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self, id: crate::queue::ActionId) {
        self.inner.lock().insert(id);
    }

    pub fn is_cancelled(&self, id: crate::queue::ActionId) -> bool {
        self.inner.lock().contains(&id)
    }

    pub fn clear(&self, id: crate::queue::ActionId) {
        self.inner.lock().remove(&id);
    }
}

#[cfg(test)]
mod cancellation_tests {
    use super::CancellationSet;
    use uuid::Uuid;

    #[test]
    fn cancel_then_clear_round_trips() {
        let set = CancellationSet::new();
        let id = Uuid::new_v4();
        assert!(!set.is_cancelled(id));
        set.cancel(id);
        assert!(set.is_cancelled(id));
        set.clear(id);
        assert!(!set.is_cancelled(id));
    }
}
