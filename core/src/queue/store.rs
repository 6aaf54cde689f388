//! `actions.json` persistence
//!
//! Same write-temp-then-rename discipline as the teacher's
//! `scheduler::store::JobStore`, specialised for the action queue's file.

use super::model::Action;
use crate::persist::{read_json_or_default, write_json_atomic};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionsFile {
    pub actions: Vec<Action>,
}

pub struct ActionStore {
    path: PathBuf,
}

impl ActionStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join("actions.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Action>> {
        let file: ActionsFile = read_json_or_default(&self.path)?;
        Ok(file.actions)
    }

    pub fn save(&self, actions: &[Action]) -> Result<()> {
        let file = ActionsFile {
            actions: actions.to_vec(),
        };
        write_json_atomic(&self.path, &file)
    }
}
