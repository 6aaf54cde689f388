//! Shared atomic JSON persistence
//!
//! Every subsystem that owns a `*.json` file under the data directory
//! (actions, schedules, memory, orchestrator state, known users) goes
//! through this helper so that a crash mid-write never corrupts the file.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

/// Write `value` to `path` as pretty JSON using write-temp-then-rename.
///
/// The temp file lives next to the destination so the rename stays on the
/// same filesystem (required for atomicity on POSIX).
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .context("destination path has no parent directory")?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create parent dir: {:?}", parent))?;

    let content = serde_json::to_string_pretty(value).context("failed to serialize to JSON")?;

    let tmp = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4()));
    std::fs::write(&tmp, content.as_bytes())
        .with_context(|| format!("failed to write temp file: {:?}", tmp))?;

    if let Err(rename_err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(rename_err).context("failed to rename temp file into place");
    }

    Ok(())
}

/// Read and parse `path` as JSON, returning `T::default()` if the file is
/// missing or empty. Parse errors are surfaced (a corrupt file is not the
/// same thing as an absent one).
pub fn read_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {:?}", path))?;

    if content.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&content).with_context(|| format!("failed to parse JSON: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Sample {
        count: u32,
        name: String,
    }

    #[test]
    fn round_trips_through_atomic_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");

        let value = Sample {
            count: 3,
            name: "hi".into(),
        };
        write_json_atomic(&path, &value).unwrap();

        let loaded: Sample = read_json_or_default(&path).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded: Sample = read_json_or_default(&path).unwrap();
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn empty_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "").unwrap();
        let loaded: Sample = read_json_or_default(&path).unwrap();
        assert_eq!(loaded, Sample::default());
    }
}
