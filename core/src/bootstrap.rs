//! Bootstrap Markdown seeding (§6)
//!
//! `IDENTITY.md`, `SOUL.md`, `AGENTS.md`, `TOOLS.md`, `USER.md`,
//! `JOURNAL.md`, and `LEARNING.md` are opaque text fed to the completion
//! client as context; the runtime never parses them. Grounded on
//! [`crate::config::v2::prompts::install_default_prompts`]'s
//! write-only-if-absent pattern for seeding a user-editable prompts
//! directory.

use anyhow::{Context, Result};
use std::path::Path;

const BOOTSTRAP_FILES: &[(&str, &str)] = &[
    (
        "IDENTITY.md",
        "# Identity\n\nYou are an autonomous assistant. This file describes who you are to \
         yourself and to the people you work with. Edit it to change your name, tone, and role.\n",
    ),
    (
        "SOUL.md",
        "# Soul\n\nYour values and the principles that should survive any single \
         conversation: what you optimize for, what you refuse to do, how you weigh \
         caution against usefulness.\n",
    ),
    (
        "AGENTS.md",
        "# Agents\n\nRoster of worker agents you may delegate to, and what each one is \
         good at. Update this as you spawn and retire workers.\n",
    ),
    (
        "TOOLS.md",
        "# Tools\n\nNotes on the tools/skills available to you: quirks, rate limits, \
         and usage conventions that aren't obvious from their descriptions alone.\n",
    ),
    (
        "USER.md",
        "# User\n\nWhat you know about the person or people you work with: names, \
         preferences, standing instructions, recurring context.\n",
    ),
    (
        "JOURNAL.md",
        "# Journal\n\nA running log, in your own words, of what happened and why. \
         Append-only; treat earlier entries as history, not instructions to re-derive.\n",
    ),
    (
        "LEARNING.md",
        "# Learning\n\nLessons learned the hard way: mistakes, surprises, and the \
         corrections they led to. Consult this before repeating a decision.\n",
    ),
];

/// Writes every bootstrap file under `data_dir` that doesn't already
/// exist, leaving existing files untouched. Returns the names of files
/// it actually created.
pub fn seed_bootstrap_files(data_dir: &Path) -> Result<Vec<&'static str>> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data dir: {:?}", data_dir))?;

    let mut created = Vec::new();
    for (name, default_content) in BOOTSTRAP_FILES {
        let path = data_dir.join(name);
        if !path.exists() {
            std::fs::write(&path, default_content)
                .with_context(|| format!("failed to write bootstrap file: {:?}", path))?;
            created.push(*name);
        }
    }
    Ok(created)
}

/// Reads every bootstrap file present under `data_dir`, in a stable
/// order, as a list of `(filename, content)` pairs. Missing files are
/// silently skipped rather than seeded — seeding is an explicit,
/// separate step so callers can decide when first-run creation happens.
pub fn read_bootstrap_files(data_dir: &Path) -> Result<Vec<(&'static str, String)>> {
    let mut out = Vec::new();
    for (name, _) in BOOTSTRAP_FILES {
        let path = data_dir.join(name);
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read bootstrap file: {:?}", path))?;
            out.push((*name, content));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_all_files_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let created = seed_bootstrap_files(dir.path()).unwrap();
        assert_eq!(created.len(), BOOTSTRAP_FILES.len());
        for (name, _) in BOOTSTRAP_FILES {
            assert!(dir.path().join(name).exists());
        }
    }

    #[test]
    fn does_not_overwrite_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        seed_bootstrap_files(dir.path()).unwrap();
        std::fs::write(dir.path().join("JOURNAL.md"), "custom entry\n").unwrap();

        let created = seed_bootstrap_files(dir.path()).unwrap();
        assert!(created.is_empty());
        let content = std::fs::read_to_string(dir.path().join("JOURNAL.md")).unwrap();
        assert_eq!(content, "custom entry\n");
    }

    #[test]
    fn read_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path().join("IDENTITY.md"), "hi\n").unwrap();
        let files = read_bootstrap_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "IDENTITY.md");
    }
}
