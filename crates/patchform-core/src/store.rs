//! JSON persistence for snapshots, diffs, and apply logs.
//!
//! State lives in a dedicated directory under the repo root (by default
//! `.patchform_state/`), one pretty-printed JSON document per artifact.
//! The directory is excluded from scans by the default ignore list.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::Settings;
use crate::errors::PatchformResult;
use crate::models::{ApplyLog, DiffResult, Snapshot};

pub const SNAPSHOT_FILE: &str = "last_snapshot.json";
pub const DIFF_FILE: &str = "last_diff.json";
pub const APPLY_LOG_FILE: &str = "last_apply_log.json";

/// The state directory for a repo root, per settings.
pub fn state_dir(repo_root: &Path, settings: &Settings) -> PathBuf {
    repo_root.join(&settings.state_dir)
}

/// Serialize `value` as pretty JSON at `path`, creating parent directories.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> PatchformResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    debug!(path = %path.display(), "state written");
    Ok(())
}

/// Deserialize a JSON document from `path`.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> PatchformResult<T> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn save_snapshot(repo_root: &Path, settings: &Settings, snap: &Snapshot) -> PatchformResult<()> {
    save_json(&state_dir(repo_root, settings).join(SNAPSHOT_FILE), snap)
}

pub fn load_snapshot(repo_root: &Path, settings: &Settings) -> PatchformResult<Snapshot> {
    load_json(&state_dir(repo_root, settings).join(SNAPSHOT_FILE))
}

pub fn save_diff(repo_root: &Path, settings: &Settings, diff: &DiffResult) -> PatchformResult<()> {
    save_json(&state_dir(repo_root, settings).join(DIFF_FILE), diff)
}

pub fn load_diff(repo_root: &Path, settings: &Settings) -> PatchformResult<DiffResult> {
    load_json(&state_dir(repo_root, settings).join(DIFF_FILE))
}

pub fn save_apply_log(repo_root: &Path, settings: &Settings, log: &ApplyLog) -> PatchformResult<()> {
    save_json(&state_dir(repo_root, settings).join(APPLY_LOG_FILE), log)
}

pub fn load_apply_log(repo_root: &Path, settings: &Settings) -> PatchformResult<ApplyLog> {
    load_json(&state_dir(repo_root, settings).join(APPLY_LOG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnapshotSummary;

    #[test]
    fn test_snapshot_round_trips_through_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::default();
        let snap = Snapshot {
            repo_root: dir.path().to_string_lossy().to_string(),
            generated_at: "2026-01-01 00:00:00".to_string(),
            file_count: 0,
            files: Vec::new(),
            summary: SnapshotSummary::default(),
        };

        save_snapshot(dir.path(), &settings, &snap).unwrap();
        assert!(state_dir(dir.path(), &settings).join(SNAPSHOT_FILE).exists());

        let loaded = load_snapshot(dir.path(), &settings).unwrap();
        assert_eq!(loaded.generated_at, snap.generated_at);
        assert_eq!(loaded.file_count, 0);
    }

    #[test]
    fn test_load_missing_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_diff(dir.path(), &Settings::default()).is_err());
    }
}
