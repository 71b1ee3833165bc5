//! Explicit configuration threaded into every component entry point.
//!
//! Scans, selections, and applies are reproducible from their inputs alone:
//! nothing here is ambient state. Callers construct a [`Settings`] once
//! (typically from a JSON document) and pass it by reference.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Tuning knobs consumed by the snapshotter, selector, and patch engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory names pruned at every level of the scan walk.
    pub ignore_dirs: BTreeSet<String>,

    /// Extensions (lowercase, with leading dot) treated as editable text.
    pub text_ext: BTreeSet<String>,

    /// Files larger than this are skipped by the scan.
    pub max_file_bytes: u64,

    /// Maximum number of files surfaced per selection.
    pub max_files_to_show: usize,

    /// Per-file character budget for context previews.
    pub max_chars_per_file: usize,

    /// Total character budget for an assembled context bundle.
    pub max_total_context_chars: usize,

    /// Head preview length stored in a file record.
    pub peek_head_chars: usize,

    /// Tail preview length stored in a file record.
    pub peek_tail_chars: usize,

    /// Extract symbol hints during the scan.
    pub enable_symbols: bool,

    /// Symbol hints retained per file.
    pub max_symbols_per_file: usize,

    /// Maximum neighbor files pulled in by import expansion.
    pub max_neighbor_files: usize,

    /// Refuse to apply a plan while the working tree is dirty.
    pub require_clean_git: bool,

    /// Allow an edit plan to create files that do not exist yet.
    pub allow_create_files: bool,

    /// Directory (inside the repo root) holding persisted snapshots and logs.
    pub state_dir: String,

    /// Directory (inside the repo root) holding per-run backups.
    pub backup_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ignore_dirs: [
                ".git",
                "node_modules",
                ".next",
                "dist",
                "build",
                "__pycache__",
                ".venv",
                "venv",
                ".mypy_cache",
                ".pytest_cache",
                ".patchform_state",
                ".patchform_backups",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            text_ext: [
                ".py", ".js", ".jsx", ".ts", ".tsx", ".json", ".yml", ".yaml", ".md", ".txt",
                ".html", ".css", ".toml", ".ini",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_file_bytes: 2 * 1024 * 1024,
            max_files_to_show: 10,
            max_chars_per_file: 6000,
            max_total_context_chars: 26_000,
            peek_head_chars: 2200,
            peek_tail_chars: 1400,
            enable_symbols: true,
            max_symbols_per_file: 40,
            max_neighbor_files: 12,
            require_clean_git: false,
            allow_create_files: false,
            state_dir: ".patchform_state".to_string(),
            backup_dir: ".patchform_backups".to_string(),
        }
    }
}

impl Settings {
    /// Whether a repo-relative path has an allowed text extension.
    pub fn is_text_allowed(&self, rel_path: &str) -> bool {
        match extension_of(rel_path) {
            Some(ext) => self.text_ext.contains(&ext),
            None => false,
        }
    }
}

/// Lowercased extension of a path, with leading dot (`".py"`), if any.
pub fn extension_of(rel_path: &str) -> Option<String> {
    let name = rel_path.rsplit('/').next()?;
    let dot = name.rfind('.')?;
    if dot == 0 && !name[1..].contains('.') {
        // Dotfiles like ".env" have no extension in the allow-list sense.
        return None;
    }
    Some(name[dot..].to_lowercase())
}
