//! Shared typed models used across the snapshotter, differ, selector, and
//! patch engine. Everything here is a plain serde-serializable value: the
//! snapshot and diff documents, the externally supplied edit plan, and the
//! apply log returned to callers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A best-effort symbol hint extracted from a source file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolHint {
    /// One of "def", "class", "route", "export_fn".
    pub kind: String,
    pub name: String,
}

/// A record representing a single scanned text file.
///
/// Immutable once part of a [`Snapshot`]; a new scan produces a new snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRecord {
    /// Repo-relative, forward-slash normalized. Unique key within a snapshot.
    pub path: String,
    /// Lowercased extension with leading dot, e.g. ".py".
    pub ext: String,
    pub size: u64,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: f64,
    pub lines: usize,
    /// SHA-256 hex digest of the decoded text (not the raw bytes).
    pub sha256: String,
    /// Language derived from the extension, "text" when unknown.
    pub lang: String,
    pub is_entrypoint: bool,
    pub peek_head: String,
    pub peek_tail: String,
    #[serde(default)]
    pub symbols: Vec<SymbolHint>,
}

/// Aggregates computed over a snapshot's file set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub entrypoints: Vec<String>,
    pub languages: IndexMap<String, u64>,
}

/// Point-in-time inventory of a repository's text files.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub repo_root: String,
    pub generated_at: String,
    pub file_count: usize,
    /// Ordered by path.
    pub files: Vec<FileRecord>,
    pub summary: SnapshotSummary,
}

impl Snapshot {
    /// Path → record index for lookups. Paths are unique by construction.
    pub fn index(&self) -> IndexMap<&str, &FileRecord> {
        self.files.iter().map(|f| (f.path.as_str(), f)).collect()
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// A removed→added path pair sharing a content hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameHint {
    pub from: String,
    pub to: String,
    pub sha256: String,
}

/// Line-count delta for a modified path, a cheap proxy for edit size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMagnitude {
    pub path: String,
    pub line_delta_estimate: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirCount {
    pub dir: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtCount {
    pub ext: String,
    pub count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffCounts {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub top_dirs: Vec<DirCount>,
    pub top_exts: Vec<ExtCount>,
    pub renames: Vec<RenameHint>,
    pub top_changed_files: Vec<ChangeMagnitude>,
}

/// Classification of every path across two snapshots of the same root.
///
/// A path appears in at most one of `added`/`removed`/`modified`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiffResult {
    pub repo_root: String,
    pub generated_at: String,
    /// Lexically sorted.
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub counts: DiffCounts,
    pub summary: DiffSummary,
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// A ranked path. Ephemeral: recomputed per selection request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub path: String,
    pub score: f64,
}

/// The bounded text payload assembled to brief an external planner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextBundle {
    pub goal: String,
    /// Files selected for the bundle, in priority order.
    pub files: Vec<String>,
    /// The rendered bundle text (overview + previews).
    pub text: String,
}

// ---------------------------------------------------------------------------
// Edit plan
// ---------------------------------------------------------------------------

fn default_once() -> bool {
    true
}

/// A single text operation within an edit plan.
///
/// Operations are applied strictly in listed order, each rewriting the whole
/// text value produced by the previous one.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditOp {
    /// Splice out the inclusive 1-indexed line range (clamped to valid
    /// bounds) and substitute `new_text`.
    ReplaceRange {
        start_line: i64,
        end_line: i64,
        new_text: String,
    },
    /// `replace_range` with an empty substitution.
    DeleteRange { start_line: i64, end_line: i64 },
    /// Literal substring replacement, all occurrences or a bounded count.
    ReplaceText {
        find: String,
        replace: String,
        #[serde(default)]
        count: Option<usize>,
    },
    /// Insert `insert_text` immediately after the first line containing
    /// `match` (or after every matching line when `once` is false).
    InsertAfter {
        #[serde(rename = "match")]
        match_line: String,
        insert_text: String,
        #[serde(default = "default_once")]
        once: bool,
    },
    /// Insert `insert_text` immediately before the first line containing
    /// `match` (or before every matching line when `once` is false).
    InsertBefore {
        #[serde(rename = "match")]
        match_line: String,
        insert_text: String,
        #[serde(default = "default_once")]
        once: bool,
    },
    /// Append to end of file, inserting a newline separator when needed.
    Append {
        #[serde(default)]
        text: String,
    },
}

/// An operation as it arrives from the planner. Unrecognized or malformed
/// operations are preserved verbatim so the engine can fail the single file
/// that carries them instead of rejecting the whole plan.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlannedOp {
    Known(EditOp),
    Unknown(serde_json::Value),
}

/// Ordered operations for one file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileEdit {
    pub path: String,
    #[serde(default)]
    pub ops: Vec<PlannedOp>,
}

/// An externally supplied, structured list of per-file text operations.
///
/// Plan-level metadata (summary, notes, risk, run commands) is accepted and
/// ignored: it belongs to the planner, not the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EditPlan {
    #[serde(default)]
    pub files: Vec<FileEdit>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Apply log
// ---------------------------------------------------------------------------

/// Terminal state of one file within an apply run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Updated,
    WouldUpdate,
    Noop,
    Skipped,
    Failed,
}

/// Per-file outcome record. Written once; immutable afterward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub file: String,
    pub status: ApplyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ops: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_lines: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_unified: Option<String>,
}

/// The durable log of one apply invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApplyLog {
    pub run_id: String,
    pub dry_run: bool,
    pub backup_dir: String,
    pub results: Vec<ApplyOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_plan_tolerates_planner_metadata() {
        let plan: EditPlan = serde_json::from_str(
            r##"{
                "summary": "tighten validation",
                "risk": "low",
                "run_commands": ["pytest"],
                "files": [
                    {"path": "app.py", "ops": [
                        {"type": "append", "text": "# done\n"}
                    ]}
                ]
            }"##,
        )
        .unwrap();
        assert_eq!(plan.files.len(), 1);
        assert_eq!(plan.extra.len(), 3);
        assert!(matches!(
            plan.files[0].ops[0],
            PlannedOp::Known(EditOp::Append { .. })
        ));
    }

    #[test]
    fn test_unknown_op_type_preserved() {
        let plan: EditPlan = serde_json::from_str(
            r#"{"files": [{"path": "a.py", "ops": [{"type": "regex_replace", "pattern": "x"}]}]}"#,
        )
        .unwrap();
        assert!(matches!(plan.files[0].ops[0], PlannedOp::Unknown(_)));
    }

    #[test]
    fn test_insert_after_defaults_once() {
        let op: PlannedOp = serde_json::from_str(
            r#"{"type": "insert_after", "match": "import os", "insert_text": "import re\n"}"#,
        )
        .unwrap();
        match op {
            PlannedOp::Known(EditOp::InsertAfter { once, .. }) => assert!(once),
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_apply_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ApplyStatus::WouldUpdate).unwrap(),
            "\"would_update\""
        );
    }
}
