//! The patch engine: validates an externally supplied edit plan against a
//! repo root and applies it file by file.
//!
//! Failure isolation is per file: a bad path, unknown op, or I/O error marks
//! that file `failed`/`skipped` and the run continues. Dry runs compute the
//! same outcomes and diffs as real runs without touching the tree.

pub mod ops;

use std::fs;
use std::path::{Component, Path, PathBuf};

use diffy::{create_patch, Line};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::config::Settings;
use crate::errors::{PatchformError, PatchformResult};
use crate::models::{ApplyLog, ApplyOutcome, ApplyStatus, EditPlan};
use crate::snapshot::filesystem::read_text_lossy;
use crate::store;

// ---------------------------------------------------------------------------
// Preconditions and helpers
// ---------------------------------------------------------------------------

/// A plan path must stay inside the repo root: non-empty, relative, and free
/// of parent-directory traversal. Backslashes are treated as separators.
pub fn is_safe_rel_path(rel: &str) -> bool {
    if rel.trim().is_empty() {
        return false;
    }
    let normalized = rel.replace('\\', "/");
    let path = Path::new(&normalized);
    if path.is_absolute() {
        return false;
    }
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Whether the git working tree at `root` is clean. Fails open: a missing
/// repo or an unreadable status means "clean", so the check only ever blocks
/// when it has positive evidence of outstanding changes.
pub fn git_is_clean(root: &Path) -> bool {
    let repo = match git2::Repository::open(root) {
        Ok(repo) => repo,
        Err(_) => return true,
    };
    let mut opts = git2::StatusOptions::new();
    opts.include_untracked(true).include_ignored(false);
    repo.statuses(Some(&mut opts))
        .map(|statuses| statuses.is_empty())
        .unwrap_or(true)
}

/// Run identifier in `YYYYMMDD_HHMMSS` form, used to name backup dirs.
fn run_id() -> String {
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    OffsetDateTime::now_utc().format(&fmt).unwrap_or_default()
}

/// Unified diff between two text versions, with `a/`-`b/` file headers.
fn unified_diff(rel: &str, original: &str, updated: &str) -> String {
    let patch = create_patch(original, updated);
    let rendered = patch.to_string();
    // create_patch emits placeholder "original"/"modified" headers; swap in
    // the repo-relative path.
    let body = rendered.splitn(3, '\n').nth(2).unwrap_or("");
    format!("--- a/{rel}\n+++ b/{rel}\n{body}")
}

/// Number of inserted plus deleted lines between two versions.
fn changed_line_count(original: &str, updated: &str) -> usize {
    create_patch(original, updated)
        .hunks()
        .iter()
        .flat_map(|h| h.lines())
        .filter(|l| matches!(l, Line::Insert(_) | Line::Delete(_)))
        .count()
}

/// Copy the original file into the run's backup dir, mirroring its relative
/// path. A raw byte copy: the backup must survive bytes the lossy decode
/// replaces, since the rewritten file is built from the decoded text.
fn backup_file(backup_root: &Path, rel: &str, target: &Path) -> PatchformResult<()> {
    let dest = backup_root.join(rel);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(target, &dest)?;
    Ok(())
}

/// Write via a temp sibling and rename, so a crash never leaves a
/// half-written file at the target path.
fn atomic_write(target: &Path, contents: &str) -> PatchformResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "patchform".to_string());
    let tmp = target.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, target)?;
    Ok(())
}

fn skipped(rel: &str, reason: &str) -> ApplyOutcome {
    ApplyOutcome {
        file: rel.to_string(),
        status: ApplyStatus::Skipped,
        reason: Some(reason.to_string()),
        ops: None,
        changed_lines: None,
        diff_unified: None,
    }
}

fn failed(rel: &str, reason: String) -> ApplyOutcome {
    ApplyOutcome {
        file: rel.to_string(),
        status: ApplyStatus::Failed,
        reason: Some(reason),
        ops: None,
        changed_lines: None,
        diff_unified: None,
    }
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// Apply an edit plan against the tree rooted at `root`.
///
/// Returns the per-file outcome log. Only two conditions abort the run as a
/// whole: an unreadable root, and a dirty working tree when
/// `require_clean_git` is set. Everything else degrades to a per-file
/// `skipped` or `failed` outcome.
pub fn apply_plan(
    root: &Path,
    plan: &EditPlan,
    dry_run: bool,
    settings: &Settings,
) -> PatchformResult<ApplyLog> {
    let root = root.canonicalize()?;

    if settings.require_clean_git && !git_is_clean(&root) {
        return Err(PatchformError::DirtyWorkTree);
    }

    let run_id = run_id();
    let backup_root: PathBuf = root.join(&settings.backup_dir).join(&run_id);
    let mut results: Vec<ApplyOutcome> = Vec::new();

    for edit in &plan.files {
        let rel = edit.path.trim().replace('\\', "/");
        if rel.is_empty() {
            results.push(skipped(&edit.path, "missing path"));
            continue;
        }
        if !is_safe_rel_path(&rel) {
            results.push(skipped(&rel, "unsafe path"));
            continue;
        }
        if !settings.is_text_allowed(&rel) {
            results.push(skipped(&rel, "file type not allowed"));
            continue;
        }

        let target = root.join(&rel);
        let exists = target.exists();
        if exists && !target.is_file() {
            results.push(skipped(&rel, "not a file"));
            continue;
        }
        if !exists && !settings.allow_create_files {
            results.push(skipped(&rel, "not found"));
            continue;
        }

        let original = if exists {
            match read_text_lossy(&target) {
                Some(text) => text,
                None => {
                    results.push(skipped(&rel, "unreadable or binary file"));
                    continue;
                }
            }
        } else {
            String::new()
        };

        let updated = match ops::apply_ops(&original, &edit.ops) {
            Ok(updated) => updated,
            Err(err) => {
                results.push(failed(&rel, err.to_string()));
                continue;
            }
        };

        if updated == original {
            results.push(ApplyOutcome {
                file: rel.clone(),
                status: ApplyStatus::Noop,
                reason: None,
                ops: Some(edit.ops.len()),
                changed_lines: Some(0),
                diff_unified: None,
            });
            continue;
        }

        let diff = unified_diff(&rel, &original, &updated);
        let changed = changed_line_count(&original, &updated);

        if dry_run {
            results.push(ApplyOutcome {
                file: rel.clone(),
                status: ApplyStatus::WouldUpdate,
                reason: None,
                ops: Some(edit.ops.len()),
                changed_lines: Some(changed),
                diff_unified: Some(diff),
            });
            continue;
        }

        let write_result = (|| -> PatchformResult<()> {
            if exists {
                backup_file(&backup_root, &rel, &target)?;
            }
            atomic_write(&target, &updated)
        })();
        match write_result {
            Ok(()) => results.push(ApplyOutcome {
                file: rel.clone(),
                status: ApplyStatus::Updated,
                reason: None,
                ops: Some(edit.ops.len()),
                changed_lines: Some(changed),
                diff_unified: Some(diff),
            }),
            Err(err) => results.push(failed(&rel, err.to_string())),
        }
    }

    let log = ApplyLog {
        run_id,
        dry_run,
        backup_dir: backup_root.to_string_lossy().to_string(),
        results,
    };

    // Persisted for dry runs too; the log records what the run decided, and
    // the state dir is outside the scanned tree. A log that cannot be
    // written is worth a warning, not a failed run.
    if let Err(err) = store::save_apply_log(&root, settings, &log) {
        warn!(error = %err, "could not persist apply log");
    }

    info!(
        run_id = %log.run_id,
        dry_run,
        files = log.results.len(),
        "apply finished"
    );
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EditOp, FileEdit, PlannedOp};

    fn plan_for(path: &str, ops: Vec<PlannedOp>) -> EditPlan {
        EditPlan {
            files: vec![FileEdit {
                path: path.to_string(),
                ops,
            }],
            extra: Default::default(),
        }
    }

    fn replace_op(find: &str, replace: &str) -> PlannedOp {
        PlannedOp::Known(EditOp::ReplaceText {
            find: find.to_string(),
            replace: replace.to_string(),
            count: None,
        })
    }

    #[test]
    fn test_dry_run_never_mutates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();

        let plan = plan_for("a.py", vec![replace_op("1", "2")]);
        let log = apply_plan(dir.path(), &plan, true, &Settings::default()).unwrap();

        assert_eq!(log.results[0].status, ApplyStatus::WouldUpdate);
        let diff = log.results[0].diff_unified.as_deref().unwrap();
        assert!(diff.contains("--- a/a.py"));
        assert!(diff.contains("-x = 1"));
        assert!(diff.contains("+x = 2"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.py")).unwrap(),
            "x = 1\n"
        );
    }

    #[test]
    fn test_apply_updates_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();

        let settings = Settings::default();
        let plan = plan_for("a.py", vec![replace_op("1", "2")]);
        let log = apply_plan(dir.path(), &plan, false, &settings).unwrap();

        assert_eq!(log.results[0].status, ApplyStatus::Updated);
        assert_eq!(log.results[0].changed_lines, Some(2));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.py")).unwrap(),
            "x = 2\n"
        );
        // Backup preserves the pre-edit content under the run dir.
        let backup = Path::new(&log.backup_dir).join("a.py");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "x = 1\n");
        // The apply log was persisted.
        let saved = store::load_apply_log(dir.path(), &settings).unwrap();
        assert_eq!(saved.run_id, log.run_id);
    }

    #[test]
    fn test_backup_is_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        // Valid-looking text with an invalid UTF-8 byte; the lossy decode
        // replaces 0xE9, but the backup must keep the original bytes.
        let raw: &[u8] = b"caf\xE9 = 1\n";
        std::fs::write(dir.path().join("a.py"), raw).unwrap();

        let plan = plan_for("a.py", vec![replace_op("1", "2")]);
        let log = apply_plan(dir.path(), &plan, false, &Settings::default()).unwrap();
        assert_eq!(log.results[0].status, ApplyStatus::Updated);

        let backup = std::fs::read(Path::new(&log.backup_dir).join("a.py")).unwrap();
        assert_eq!(backup, raw);
    }

    #[test]
    fn test_dry_run_persists_log() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();

        let settings = Settings::default();
        let plan = plan_for("a.py", vec![replace_op("1", "2")]);
        let log = apply_plan(dir.path(), &plan, true, &settings).unwrap();

        let saved = store::load_apply_log(dir.path(), &settings).unwrap();
        assert!(saved.dry_run);
        assert_eq!(saved.run_id, log.run_id);
        assert_eq!(saved.results.len(), 1);
    }

    #[test]
    fn test_dry_run_diff_matches_real_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "one\ntwo\nthree\n").unwrap();

        let plan = plan_for("a.py", vec![replace_op("two", "2")]);
        let dry = apply_plan(dir.path(), &plan, true, &Settings::default()).unwrap();

        std::fs::write(dir.path().join("a.py"), "one\ntwo\nthree\n").unwrap();
        let real = apply_plan(dir.path(), &plan, false, &Settings::default()).unwrap();

        assert_eq!(dry.results[0].diff_unified, real.results[0].diff_unified);
        assert_eq!(dry.results[0].changed_lines, real.results[0].changed_lines);
    }

    #[test]
    fn test_noop_leaves_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();

        let plan = plan_for("a.py", vec![replace_op("absent", "y")]);
        let log = apply_plan(dir.path(), &plan, false, &Settings::default()).unwrap();

        assert_eq!(log.results[0].status, ApplyStatus::Noop);
        assert!(!Path::new(&log.backup_dir).exists());
    }

    #[test]
    fn test_traversal_and_absolute_paths_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "x\n").unwrap();

        let plan = EditPlan {
            files: vec![
                FileEdit {
                    path: "../escape.py".to_string(),
                    ops: vec![replace_op("x", "y")],
                },
                FileEdit {
                    path: "/etc/passwd.py".to_string(),
                    ops: vec![replace_op("x", "y")],
                },
                FileEdit {
                    path: "  ".to_string(),
                    ops: vec![],
                },
            ],
            extra: Default::default(),
        };
        let log = apply_plan(dir.path(), &plan, false, &Settings::default()).unwrap();
        for outcome in &log.results {
            assert_eq!(outcome.status, ApplyStatus::Skipped);
        }
        assert_eq!(log.results[0].reason.as_deref(), Some("unsafe path"));
        assert_eq!(log.results[2].reason.as_deref(), Some("missing path"));
    }

    #[test]
    fn test_missing_file_skipped_unless_create_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan_for(
            "fresh.py",
            vec![PlannedOp::Known(EditOp::Append {
                text: "print('new')\n".to_string(),
            })],
        );

        let log = apply_plan(dir.path(), &plan, false, &Settings::default()).unwrap();
        assert_eq!(log.results[0].status, ApplyStatus::Skipped);
        assert_eq!(log.results[0].reason.as_deref(), Some("not found"));

        let settings = Settings {
            allow_create_files: true,
            ..Settings::default()
        };
        let log = apply_plan(dir.path(), &plan, false, &settings).unwrap();
        assert_eq!(log.results[0].status, ApplyStatus::Updated);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("fresh.py")).unwrap(),
            "print('new')\n"
        );
    }

    #[test]
    fn test_unknown_op_fails_only_its_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("b.py"), "y = 1\n").unwrap();

        let plan = EditPlan {
            files: vec![
                FileEdit {
                    path: "a.py".to_string(),
                    ops: vec![PlannedOp::Unknown(serde_json::json!({"type": "rewrite_all"}))],
                },
                FileEdit {
                    path: "b.py".to_string(),
                    ops: vec![replace_op("1", "2")],
                },
            ],
            extra: Default::default(),
        };
        let log = apply_plan(dir.path(), &plan, false, &Settings::default()).unwrap();
        assert_eq!(log.results[0].status, ApplyStatus::Failed);
        assert!(log.results[0].reason.as_deref().unwrap().contains("rewrite_all"));
        assert_eq!(log.results[1].status, ApplyStatus::Updated);
        // The failed file was left untouched.
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.py")).unwrap(),
            "x = 1\n"
        );
    }

    #[test]
    fn test_disallowed_extension_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tool.sh"), "echo hi\n").unwrap();

        let plan = plan_for("tool.sh", vec![replace_op("hi", "bye")]);
        let log = apply_plan(dir.path(), &plan, false, &Settings::default()).unwrap();
        assert_eq!(log.results[0].status, ApplyStatus::Skipped);
        assert_eq!(
            log.results[0].reason.as_deref(),
            Some("file type not allowed")
        );
    }
}
