//! Snapshot comparison: pure classification of paths into added/removed/
//! modified, hash-equality rename inference, and change aggregates. No file
//! content is re-read; only snapshot metadata is consumed.

use std::collections::HashMap;

use crate::models::{
    ChangeMagnitude, DiffCounts, DiffResult, DiffSummary, DirCount, ExtCount, FileRecord,
    RenameHint, Snapshot,
};

/// Rename hints retained per diff.
const MAX_RENAME_HINTS: usize = 50;

/// Magnitude entries surfaced in the summary.
const MAX_CHANGED_FILES: usize = 15;

const MAX_TOP_DIRS: usize = 10;
const MAX_TOP_EXTS: usize = 10;

fn top_level_dir(path: &str) -> String {
    let p = path.replace('\\', "/");
    match p.split_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => ".".to_string(),
    }
}

fn ext_or_none(path: &str) -> String {
    crate::config::extension_of(path).unwrap_or_else(|| "(none)".to_string())
}

/// Frequency count over `paths` by `key`, sorted by count descending then
/// key ascending for determinism, truncated to `k`.
fn top_counts<F: Fn(&str) -> String>(paths: &[&str], key: F, k: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for p in paths {
        *counts.entry(key(p)).or_insert(0) += 1;
    }
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(k);
    entries
}

fn rename_hints(
    added: &[String],
    removed: &[String],
    before: &HashMap<&str, &FileRecord>,
    after: &HashMap<&str, &FileRecord>,
) -> Vec<RenameHint> {
    let mut removed_by_hash: HashMap<&str, Vec<&str>> = HashMap::new();
    for p in removed {
        if let Some(rec) = before.get(p.as_str()) {
            removed_by_hash
                .entry(rec.sha256.as_str())
                .or_default()
                .push(p.as_str());
        }
    }

    let mut hints = Vec::new();
    for p in added {
        let Some(rec) = after.get(p.as_str()) else {
            continue;
        };
        if let Some(olds) = removed_by_hash.get(rec.sha256.as_str()) {
            for old in olds {
                hints.push(RenameHint {
                    from: (*old).to_string(),
                    to: p.clone(),
                    sha256: rec.sha256.clone(),
                });
                if hints.len() >= MAX_RENAME_HINTS {
                    return hints;
                }
            }
        }
    }
    hints
}

/// Compare two snapshots of the same root.
///
/// Invariant: every path lands in at most one of added/removed/modified.
pub fn diff_snapshots(before: &Snapshot, after: &Snapshot) -> DiffResult {
    let b: HashMap<&str, &FileRecord> =
        before.files.iter().map(|f| (f.path.as_str(), f)).collect();
    let a: HashMap<&str, &FileRecord> = after.files.iter().map(|f| (f.path.as_str(), f)).collect();

    let mut added: Vec<String> = a
        .keys()
        .filter(|p| !b.contains_key(*p))
        .map(|p| (*p).to_string())
        .collect();
    let mut removed: Vec<String> = b
        .keys()
        .filter(|p| !a.contains_key(*p))
        .map(|p| (*p).to_string())
        .collect();
    let mut modified: Vec<String> = a
        .iter()
        .filter(|(p, rec)| {
            b.get(*p)
                .map(|prev| prev.sha256 != rec.sha256)
                .unwrap_or(false)
        })
        .map(|(p, _)| (*p).to_string())
        .collect();
    added.sort();
    removed.sort();
    modified.sort();

    let changed_all: Vec<&str> = added
        .iter()
        .chain(removed.iter())
        .chain(modified.iter())
        .map(String::as_str)
        .collect();

    let top_dirs = top_counts(&changed_all, top_level_dir, MAX_TOP_DIRS)
        .into_iter()
        .map(|(dir, count)| DirCount { dir, count })
        .collect();
    let top_exts = top_counts(&changed_all, ext_or_none, MAX_TOP_EXTS)
        .into_iter()
        .map(|(ext, count)| ExtCount { ext, count })
        .collect();

    let renames = rename_hints(&added, &removed, &b, &a);

    // Line-count delta as a cheap edit-size proxy; stable sort keeps the
    // lexical path order among equal deltas.
    let mut magnitudes: Vec<ChangeMagnitude> = modified
        .iter()
        .filter_map(|p| {
            let before_lines = b.get(p.as_str())?.lines;
            let after_lines = a.get(p.as_str())?.lines;
            Some(ChangeMagnitude {
                path: p.clone(),
                line_delta_estimate: before_lines.abs_diff(after_lines),
            })
        })
        .collect();
    magnitudes.sort_by(|x, y| y.line_delta_estimate.cmp(&x.line_delta_estimate));
    magnitudes.truncate(MAX_CHANGED_FILES);

    DiffResult {
        repo_root: after.repo_root.clone(),
        generated_at: after.generated_at.clone(),
        counts: DiffCounts {
            added: added.len(),
            removed: removed.len(),
            modified: modified.len(),
        },
        added,
        removed,
        modified,
        summary: DiffSummary {
            top_dirs,
            top_exts,
            renames,
            top_changed_files: magnitudes,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SnapshotSummary, SymbolHint};

    fn record(path: &str, sha256: &str, lines: usize) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            ext: crate::config::extension_of(path).unwrap_or_default(),
            size: 100,
            mtime: 0.0,
            lines,
            sha256: sha256.to_string(),
            lang: "python".to_string(),
            is_entrypoint: false,
            peek_head: String::new(),
            peek_tail: String::new(),
            symbols: Vec::<SymbolHint>::new(),
        }
    }

    fn snapshot(files: Vec<FileRecord>) -> Snapshot {
        Snapshot {
            repo_root: "/repo".to_string(),
            generated_at: "2026-01-01 00:00:00".to_string(),
            file_count: files.len(),
            files,
            summary: SnapshotSummary::default(),
        }
    }

    #[test]
    fn test_self_diff_is_empty() {
        let snap = snapshot(vec![record("a.py", "h1", 10), record("b.py", "h2", 20)]);
        let d = diff_snapshots(&snap, &snap);
        assert!(d.added.is_empty());
        assert!(d.removed.is_empty());
        assert!(d.modified.is_empty());
        assert_eq!(d.counts, DiffCounts::default());
    }

    #[test]
    fn test_classification_is_mutually_exclusive() {
        let before = snapshot(vec![
            record("keep.py", "h1", 10),
            record("gone.py", "h2", 5),
            record("edit.py", "h3", 30),
        ]);
        let after = snapshot(vec![
            record("keep.py", "h1", 10),
            record("new.py", "h4", 8),
            record("edit.py", "h5", 42),
        ]);
        let d = diff_snapshots(&before, &after);
        assert_eq!(d.added, vec!["new.py"]);
        assert_eq!(d.removed, vec!["gone.py"]);
        assert_eq!(d.modified, vec!["edit.py"]);

        let mut all: Vec<&String> = d
            .added
            .iter()
            .chain(d.removed.iter())
            .chain(d.modified.iter())
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_move_surfaces_rename_hint() {
        let before = snapshot(vec![record("old/name.py", "same-hash", 12)]);
        let after = snapshot(vec![record("new/name.py", "same-hash", 12)]);
        let d = diff_snapshots(&before, &after);
        assert_eq!(d.added, vec!["new/name.py"]);
        assert_eq!(d.removed, vec!["old/name.py"]);
        assert_eq!(
            d.summary.renames,
            vec![RenameHint {
                from: "old/name.py".to_string(),
                to: "new/name.py".to_string(),
                sha256: "same-hash".to_string(),
            }]
        );
    }

    #[test]
    fn test_magnitudes_sorted_descending() {
        let before = snapshot(vec![record("a.py", "h1", 10), record("b.py", "h2", 100)]);
        let after = snapshot(vec![record("a.py", "h1x", 12), record("b.py", "h2x", 40)]);
        let d = diff_snapshots(&before, &after);
        assert_eq!(d.summary.top_changed_files[0].path, "b.py");
        assert_eq!(d.summary.top_changed_files[0].line_delta_estimate, 60);
        assert_eq!(d.summary.top_changed_files[1].line_delta_estimate, 2);
    }

    #[test]
    fn test_aggregates_over_changed_union() {
        let before = snapshot(vec![record("src/a.py", "h1", 1)]);
        let after = snapshot(vec![
            record("src/b.py", "h2", 1),
            record("docs/c.md", "h3", 1),
        ]);
        let d = diff_snapshots(&before, &after);
        let dirs: Vec<&str> = d.summary.top_dirs.iter().map(|c| c.dir.as_str()).collect();
        assert!(dirs.contains(&"src"));
        assert!(dirs.contains(&"docs"));
        let exts: Vec<&str> = d.summary.top_exts.iter().map(|c| c.ext.as_str()).collect();
        assert!(exts.contains(&".py"));
        assert!(exts.contains(&".md"));
    }
}
