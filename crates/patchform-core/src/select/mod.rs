//! The selector: ranks and bounds the set of files worth showing to an
//! external planner for a goal, then assembles a budgeted context bundle.

pub mod imports;
pub mod scoring;
pub mod tokenizer;

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use crate::config::Settings;
use crate::errors::PatchformResult;
use crate::models::{ContextBundle, DiffResult, ScoreEntry, Snapshot};
use crate::snapshot::filesystem::read_text_lossy;

/// Entrypoint picks retained per selection.
const MAX_ENTRYPOINT_PICKS: usize = 6;

/// Run/config files retained per selection.
const MAX_RUNFILE_PICKS: usize = 6;

/// Candidates rescored with bucket bonuses before the final merge.
const RESCORE_POOL: usize = 120;

/// Repository paths listed in the bundle.
const MAX_LISTED_PATHS: usize = 300;

/// Changed paths echoed in the bundle's diff summary.
const MAX_DIFF_PATHS_SHOWN: usize = 20;

// ---------------------------------------------------------------------------
// Detection helpers
// ---------------------------------------------------------------------------

/// Likely "run path" files: direct common names at the root first, then any
/// `app.py` under a conventional source directory. Deduped, bounded.
pub fn detect_entrypoints(all_files: &[String]) -> Vec<String> {
    let mut picks: Vec<&String> = Vec::new();

    for name in ["web_app.py", "app.py", "main.py", "server.py"] {
        if let Some(p) = all_files.iter().find(|p| p.to_lowercase() == name) {
            picks.push(p);
        }
    }
    for p in all_files {
        // Pad with a leading slash so "src/app.py" matches "/src/".
        let low = format!("/{}", p.to_lowercase());
        if low.ends_with("app.py")
            && ["/app/", "/src/", "/server/", "/api/"]
                .iter()
                .any(|seg| low.contains(seg))
        {
            picks.push(p);
        }
    }

    let mut seen = HashSet::new();
    picks
        .into_iter()
        .filter(|p| seen.insert(p.as_str()))
        .take(MAX_ENTRYPOINT_PICKS)
        .cloned()
        .collect()
}

/// Run/config files present in the repository, in path order, bounded.
fn collect_runfiles(all_files: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for p in all_files {
        let low = p.to_lowercase();
        if scoring::RUNFILE_HINTS.iter().any(|h| low.contains(h)) && seen.insert(p.as_str()) {
            out.push(p.clone());
            if out.len() >= MAX_RUNFILE_PICKS {
                break;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Ranking and selection
// ---------------------------------------------------------------------------

/// Rank every file by path score plus size preference, descending. Ties
/// break lexically so the ranking is deterministic.
pub fn rank_files(snapshot: &Snapshot, goal_tokens: &[String]) -> Vec<ScoreEntry> {
    let mut entries: Vec<ScoreEntry> = snapshot
        .files
        .iter()
        .map(|rec| ScoreEntry {
            path: rec.path.clone(),
            score: scoring::score_path(&rec.path, goal_tokens) + scoring::prefer_small(rec),
        })
        .collect();
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });
    entries
}

/// Select the bounded file set for a goal.
///
/// Buckets merge in strict priority order: changed files from the diff,
/// detected entrypoints, run/config files, then score-ranked remainder.
/// Paths appearing in more than one bucket keep their first position.
/// An empty goal still selects via the changed/entrypoint/runfile buckets.
pub fn choose_files(
    snapshot: &Snapshot,
    diff: &DiffResult,
    goal: &str,
    settings: &Settings,
) -> Vec<String> {
    let goal_tokens = tokenizer::tokenize_goal(goal);
    let all_files: Vec<String> = snapshot
        .files
        .iter()
        .filter(|f| settings.is_text_allowed(&f.path))
        .map(|f| f.path.clone())
        .collect();
    let present: HashSet<&str> = all_files.iter().map(String::as_str).collect();

    // Bucket 1: changed files (modified then added) still present in the tree.
    let changed: Vec<String> = diff
        .modified
        .iter()
        .chain(diff.added.iter())
        .filter(|p| present.contains(p.as_str()))
        .cloned()
        .collect();
    let changed_set: HashSet<&str> = changed.iter().map(String::as_str).collect();

    // Buckets 2 and 3: entrypoints and run/config files.
    let entrypoints = detect_entrypoints(&all_files);
    let entry_set: HashSet<&str> = entrypoints.iter().map(String::as_str).collect();
    let runfiles = collect_runfiles(&all_files);
    let runfile_set: HashSet<&str> = runfiles.iter().map(String::as_str).collect();

    // Bucket 4: top candidates rescored with bucket bonuses.
    let ranked = rank_files(snapshot, &goal_tokens);
    let mut rescored: Vec<ScoreEntry> = ranked
        .into_iter()
        .take(RESCORE_POOL)
        .map(|mut entry| {
            if changed_set.contains(entry.path.as_str()) {
                entry.score += scoring::CHANGED_FILE_BONUS;
            }
            if entry_set.contains(entry.path.as_str()) {
                entry.score += scoring::ENTRYPOINT_FILE_BONUS;
            }
            if runfile_set.contains(entry.path.as_str()) {
                entry.score += scoring::RUNFILE_FILE_BONUS;
            }
            entry
        })
        .collect();
    rescored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut merged: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut add_many = |items: &[String], merged: &mut Vec<String>, seen: &mut HashSet<String>| {
        for p in items {
            if merged.len() >= settings.max_files_to_show {
                return;
            }
            if seen.insert(p.clone()) {
                merged.push(p.clone());
            }
        }
    };

    add_many(&changed, &mut merged, &mut seen);
    add_many(&entrypoints, &mut merged, &mut seen);
    add_many(&runfiles, &mut merged, &mut seen);
    let scored_paths: Vec<String> = rescored.into_iter().map(|e| e.path).collect();
    add_many(&scored_paths, &mut merged, &mut seen);

    merged.truncate(settings.max_files_to_show);
    debug!(selected = merged.len(), goal_tokens = goal_tokens.len(), "selection merged");
    merged
}

// ---------------------------------------------------------------------------
// Bundle assembly
// ---------------------------------------------------------------------------

/// One-screen project overview: file count, top directories, top extensions.
fn project_overview(snapshot: &Snapshot) -> String {
    let mut dir_counts: IndexMap<String, usize> = IndexMap::new();
    let mut ext_counts: IndexMap<String, usize> = IndexMap::new();
    for f in &snapshot.files {
        let dir = match f.path.split_once('/') {
            Some((d, _)) => d.to_string(),
            None => ".".to_string(),
        };
        *dir_counts.entry(dir).or_insert(0) += 1;
        *ext_counts.entry(f.ext.clone()).or_insert(0) += 1;
    }
    let mut dirs: Vec<(String, usize)> = dir_counts.into_iter().collect();
    dirs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    dirs.truncate(8);
    let mut exts: Vec<(String, usize)> = ext_counts.into_iter().collect();
    exts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    exts.truncate(8);

    let dir_line = dirs
        .iter()
        .map(|(d, n)| format!("{d}:{n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let ext_line = exts
        .iter()
        .map(|(e, n)| format!("{e}:{n}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Project files: {}\nTop dirs: {dir_line}\nTop extensions: {ext_line}",
        snapshot.file_count
    )
}

fn diff_summary_text(diff: &DiffResult) -> String {
    let mut lines = vec![format!(
        "added={} removed={} modified={}",
        diff.counts.added, diff.counts.removed, diff.counts.modified
    )];
    for (label, paths) in [
        ("added", &diff.added),
        ("removed", &diff.removed),
        ("modified", &diff.modified),
    ] {
        for p in paths.iter().take(MAX_DIFF_PATHS_SHOWN) {
            lines.push(format!("{label}: {p}"));
        }
    }
    for m in &diff.summary.top_changed_files {
        lines.push(format!("delta: {} (~{} lines)", m.path, m.line_delta_estimate));
    }
    lines.join("\n")
}

/// Full text for small files, head+tail with an explicit elision marker for
/// large ones. Never drops a file merely for being big.
fn read_snippet(repo_root: &Path, rel: &str, max_chars: usize) -> String {
    let Some(text) = read_text_lossy(&repo_root.join(rel)) else {
        return String::new();
    };
    if text.chars().count() <= max_chars {
        return text;
    }
    let half = max_chars / 2;
    let head: String = text.chars().take(half).collect();
    let total = text.chars().count();
    let tail: String = text.chars().skip(total - half).collect();
    format!("{head}\n\n... [snip] ...\n\n{tail}")
}

/// Assemble the planner-facing context bundle for a goal.
///
/// The chosen set is re-scored with real file contents (bounded by
/// [`scoring::MAX_CONTENT_SCAN_BYTES`]), expanded along local import edges,
/// then rendered into a deterministic text document capped by the total
/// character budget.
pub fn build_context(
    repo_root: &Path,
    snapshot: &Snapshot,
    diff: &DiffResult,
    goal: &str,
    settings: &Settings,
) -> PatchformResult<ContextBundle> {
    let goal_tokens = tokenizer::tokenize_goal(goal);
    let index = snapshot.index();

    let mut chosen = choose_files(snapshot, diff, goal, settings);

    // Content re-scoring of the chosen set, now that reading files is cheap
    // enough to be worth it.
    let added_set: HashSet<&str> = diff.added.iter().map(String::as_str).collect();
    let modified_set: HashSet<&str> = diff.modified.iter().map(String::as_str).collect();
    let mut rescored: Vec<ScoreEntry> = chosen
        .iter()
        .map(|rel| {
            let mut score = scoring::score_path(rel, &goal_tokens);
            if let Some(rec) = index.get(rel.as_str()) {
                score += scoring::prefer_small(rec);
                if rec.is_entrypoint {
                    score += scoring::ENTRYPOINT_FILE_BONUS;
                }
                if !goal_tokens.is_empty() && rec.size <= scoring::MAX_CONTENT_SCAN_BYTES {
                    if let Some(text) = read_text_lossy(&repo_root.join(rel)) {
                        score += scoring::score_content(&text, &goal_tokens);
                    }
                }
            }
            let low = rel.to_lowercase();
            if scoring::RUNFILE_HINTS.iter().any(|h| low.contains(h)) {
                score += scoring::RUNFILE_FILE_BONUS;
            }
            if modified_set.contains(rel.as_str()) {
                score += scoring::MODIFIED_FILE_BONUS;
            }
            if added_set.contains(rel.as_str()) {
                score += scoring::ADDED_FILE_BONUS;
            }
            ScoreEntry {
                path: rel.clone(),
                score,
            }
        })
        .collect();
    rescored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });
    chosen = rescored.into_iter().map(|e| e.path).collect();
    chosen.truncate(settings.max_files_to_show);

    chosen = imports::expand_neighbors(
        repo_root,
        &chosen,
        snapshot,
        settings,
        settings.max_neighbor_files,
    );

    let all_files: Vec<&str> = snapshot.files.iter().map(|f| f.path.as_str()).collect();
    let entrypoints = detect_entrypoints(
        &snapshot
            .files
            .iter()
            .map(|f| f.path.clone())
            .collect::<Vec<_>>(),
    );

    let mut parts: Vec<String> = Vec::new();
    parts.push("=== USER GOAL ===".to_string());
    parts.push(if goal.trim().is_empty() {
        "(empty)".to_string()
    } else {
        goal.trim().to_string()
    });
    parts.push(String::new());

    parts.push("=== PROJECT OVERVIEW ===".to_string());
    parts.push(project_overview(snapshot));
    parts.push(String::new());

    parts.push("=== LIKELY ENTRYPOINTS ===".to_string());
    parts.push(if entrypoints.is_empty() {
        "(not detected)".to_string()
    } else {
        entrypoints.join("\n")
    });
    parts.push(String::new());

    parts.push(format!("=== REPO FILE LIST (first {MAX_LISTED_PATHS}) ==="));
    parts.push(
        all_files
            .iter()
            .take(MAX_LISTED_PATHS)
            .copied()
            .collect::<Vec<_>>()
            .join("\n"),
    );
    parts.push(String::new());

    parts.push("=== DIFF SUMMARY (since last scan) ===".to_string());
    parts.push(diff_summary_text(diff));
    parts.push(String::new());

    parts.push("=== HARD RULES ===".to_string());
    parts.push("- Only reference/modify files that exist in the repo file list.".to_string());
    parts.push(
        "- Use minimal edits: replace_range / replace_text / insert_after / insert_before."
            .to_string(),
    );
    parts.push("- If the goal is unclear or unsafe, output {\"files\": []}.".to_string());
    parts.push("- Do NOT invent filenames, folders, dependencies, or commands.".to_string());
    parts.push(String::new());

    parts.push("=== SELECTED FILES ===".to_string());
    parts.push(chosen.join("\n"));
    parts.push(String::new());

    parts.push("=== FILE SNIPPETS (peek) ===".to_string());
    let mut total = 0usize;
    for rel in &chosen {
        let (lines, size) = index
            .get(rel.as_str())
            .map(|rec| (rec.lines, rec.size))
            .unwrap_or((0, 0));
        let header = format!("\n--- FILE: {rel} (lines={lines}, size={size}) ---\n");
        let snippet = read_snippet(repo_root, rel, settings.max_chars_per_file);
        let chunk = format!("{header}{snippet}\n");
        if total + chunk.len() > settings.max_total_context_chars {
            parts.push("\n[CONTEXT BUDGET HIT: remaining files omitted]\n".to_string());
            break;
        }
        total += chunk.len();
        parts.push(chunk);
    }

    Ok(ContextBundle {
        goal: goal.to_string(),
        files: chosen,
        text: parts.join("\n"),
    })
}
