//! Relevance scoring for paths, file metadata, and file contents.
//!
//! The weights are empirically chosen and carried over as named constants;
//! they are knobs, not derived quantities.

use crate::models::FileRecord;

// ---------------------------------------------------------------------------
// Weight constants
// ---------------------------------------------------------------------------

/// First entrypoint-filename match on a path. Non-cumulative.
pub const ENTRYPOINT_PATH_BONUS: f64 = 14.0;
/// First run/config-file match on a path. Non-cumulative.
pub const RUNFILE_PATH_BONUS: f64 = 8.0;
/// Path under a conventional source directory.
pub const CORE_DIR_BONUS: f64 = 3.0;
/// Path under tests, migrations, or build output.
pub const NON_PROD_DIR_PENALTY: f64 = 4.0;
/// Per goal token appearing as a substring of the path.
pub const TOKEN_IN_PATH_BONUS: f64 = 6.5;
/// Root-level file (entrypoints commonly live there).
pub const ROOT_FILE_BONUS: f64 = 1.2;

/// Bonuses applied during bucketed selection.
pub const CHANGED_FILE_BONUS: f64 = 15.0;
pub const ENTRYPOINT_FILE_BONUS: f64 = 8.0;
pub const RUNFILE_FILE_BONUS: f64 = 6.0;

/// Bonuses applied during content re-scoring of an already-chosen set.
pub const MODIFIED_FILE_BONUS: f64 = 12.0;
pub const ADDED_FILE_BONUS: f64 = 10.0;

/// Word-boundary token hits: per-hit weight and per-token cap.
pub const WORD_HIT_WEIGHT: f64 = 1.4;
pub const WORD_HIT_CAP: usize = 10;
/// Raw substring fallback: per-hit weight and per-token cap.
pub const SUBSTRING_HIT_WEIGHT: f64 = 0.6;
pub const SUBSTRING_HIT_CAP: usize = 6;

/// Files above this byte size are never content-scanned.
pub const MAX_CONTENT_SCAN_BYTES: u64 = 140_000;

// Size-preference thresholds.
const SMALL_LINES: usize = 250;
const MEDIUM_LINES: usize = 600;
const HUGE_LINES: usize = 2000;
const SMALL_BYTES: u64 = 60_000;
const HUGE_BYTES: u64 = 500_000;

const SMALL_LINES_BONUS: f64 = 1.6;
const MEDIUM_LINES_BONUS: f64 = 0.8;
const HUGE_LINES_PENALTY: f64 = 2.2;
const SMALL_BYTES_BONUS: f64 = 1.1;
const HUGE_BYTES_PENALTY: f64 = 2.2;

// ---------------------------------------------------------------------------
// Pattern tables
// ---------------------------------------------------------------------------

/// Entrypoint / control-plane hints, matched as path substrings.
pub const ENTRYPOINT_HINTS: &[&str] = &[
    "main.py", "app.py", "server.py", "web_app.py", "api.py", "routes.py", "router.py", "wsgi.py",
    "asgi.py", "manage.py", "index.js", "index.ts", "app.js", "app.ts", "server.js", "server.ts",
    "pyproject.toml", "requirements.txt", "package.json", "readme.md", ".env", "dockerfile",
    "docker-compose", "compose",
];

/// Files that often matter for how a project runs.
pub const RUNFILE_HINTS: &[&str] = &[
    "requirements.txt",
    "pyproject.toml",
    "setup.py",
    "pipfile",
    "poetry.lock",
    "package.json",
    "pnpm-lock",
    "yarn.lock",
    "dockerfile",
    "docker-compose",
    "compose",
    ".env",
    "readme.md",
];

const CORE_DIRS: &[&str] = &["src", "app", "api", "server", "backend", "frontend", "web"];
const PENALTY_DIRS: &[&str] = &["tests", "test", "migrations", "dist", "build", ".next", "node_modules"];

/// Whether `path` (lowercased, slash-normalized) falls under a directory
/// named `dir` at any depth, including the root level.
fn in_dir(path: &str, dir: &str) -> bool {
    path.starts_with(&format!("{dir}/")) || path.contains(&format!("/{dir}/"))
}

// ---------------------------------------------------------------------------
// Scoring functions
// ---------------------------------------------------------------------------

/// Path-only relevance: entrypoint and run-file patterns, conventional
/// directory bonuses/penalties, goal-token substring hits, root-level bias.
pub fn score_path(rel_path: &str, goal_tokens: &[String]) -> f64 {
    let p = rel_path.to_lowercase();
    let mut s = 0.0;

    if ENTRYPOINT_HINTS.iter().any(|h| p.contains(h)) {
        s += ENTRYPOINT_PATH_BONUS;
    }
    if RUNFILE_HINTS.iter().any(|h| p.contains(h)) {
        s += RUNFILE_PATH_BONUS;
    }
    if CORE_DIRS.iter().any(|d| in_dir(&p, d)) {
        s += CORE_DIR_BONUS;
    }
    if PENALTY_DIRS.iter().any(|d| in_dir(&p, d)) {
        s -= NON_PROD_DIR_PENALTY;
    }
    for tok in goal_tokens {
        if p.contains(tok.as_str()) {
            s += TOKEN_IN_PATH_BONUS;
        }
    }
    if !p.contains('/') {
        s += ROOT_FILE_BONUS;
    }
    s
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

/// Count occurrences of `needle` in `haystack`, split into word-boundary
/// hits (neither neighbor is an identifier character) and raw substring
/// hits. Non-overlapping.
fn count_hits(haystack: &str, needle: &str) -> (usize, usize) {
    if needle.is_empty() {
        return (0, 0);
    }
    let mut bounded = 0;
    let mut raw = 0;
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(needle) {
        let start = from + pos;
        let end = start + needle.len();
        raw += 1;
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map(|c| !is_word_char(c))
            .unwrap_or(true);
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map(|c| !is_word_char(c))
            .unwrap_or(true);
        if before_ok && after_ok {
            bounded += 1;
        }
        from = end;
    }
    (bounded, raw)
}

/// Cheap content relevance: word-boundary matches weighted higher than raw
/// substring counts, both capped per token so no single token dominates.
pub fn score_content(text: &str, goal_tokens: &[String]) -> f64 {
    if text.is_empty() || goal_tokens.is_empty() {
        return 0.0;
    }
    let lowered = text.to_lowercase();
    let mut score = 0.0;
    for tok in goal_tokens {
        let (bounded, raw) = count_hits(&lowered, tok);
        if bounded > 0 {
            score += bounded.min(WORD_HIT_CAP) as f64 * WORD_HIT_WEIGHT;
        } else if raw > 0 {
            score += raw.min(SUBSTRING_HIT_CAP) as f64 * SUBSTRING_HIT_WEIGHT;
        }
    }
    score
}

/// Bias toward small, high-signal files over sprawling generated ones,
/// without excluding large files outright.
pub fn prefer_small(record: &FileRecord) -> f64 {
    let mut s = 0.0;
    if record.lines <= SMALL_LINES {
        s += SMALL_LINES_BONUS;
    } else if record.lines <= MEDIUM_LINES {
        s += MEDIUM_LINES_BONUS;
    } else if record.lines >= HUGE_LINES {
        s -= HUGE_LINES_PENALTY;
    }
    if record.size <= SMALL_BYTES {
        s += SMALL_BYTES_BONUS;
    } else if record.size >= HUGE_BYTES {
        s -= HUGE_BYTES_PENALTY;
    }
    s
}
