//! Neighbor expansion along local import edges.
//!
//! Lightweight regex patterns find import statements; specifiers are
//! resolved to candidate repo-relative paths by trying known suffixes and
//! index-file conventions. Only imports that land on a file actually present
//! in the snapshot are followed — package imports are ignored.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::Settings;
use crate::models::Snapshot;
use crate::snapshot::filesystem::read_text_lossy;

/// Neighbor files larger than this are never pulled in by expansion.
const MAX_NEIGHBOR_LINES: usize = 2500;

static PY_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*from\s+([a-zA-Z0-9_\.]+)\s+import\s+").unwrap());
static PY_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*import\s+([a-zA-Z0-9_\.]+)").unwrap());
static JS_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*import\s+.*?\s+from\s+['"]([^'"]+)['"]"#).unwrap());
static JS_REQUIRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

/// Collapse `.` and `..` segments of a forward-slash path.
fn normalize_posix_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            _ => stack.push(part),
        }
    }
    stack.join("/")
}

/// Map a dotted Python module name to candidate repo paths:
/// `foo.bar` → `foo/bar.py`, `foo/bar/__init__.py`.
pub fn resolve_python_module(module: &str, all_files: &HashSet<&str>) -> Vec<String> {
    let module = module.trim().trim_start_matches('.');
    if module.is_empty() {
        return Vec::new();
    }
    let base = module.replace('.', "/");
    [format!("{base}.py"), format!("{base}/__init__.py")]
        .into_iter()
        .filter(|c| all_files.contains(c.as_str()))
        .collect()
}

/// Resolve a relative JS/TS import like `./utils` from `src/app.ts`, trying
/// extensions and index-file conventions. Non-relative specifiers are
/// package imports and yield nothing.
pub fn resolve_script_import(spec: &str, from_path: &str, all_files: &HashSet<&str>) -> Vec<String> {
    let spec = spec.trim();
    if !spec.starts_with('.') {
        return Vec::new();
    }
    let base_dir = Path::new(from_path)
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    let raw = normalize_posix_path(&format!("{base_dir}/{spec}"));

    let mut candidates = Vec::new();
    for ext in [".ts", ".tsx", ".js", ".jsx", ".json"] {
        candidates.push(format!("{raw}{ext}"));
    }
    for index in ["index.ts", "index.tsx", "index.js", "index.jsx"] {
        candidates.push(format!("{raw}/{index}"));
    }
    candidates
        .into_iter()
        .filter(|c| all_files.contains(c.as_str()))
        .collect()
}

/// Import specifiers found in one file, language chosen by extension.
fn import_specs(text: &str, ext: &str) -> Vec<String> {
    let mut specs = Vec::new();
    match ext {
        ".py" => {
            for caps in PY_FROM.captures_iter(text) {
                specs.push(caps[1].to_string());
            }
            for caps in PY_IMPORT.captures_iter(text) {
                specs.push(caps[1].to_string());
            }
        }
        ".js" | ".jsx" | ".ts" | ".tsx" => {
            for caps in JS_IMPORT.captures_iter(text) {
                specs.push(caps[1].to_string());
            }
            for caps in JS_REQUIRE.captures_iter(text) {
                specs.push(caps[1].to_string());
            }
        }
        _ => {}
    }
    specs
}

/// Expand a selection along local import edges: referenced helpers become
/// visible alongside the files that use them. Capped at `max_new` additions;
/// never revisits files already selected.
pub fn expand_neighbors(
    repo_root: &Path,
    chosen: &[String],
    snapshot: &Snapshot,
    settings: &Settings,
    max_new: usize,
) -> Vec<String> {
    let index = snapshot.index();
    let all_files: HashSet<&str> = index.keys().copied().collect();
    let mut seen: HashSet<String> = chosen.iter().cloned().collect();
    let mut added: Vec<String> = Vec::new();

    let mut maybe_add = |candidate: String, added: &mut Vec<String>, seen: &mut HashSet<String>| {
        if seen.contains(&candidate) || !settings.is_text_allowed(&candidate) {
            return;
        }
        if let Some(rec) = index.get(candidate.as_str()) {
            if rec.lines > MAX_NEIGHBOR_LINES {
                return;
            }
        }
        seen.insert(candidate.clone());
        added.push(candidate);
    };

    for rel in chosen {
        if added.len() >= max_new {
            break;
        }
        let ext = crate::config::extension_of(rel).unwrap_or_default();
        let Some(text) = read_text_lossy(&repo_root.join(rel)) else {
            continue;
        };
        for spec in import_specs(&text, &ext) {
            let resolved = if ext == ".py" {
                resolve_python_module(&spec, &all_files)
            } else {
                resolve_script_import(&spec, rel, &all_files)
            };
            for candidate in resolved {
                maybe_add(candidate, &mut added, &mut seen);
                if added.len() >= max_new {
                    break;
                }
            }
            if added.len() >= max_new {
                break;
            }
        }
    }

    if !added.is_empty() {
        debug!(count = added.len(), "import expansion added neighbor files");
    }
    let mut out = chosen.to_vec();
    out.extend(added);
    out
}
