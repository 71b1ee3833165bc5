//! The snapshotter: walks a directory tree and emits an immutable inventory
//! of text files with content identity, size/line metrics, and light
//! syntactic hints.

pub mod filesystem;
pub mod symbols;

use std::path::Path;
use std::time::UNIX_EPOCH;

use indexmap::IndexMap;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::config::{extension_of, Settings};
use crate::errors::PatchformResult;
use crate::models::{FileRecord, Snapshot, SnapshotSummary};

/// Entrypoints retained in the snapshot summary.
const MAX_SUMMARY_ENTRYPOINTS: usize = 20;

/// Wall-clock timestamp in `YYYY-MM-DD HH:MM:SS` form.
pub(crate) fn timestamp() -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::now_utc().format(&fmt).unwrap_or_default()
}

/// Scan the tree rooted at `root` into a [`Snapshot`].
///
/// Per-file errors (permission, transient I/O) are swallowed: the file is
/// omitted and the walk continues. Output is sorted by path for determinism.
pub fn scan(root: &Path, settings: &Settings) -> PatchformResult<Snapshot> {
    let root = root.canonicalize()?;
    let mut files: Vec<FileRecord> = Vec::new();

    for path in filesystem::iter_repo_files(&root, settings) {
        let rel = filesystem::relative_path(&root, &path);

        let ext = match extension_of(&rel) {
            Some(ext) if settings.text_ext.contains(&ext) => ext,
            _ => continue,
        };

        let meta = match path.metadata() {
            Ok(meta) => meta,
            Err(_) => continue,
        };
        if meta.len() > settings.max_file_bytes {
            debug!(path = %rel, size = meta.len(), "skipping oversized file");
            continue;
        }

        let text = match filesystem::read_text_lossy(&path) {
            Some(text) => text,
            None => continue,
        };

        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        let lang = symbols::lang_from_ext(&ext);
        let (peek_head, peek_tail) =
            filesystem::peek(&text, settings.peek_head_chars, settings.peek_tail_chars);
        let hints = if settings.enable_symbols {
            symbols::extract_symbols(&text, &lang, settings.max_symbols_per_file)
        } else {
            Vec::new()
        };

        files.push(FileRecord {
            path: rel.clone(),
            ext,
            size: meta.len(),
            mtime,
            lines: text.matches('\n').count() + 1,
            sha256: filesystem::hash_text(&text),
            lang,
            is_entrypoint: symbols::is_entrypoint(&rel),
            peek_head,
            peek_tail,
            symbols: hints,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    let entrypoints: Vec<String> = files
        .iter()
        .filter(|f| f.is_entrypoint)
        .map(|f| f.path.clone())
        .take(MAX_SUMMARY_ENTRYPOINTS)
        .collect();
    let mut languages: IndexMap<String, u64> = IndexMap::new();
    for f in &files {
        *languages.entry(f.lang.clone()).or_insert(0) += 1;
    }

    info!(
        root = %root.display(),
        file_count = files.len(),
        "scan complete"
    );

    Ok(Snapshot {
        repo_root: root.to_string_lossy().to_string(),
        generated_at: timestamp(),
        file_count: files.len(),
        files,
        summary: SnapshotSummary {
            entrypoints,
            languages,
        },
    })
}
