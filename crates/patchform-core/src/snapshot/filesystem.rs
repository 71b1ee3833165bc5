//! Filesystem helpers for the scan pass: tree walking with directory
//! pruning, binary sniffing, lossy text decoding, and content hashing.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::config::Settings;

/// Bytes inspected for a NUL when deciding whether a file is binary.
const BINARY_SNIFF_BYTES: usize = 2048;

pub fn is_probably_binary(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(BINARY_SNIFF_BYTES)];
    head.contains(&0)
}

/// Read a file as text, decoding with lossy substitution so decoding never
/// fails. Returns `None` for binary files and for any read error: a single
/// unreadable file must never abort the walk.
pub fn read_text_lossy(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    if is_probably_binary(&bytes) {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// SHA-256 hex digest over decoded text, so the hash is stable across
/// platforms regardless of raw byte encoding.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Walk the tree under `root`, pruning ignored directory names at every
/// level. Pruned subtrees are never descended into. Yields regular files
/// only; traversal errors are swallowed.
pub fn iter_repo_files(root: &Path, settings: &Settings) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !settings.ignore_dirs.contains(name.as_ref())
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Repo-relative, forward-slash normalized path.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Head/tail previews for a file, bounded by character counts. Small files
/// fit entirely in the head; the tail stays empty.
pub fn peek(text: &str, head_chars: usize, tail_chars: usize) -> (String, String) {
    let total = text.chars().count();
    if total <= head_chars + tail_chars {
        return (text.to_string(), String::new());
    }
    let head: String = text.chars().take(head_chars).collect();
    let tail_start = total - tail_chars;
    let tail: String = text.chars().skip(tail_start).collect();
    (head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_sniff() {
        assert!(is_probably_binary(b"abc\x00def"));
        assert!(!is_probably_binary(b"plain text\n"));
        // NUL beyond the sniff window is not detected; that is acceptable.
        let mut long = vec![b'a'; BINARY_SNIFF_BYTES];
        long.push(0);
        assert!(!is_probably_binary(&long));
    }

    #[test]
    fn test_hash_text_stable() {
        assert_eq!(hash_text("hello"), hash_text("hello"));
        assert_ne!(hash_text("hello"), hash_text("hello\n"));
    }

    #[test]
    fn test_peek_small_file_is_all_head() {
        let (head, tail) = peek("short", 10, 10);
        assert_eq!(head, "short");
        assert_eq!(tail, "");
    }

    #[test]
    fn test_peek_large_file_splits() {
        let text = "a".repeat(30);
        let (head, tail) = peek(&text, 10, 5);
        assert_eq!(head.len(), 10);
        assert_eq!(tail.len(), 5);
    }

    #[test]
    fn test_peek_is_char_safe() {
        let text = "é".repeat(40);
        let (head, tail) = peek(&text, 10, 5);
        assert_eq!(head.chars().count(), 10);
        assert_eq!(tail.chars().count(), 5);
    }

    #[test]
    fn test_iter_repo_files_prunes_ignored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules/dep.js"), "x").unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/app.py"), "print()").unwrap();

        let settings = Settings::default();
        let files = iter_repo_files(dir.path(), &settings);
        let rels: Vec<String> = files
            .iter()
            .map(|p| relative_path(dir.path(), p))
            .collect();
        assert_eq!(rels, vec!["src/app.py"]);
    }
}
