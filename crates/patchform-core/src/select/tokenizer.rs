//! Goal tokenization: lowercase, path-friendly token extraction with a
//! stop-word filter and order-preserving dedup.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Minimum token length kept after filtering.
const MIN_TOKEN_LEN: usize = 3;

/// Articles, filler, and generic change verbs that carry no selection signal.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "to", "of", "and", "or", "for", "in", "on", "with", "by", "as", "is", "are",
    "was", "were", "be", "been", "it", "this", "that", "these", "those", "from", "at", "into",
    "over", "under", "then", "than", "but", "if", "else", "add", "make", "update", "fix",
    "improve", "refactor", "change", "create", "build", "please", "need", "want", "like",
];

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9_./-]+").unwrap());
static STOP_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Extract useful tokens from a goal: words, snake_case identifiers, paths
/// (`foo/bar.py`), kebab-case. Deduplicated preserving first-seen order.
pub fn tokenize_goal(goal: &str) -> Vec<String> {
    let lowered = goal.to_lowercase();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for m in TOKEN_RE.find_iter(&lowered) {
        let tok = m.as_str();
        if tok.len() < MIN_TOKEN_LEN || STOP_SET.contains(tok) {
            continue;
        }
        if seen.insert(tok) {
            out.push(tok.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_stop_words_and_short_tokens() {
        let toks = tokenize_goal("fix the login bug in auth.py");
        assert_eq!(toks, vec!["login", "bug", "auth.py"]);
    }

    #[test]
    fn test_keeps_paths_and_identifiers() {
        let toks = tokenize_goal("Update src/api/routes.py to use snake_case_name and kebab-case");
        assert!(toks.contains(&"src/api/routes.py".to_string()));
        assert!(toks.contains(&"snake_case_name".to_string()));
        assert!(toks.contains(&"kebab-case".to_string()));
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let toks = tokenize_goal("cache the cache layer cache");
        assert_eq!(toks, vec!["cache", "layer"]);
    }

    #[test]
    fn test_empty_goal_yields_no_tokens() {
        assert!(tokenize_goal("").is_empty());
        assert!(tokenize_goal("add a fix").is_empty());
    }
}
