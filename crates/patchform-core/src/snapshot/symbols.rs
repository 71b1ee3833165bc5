//! Language detection, entrypoint heuristics, and regex-based symbol hints.
//!
//! Symbol extraction is deliberately pattern-based rather than a real parse:
//! a precision/cost tradeoff. Each language gets a best-effort extractor that
//! returns empty results on malformed input instead of failing.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::SymbolHint;

// ---------------------------------------------------------------------------
// Language detection
// ---------------------------------------------------------------------------

const LANGUAGE_BY_EXTENSION: &[(&str, &str)] = &[
    (".py", "python"),
    (".js", "javascript"),
    (".jsx", "javascript"),
    (".ts", "typescript"),
    (".tsx", "typescript"),
    (".json", "json"),
    (".yml", "yaml"),
    (".yaml", "yaml"),
    (".md", "markdown"),
    (".html", "html"),
    (".css", "css"),
    (".txt", "text"),
    (".toml", "toml"),
];

/// Language derived from a lowercased extension, "text" when unknown.
pub fn lang_from_ext(ext: &str) -> String {
    let ext = ext.to_lowercase();
    LANGUAGE_BY_EXTENSION
        .iter()
        .find(|(e, _)| *e == ext.as_str())
        .map(|(_, lang)| (*lang).to_string())
        .unwrap_or_else(|| "text".to_string())
}

// ---------------------------------------------------------------------------
// Entrypoint heuristics
// ---------------------------------------------------------------------------

/// Filenames that classically mark a runnable entrypoint.
const ENTRYPOINT_NAMES: &[&str] = &[
    "main.py", "app.py", "server.py", "web_app.py", "api.py", "index.js", "index.ts",
];

/// Substrings marking run/config files (manifests, container definitions).
const RUN_CONFIG_HINTS: &[&str] = &[
    "requirements.txt",
    "pyproject.toml",
    "package.json",
    "dockerfile",
    "docker-compose",
];

/// Whether a repo-relative path looks like a primary way to run or configure
/// the project.
pub fn is_entrypoint(rel_path: &str) -> bool {
    let low = rel_path.to_lowercase().replace('\\', "/");
    if ENTRYPOINT_NAMES.iter().any(|n| low.ends_with(n)) {
        return true;
    }
    RUN_CONFIG_HINTS.iter().any(|h| low.contains(h))
}

// ---------------------------------------------------------------------------
// Symbol extraction
// ---------------------------------------------------------------------------

static PY_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());
static PY_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*class\s+([A-Za-z_][A-Za-z0-9_]*)\s*(\(|:)").unwrap());
static PY_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*@app\.(get|post|put|delete|patch|websocket)\(\s*['"]([^'"]+)['"]"#)
        .unwrap()
});

static JS_EXPORT_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"export\s+(?:async\s+)?function\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap()
});
static JS_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+([A-Za-z_][A-Za-z0-9_]*)\s*(\{|extends)").unwrap());

/// A best-effort symbol extractor for one language family.
///
/// Implementations must never fail: malformed input yields fewer (or zero)
/// hints, not an error.
pub trait SymbolExtractor: Sync {
    fn extract(&self, text: &str, max_items: usize) -> Vec<SymbolHint>;
}

/// Python: route declarations, classes, then top-level defs.
struct PythonExtractor;

impl SymbolExtractor for PythonExtractor {
    fn extract(&self, text: &str, max_items: usize) -> Vec<SymbolHint> {
        let mut out = Vec::new();
        for caps in PY_ROUTE.captures_iter(text) {
            out.push(SymbolHint {
                kind: "route".to_string(),
                name: format!("{} {}", caps[1].to_uppercase(), &caps[2]),
            });
            if out.len() >= max_items {
                return out;
            }
        }
        for caps in PY_CLASS.captures_iter(text) {
            out.push(SymbolHint {
                kind: "class".to_string(),
                name: caps[1].to_string(),
            });
            if out.len() >= max_items {
                return out;
            }
        }
        for caps in PY_DEF.captures_iter(text) {
            out.push(SymbolHint {
                kind: "def".to_string(),
                name: caps[1].to_string(),
            });
            if out.len() >= max_items {
                return out;
            }
        }
        out
    }
}

/// JavaScript/TypeScript: exported functions and classes.
struct ScriptExtractor;

impl SymbolExtractor for ScriptExtractor {
    fn extract(&self, text: &str, max_items: usize) -> Vec<SymbolHint> {
        let mut out = Vec::new();
        for caps in JS_EXPORT_FN.captures_iter(text) {
            out.push(SymbolHint {
                kind: "export_fn".to_string(),
                name: caps[1].to_string(),
            });
            if out.len() >= max_items {
                return out;
            }
        }
        for caps in JS_CLASS.captures_iter(text) {
            out.push(SymbolHint {
                kind: "class".to_string(),
                name: caps[1].to_string(),
            });
            if out.len() >= max_items {
                return out;
            }
        }
        out
    }
}

static PYTHON_EXTRACTOR: PythonExtractor = PythonExtractor;
static SCRIPT_EXTRACTOR: ScriptExtractor = ScriptExtractor;

/// The extractor for a detected language, if one exists.
pub fn extractor_for(lang: &str) -> Option<&'static dyn SymbolExtractor> {
    match lang {
        "python" => Some(&PYTHON_EXTRACTOR),
        "javascript" | "typescript" => Some(&SCRIPT_EXTRACTOR),
        _ => None,
    }
}

/// Extract bounded symbol hints for a file, empty when the language has no
/// extractor or the text yields nothing.
pub fn extract_symbols(text: &str, lang: &str, max_items: usize) -> Vec<SymbolHint> {
    if text.is_empty() {
        return Vec::new();
    }
    match extractor_for(lang) {
        Some(extractor) => extractor.extract(text, max_items),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_from_ext() {
        assert_eq!(lang_from_ext(".py"), "python");
        assert_eq!(lang_from_ext(".TSX"), "typescript");
        assert_eq!(lang_from_ext(".rs"), "text");
    }

    #[test]
    fn test_is_entrypoint() {
        assert!(is_entrypoint("main.py"));
        assert!(is_entrypoint("src/app.py"));
        assert!(is_entrypoint("Dockerfile"));
        assert!(is_entrypoint("deploy/docker-compose.yml"));
        assert!(!is_entrypoint("src/utils.py"));
    }

    #[test]
    fn test_python_symbols() {
        let src = "\
@app.get(\"/health\")\n\
def health():\n    pass\n\
class Store:\n    pass\n\
def helper(x):\n    return x\n";
        let hints = extract_symbols(src, "python", 40);
        assert_eq!(
            hints[0],
            SymbolHint {
                kind: "route".to_string(),
                name: "GET /health".to_string()
            }
        );
        assert!(hints.iter().any(|h| h.kind == "class" && h.name == "Store"));
        assert!(hints.iter().any(|h| h.kind == "def" && h.name == "helper"));
    }

    #[test]
    fn test_script_symbols() {
        let src = "export async function load(url) {}\nclass Widget extends Base {}\n";
        let hints = extract_symbols(src, "typescript", 40);
        assert_eq!(hints[0].kind, "export_fn");
        assert_eq!(hints[0].name, "load");
        assert_eq!(hints[1].kind, "class");
        assert_eq!(hints[1].name, "Widget");
    }

    #[test]
    fn test_extraction_bounded() {
        let src = "def f():\n    pass\n".repeat(100);
        let hints = extract_symbols(&src, "python", 10);
        assert_eq!(hints.len(), 10);
    }

    #[test]
    fn test_malformed_input_yields_empty_not_error() {
        assert!(extract_symbols("def (((", "python", 40).is_empty());
        assert!(extract_symbols("anything", "yaml", 40).is_empty());
    }
}
