//! Pure text transformations for edit-plan operations.
//!
//! Every operation takes the full file text and returns the rewritten text;
//! nothing here touches the filesystem. Line numbers are 1-indexed and
//! inclusive, with out-of-range values clamped rather than rejected.

use crate::errors::{PatchformError, PatchformResult};
use crate::models::{EditOp, PlannedOp};

/// Split into lines keeping terminators, so a join reproduces the input
/// byte-for-byte.
fn split_keep_ends(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Content of a line without its terminator, for match tests.
fn line_body(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

/// Replace the inclusive 1-indexed range `[start_line, end_line]` with
/// `new_text`. Bounds are clamped to the file; an inverted range after
/// clamping degenerates to a pure insertion at `start_line`.
pub fn replace_range(text: &str, start_line: i64, end_line: i64, new_text: &str) -> String {
    let lines = split_keep_ends(text);
    let n = lines.len();
    let s = (start_line.max(1) as usize - 1).min(n);
    let e = (end_line.max(1) as usize).min(n).max(s);

    let mut out = String::with_capacity(text.len() + new_text.len());
    for line in &lines[..s] {
        out.push_str(line);
    }
    out.push_str(new_text);
    for line in &lines[e..] {
        out.push_str(line);
    }
    out
}

pub fn delete_range(text: &str, start_line: i64, end_line: i64) -> String {
    replace_range(text, start_line, end_line, "")
}

/// Literal substring replacement: every occurrence, or at most `count`.
pub fn replace_text(text: &str, find: &str, replace: &str, count: Option<usize>) -> String {
    if find.is_empty() {
        return text.to_string();
    }
    match count {
        Some(n) => text.replacen(find, replace, n),
        None => text.replace(find, replace),
    }
}

fn insert_relative(text: &str, match_line: &str, insert_text: &str, once: bool, after: bool) -> String {
    let lines = split_keep_ends(text);
    let mut out = String::with_capacity(text.len() + insert_text.len());
    let mut done = false;
    for line in &lines {
        let hit = !done && line_body(line).contains(match_line);
        if hit && !after {
            out.push_str(insert_text);
            if !insert_text.ends_with('\n') {
                out.push('\n');
            }
        }
        out.push_str(line);
        if hit && after {
            if !line.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(insert_text);
            if !insert_text.ends_with('\n') {
                out.push('\n');
            }
        }
        if hit && once {
            done = true;
        }
    }
    out
}

/// Insert `insert_text` after the first line containing `match_line`
/// (after every matching line when `once` is false). No match leaves the
/// text unchanged. The insertion always lands on its own line: a missing
/// terminator on `insert_text` or on an unterminated matched last line is
/// normalized to a newline rather than spliced raw.
pub fn insert_after(text: &str, match_line: &str, insert_text: &str, once: bool) -> String {
    insert_relative(text, match_line, insert_text, once, true)
}

/// Insert `insert_text` before the first line containing `match_line`
/// (before every matching line when `once` is false). Like [`insert_after`],
/// `insert_text` is normalized to end with a newline.
pub fn insert_before(text: &str, match_line: &str, insert_text: &str, once: bool) -> String {
    insert_relative(text, match_line, insert_text, once, false)
}

/// Append to end of file, inserting a newline separator when the existing
/// text does not already end with one.
pub fn append(text: &str, extra: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        format!("{text}{extra}")
    } else {
        format!("{text}\n{extra}")
    }
}

fn apply_known(text: &str, op: &EditOp) -> String {
    match op {
        EditOp::ReplaceRange {
            start_line,
            end_line,
            new_text,
        } => replace_range(text, *start_line, *end_line, new_text),
        EditOp::DeleteRange {
            start_line,
            end_line,
        } => delete_range(text, *start_line, *end_line),
        EditOp::ReplaceText {
            find,
            replace,
            count,
        } => replace_text(text, find, replace, *count),
        EditOp::InsertAfter {
            match_line,
            insert_text,
            once,
        } => insert_after(text, match_line, insert_text, *once),
        EditOp::InsertBefore {
            match_line,
            insert_text,
            once,
        } => insert_before(text, match_line, insert_text, *once),
        EditOp::Append { text: extra } => append(text, extra),
    }
}

/// Apply one planned operation. Unknown operation types are an error so the
/// engine can fail just the file that carries them.
pub fn apply_op(text: &str, op: &PlannedOp) -> PatchformResult<String> {
    match op {
        PlannedOp::Known(op) => Ok(apply_known(text, op)),
        PlannedOp::Unknown(value) => {
            let kind = value
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("(missing type)");
            Err(PatchformError::UnknownOp(kind.to_string()))
        }
    }
}

/// Fold a file's operation list over its text, strictly in listed order.
pub fn apply_ops(text: &str, ops: &[PlannedOp]) -> PatchformResult<String> {
    let mut current = text.to_string();
    for op in ops {
        current = apply_op(&current, op)?;
    }
    Ok(current)
}
