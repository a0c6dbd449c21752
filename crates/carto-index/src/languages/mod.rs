//! Per-language pattern tables and extraction logic.
//!
//! Each extractor is a pure function of source text: regex pattern tables
//! find top-level declarations, and a small block-extent scan approximates
//! where each declaration ends. No AST, no type resolution; targets that
//! cannot be resolved to a file become dangling ids with lowered confidence.

mod go;
mod python;
mod typescript;

use carto_core::{node_id, CodeNode, ExtractionResult};

pub use go::GO;
pub use python::PYTHON;
pub use typescript::{JAVASCRIPT, TYPESCRIPT};

/// A structural extractor for one source language.
pub trait LanguageExtractor {
    /// Canonical language name, e.g. `"typescript"`.
    fn language(&self) -> &'static str;

    /// File extensions handled, without the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Extract declarations and relationships from one file's source.
    ///
    /// `file_path` must be relative to the sync root; it becomes part of
    /// every node id. `file_hash` is the digest of the file's raw bytes.
    fn extract(&self, source: &str, file_path: &str, file_hash: &str) -> ExtractionResult;
}

/// All registered extractors.
pub static EXTRACTORS: &[&(dyn LanguageExtractor + Sync)] =
    &[&TYPESCRIPT, &JAVASCRIPT, &PYTHON, &GO];

/// The whole-file node every extraction starts from.
pub(crate) fn file_node(file_path: &str, language: &str, file_hash: &str) -> CodeNode {
    let name = file_path.rsplit('/').next().unwrap_or(file_path);
    CodeNode {
        id: node_id("file", file_path, None),
        kind: "file".to_string(),
        name: name.to_string(),
        file_path: file_path.to_string(),
        line_start: 1,
        line_end: 1,
        signature: None,
        language: Some(language.to_string()),
        visibility: None,
        hash: Some(file_hash.to_string()),
    }
}

/// 1-indexed line number of a byte offset into `source`.
pub(crate) fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|&b| b == b'\n').count() + 1
}

/// End line of a brace-delimited block starting at `start` (0-indexed line).
///
/// Counts `{`/`}` from the declaration line onward and returns the 1-indexed
/// line where the opening brace closes. Falls back to the last line when the
/// block never closes (or never opens, as with `declare` signatures).
pub(crate) fn block_end_braced(lines: &[&str], start: usize) -> usize {
    let mut depth: i32 = 0;
    let mut started = false;
    for (i, line) in lines.iter().enumerate().skip(start) {
        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    started = true;
                }
                '}' => {
                    depth -= 1;
                    if started && depth == 0 {
                        return i + 1;
                    }
                }
                _ => {}
            }
        }
    }
    lines.len()
}

/// End line of an indentation-delimited block starting at `start`
/// (0-indexed line).
///
/// Scans forward for the first non-blank, non-comment line indented at or
/// below the declaration's level; blank lines and `#` comments inside the
/// body do not terminate it.
pub(crate) fn block_end_indented(lines: &[&str], start: usize) -> usize {
    if start >= lines.len() {
        return start + 1;
    }
    let indent_of = |line: &str| line.len() - line.trim_start().len();
    let start_indent = indent_of(lines[start]);

    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        if indent_of(line) <= start_indent {
            return i;
        }
    }
    lines.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_of_counts_newlines() {
        let src = "a\nb\nc";
        assert_eq!(line_of(src, 0), 1);
        assert_eq!(line_of(src, 2), 2);
        assert_eq!(line_of(src, 4), 3);
    }

    #[test]
    fn braced_block_end_balances_nesting() {
        let lines: Vec<&str> = "function f() {\n  if (x) {\n    y();\n  }\n}\nafter"
            .lines()
            .collect();
        assert_eq!(block_end_braced(&lines, 0), 5);
    }

    #[test]
    fn braced_block_without_close_runs_to_eof() {
        let lines: Vec<&str> = "function f() {\n  y();".lines().collect();
        assert_eq!(block_end_braced(&lines, 0), 2);
    }

    #[test]
    fn indented_block_skips_blanks_and_comments() {
        let src = "def f():\n    a = 1\n\n    # comment\n    b = 2\nprint(f())";
        let lines: Vec<&str> = src.lines().collect();
        assert_eq!(block_end_indented(&lines, 0), 5);
    }

    #[test]
    fn indented_block_at_eof() {
        let lines: Vec<&str> = "def f():\n    pass".lines().collect();
        assert_eq!(block_end_indented(&lines, 0), 2);
    }

    #[test]
    fn extractors_cover_expected_extensions() {
        let all: Vec<&str> = EXTRACTORS.iter().flat_map(|e| e.extensions()).copied().collect();
        for ext in ["ts", "tsx", "js", "jsx", "py", "go"] {
            assert!(all.contains(&ext), "missing extension {ext}");
        }
    }
}
