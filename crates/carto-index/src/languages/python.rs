//! Python extraction.

use super::{block_end_indented, file_node, line_of, LanguageExtractor};
use carto_core::{module_id, node_id, CodeEdge, CodeNode, ExtractionResult, Visibility};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:from\s+(\S+)\s+)?import\s+(.+)$").expect("valid regex"));

// Anchored at column zero, so only top-level declarations match.
static FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:async\s+)?def\s+(\w+)\s*\(").expect("valid regex"));

static CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^class\s+(\w+)(?:\s*\(([^)]*)\))?:").expect("valid regex"));

static CONSTANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([A-Z][A-Z0-9_]*)\s*=").expect("valid regex"));

pub struct Python;

pub static PYTHON: Python = Python;

impl LanguageExtractor for Python {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn extract(&self, source: &str, file_path: &str, file_hash: &str) -> ExtractionResult {
        let mut result = ExtractionResult {
            file_path: file_path.to_string(),
            file_hash: file_hash.to_string(),
            language: "python".to_string(),
            ..ExtractionResult::default()
        };

        let file = file_node(file_path, "python", file_hash);
        let file_id = file.id.clone();
        result.nodes.push(file);

        let lines: Vec<&str> = source.lines().collect();
        let signature = |line: usize| lines.get(line - 1).map(|l| l.trim().to_string());
        let mut seen: HashSet<String> = HashSet::new();

        for m in IMPORT.captures_iter(source) {
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            // `from x import a, b` targets x; `import x, y` targets the
            // first listed module (matching how the record is consumed:
            // one import line, one primary dependency).
            let target = match m.get(1) {
                Some(from_module) => from_module.as_str().to_string(),
                None => m[2]
                    .split(',')
                    .next()
                    .unwrap_or("")
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_string(),
            };
            if target.is_empty() {
                continue;
            }
            result.edges.push(CodeEdge::certain(
                file_id.clone(),
                module_id(&target),
                "imports",
                Some(line),
            ));
        }

        for m in FUNCTION.captures_iter(source) {
            let name = &m[1];
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            let id = node_id("function", file_path, Some(name));
            if !seen.insert(id.clone()) {
                continue;
            }
            let visibility = if name.starts_with('_') {
                Visibility::Private
            } else {
                Visibility::Public
            };
            result.nodes.push(CodeNode {
                id: id.clone(),
                kind: "function".to_string(),
                name: name.to_string(),
                file_path: file_path.to_string(),
                line_start: line,
                line_end: block_end_indented(&lines, line - 1),
                signature: signature(line),
                language: Some("python".to_string()),
                visibility: Some(visibility),
                hash: None,
            });
            result
                .edges
                .push(CodeEdge::certain(file_id.clone(), id, "defines", None));
        }

        for m in CLASS.captures_iter(source) {
            let name = &m[1];
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            let id = node_id("class", file_path, Some(name));
            if !seen.insert(id.clone()) {
                continue;
            }
            result.nodes.push(CodeNode {
                id: id.clone(),
                kind: "class".to_string(),
                name: name.to_string(),
                file_path: file_path.to_string(),
                line_start: line,
                line_end: block_end_indented(&lines, line - 1),
                signature: signature(line),
                language: Some("python".to_string()),
                visibility: None,
                hash: None,
            });
            result
                .edges
                .push(CodeEdge::certain(file_id.clone(), id.clone(), "defines", None));

            if let Some(bases) = m.get(2) {
                for base in bases.as_str().split(',') {
                    let base = base.trim();
                    // `object` adds nothing; `metaclass=...` is not a base.
                    if base.is_empty() || base == "object" || base.contains('=') {
                        continue;
                    }
                    result.edges.push(CodeEdge::heuristic(
                        id.clone(),
                        format!("class.{base}"),
                        "extends",
                        Some(line),
                        0.8,
                    ));
                }
            }
        }

        for m in CONSTANT.captures_iter(source) {
            let name = &m[1];
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            let id = node_id("constant", file_path, Some(name));
            if !seen.insert(id.clone()) {
                continue;
            }
            result.nodes.push(CodeNode {
                id: id.clone(),
                kind: "constant".to_string(),
                name: name.to_string(),
                file_path: file_path.to_string(),
                line_start: line,
                line_end: line,
                signature: signature(line),
                language: Some("python".to_string()),
                visibility: None,
                hash: None,
            });
            result
                .edges
                .push(CodeEdge::certain(file_id.clone(), id, "defines", None));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> ExtractionResult {
        PYTHON.extract(source, "app/models.py", "feedface")
    }

    #[test]
    fn from_import_targets_the_module() {
        let result = extract("from os.path import join, exists\nimport sys\nimport json, re\n");
        let targets: Vec<&str> = result
            .edges
            .iter()
            .filter(|e| e.kind == "imports")
            .map(|e| e.to_id.as_str())
            .collect();
        assert_eq!(targets, vec!["module.os.path", "module.sys", "module.json"]);
    }

    #[test]
    fn underscore_functions_are_private() {
        let result = extract("def public_fn():\n    pass\n\ndef _helper():\n    pass\n");
        let public = result
            .nodes
            .iter()
            .find(|n| n.name == "public_fn")
            .unwrap();
        let private = result.nodes.iter().find(|n| n.name == "_helper").unwrap();
        assert_eq!(public.visibility, Some(Visibility::Public));
        assert_eq!(private.visibility, Some(Visibility::Private));
    }

    #[test]
    fn indented_defs_are_not_top_level() {
        let result = extract("class A:\n    def method(self):\n        pass\n");
        assert!(!result
            .nodes
            .iter()
            .any(|n| n.kind == "function" && n.name == "method"));
        assert!(result.nodes.iter().any(|n| n.kind == "class" && n.name == "A"));
    }

    #[test]
    fn class_bases_skip_object_and_kwargs() {
        let result =
            extract("class User(Base, object, metaclass=Meta):\n    pass\n\nclass Plain:\n    pass\n");
        let extends: Vec<&str> = result
            .edges
            .iter()
            .filter(|e| e.kind == "extends")
            .map(|e| e.to_id.as_str())
            .collect();
        assert_eq!(extends, vec!["class.Base"]);
    }

    #[test]
    fn block_extent_spans_body_with_blanks() {
        let result = extract("def foo():\n    a = 1\n\n    return a\nBAR = 2\n");
        let foo = result.nodes.iter().find(|n| n.name == "foo").unwrap();
        assert_eq!(foo.line_start, 1);
        assert_eq!(foo.line_end, 4);
    }

    #[test]
    fn upper_case_assignments_are_constants() {
        let result = extract("MAX_SIZE = 100\nnot_const = 1\nHTTP2 = True\n");
        let consts: Vec<&str> = result
            .nodes
            .iter()
            .filter(|n| n.kind == "constant")
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(consts, vec!["MAX_SIZE", "HTTP2"]);
    }

    #[test]
    fn defines_edges_connect_file_to_declarations() {
        let result = extract("def foo():\n    pass\n");
        assert!(result.edges.iter().any(|e| {
            e.kind == "defines"
                && e.from_id == "file.app/models.py"
                && e.to_id == "function.app/models.py:foo"
        }));
    }
}
