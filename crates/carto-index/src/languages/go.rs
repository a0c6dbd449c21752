//! Go extraction.
//!
//! Visibility follows Go's convention: an exported identifier starts with
//! an upper-case letter. Methods are extracted as functions under their own
//! name; struct types map to `class` nodes and interface types to
//! `interface` nodes.

use super::{block_end_braced, file_node, line_of, LanguageExtractor};
use carto_core::{module_id, node_id, CodeEdge, CodeNode, ExtractionResult, Visibility};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static IMPORT_SINGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^import\s+(?:\w+\s+)?"([^"]+)""#).expect("valid regex"));

static IMPORT_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^import\s*\((.*?)\)").expect("valid regex"));

static IMPORT_GROUP_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:\w+\s+)?"([^"]+)""#).expect("valid regex"));

static FUNC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^func\s+(?:\([^)]*\)\s+)?(\w+)\s*\(").expect("valid regex")
});

static TYPE_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^type\s+(\w+)\s+(struct\b|interface\b|\S+)").expect("valid regex"));

static CONST_SINGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^const\s+([A-Za-z_]\w*)").expect("valid regex"));

static CONST_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^const\s*\((.*?)\)").expect("valid regex"));

static CONST_GROUP_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*([A-Za-z_]\w*)").expect("valid regex"));

pub struct Go;

pub static GO: Go = Go;

impl LanguageExtractor for Go {
    fn language(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn extract(&self, source: &str, file_path: &str, file_hash: &str) -> ExtractionResult {
        let mut result = ExtractionResult {
            file_path: file_path.to_string(),
            file_hash: file_hash.to_string(),
            language: "go".to_string(),
            ..ExtractionResult::default()
        };

        let file = file_node(file_path, "go", file_hash);
        let file_id = file.id.clone();
        result.nodes.push(file);

        let lines: Vec<&str> = source.lines().collect();
        let signature = |line: usize| lines.get(line - 1).map(|l| l.trim().to_string());
        let mut seen: HashSet<String> = HashSet::new();

        for m in IMPORT_SINGLE.captures_iter(source) {
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            result.edges.push(CodeEdge::certain(
                file_id.clone(),
                module_id(&m[1]),
                "imports",
                Some(line),
            ));
        }

        for group in IMPORT_GROUP.captures_iter(source) {
            let block = group.get(1).map_or("", |g| g.as_str());
            let block_start = group.get(1).map_or(0, |g| g.start());
            for m in IMPORT_GROUP_LINE.captures_iter(block) {
                let offset = block_start + m.get(0).map_or(0, |g| g.start());
                result.edges.push(CodeEdge::certain(
                    file_id.clone(),
                    module_id(&m[1]),
                    "imports",
                    Some(line_of(source, offset)),
                ));
            }
        }

        for m in FUNC.captures_iter(source) {
            let name = &m[1];
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            let id = node_id("function", file_path, Some(name));
            if !seen.insert(id.clone()) {
                continue;
            }
            result.nodes.push(CodeNode {
                id: id.clone(),
                kind: "function".to_string(),
                name: name.to_string(),
                file_path: file_path.to_string(),
                line_start: line,
                line_end: block_end_braced(&lines, line - 1),
                signature: signature(line),
                language: Some("go".to_string()),
                visibility: Some(go_visibility(name)),
                hash: None,
            });
            result
                .edges
                .push(CodeEdge::certain(file_id.clone(), id, "defines", None));
        }

        for m in TYPE_DECL.captures_iter(source) {
            let name = &m[1];
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            let kind = match &m[2] {
                "struct" => "class",
                "interface" => "interface",
                _ => "type",
            };
            let id = node_id(kind, file_path, Some(name));
            if !seen.insert(id.clone()) {
                continue;
            }
            let line_end = if kind == "type" {
                line
            } else {
                block_end_braced(&lines, line - 1)
            };
            result.nodes.push(CodeNode {
                id: id.clone(),
                kind: kind.to_string(),
                name: name.to_string(),
                file_path: file_path.to_string(),
                line_start: line,
                line_end,
                signature: signature(line),
                language: Some("go".to_string()),
                visibility: Some(go_visibility(name)),
                hash: None,
            });
            result
                .edges
                .push(CodeEdge::certain(file_id.clone(), id, "defines", None));
        }

        let mut push_const = |name: &str, line: usize, result: &mut ExtractionResult| {
            let id = node_id("constant", file_path, Some(name));
            if !seen.insert(id.clone()) {
                return;
            }
            result.nodes.push(CodeNode {
                id: id.clone(),
                kind: "constant".to_string(),
                name: name.to_string(),
                file_path: file_path.to_string(),
                line_start: line,
                line_end: line,
                signature: lines.get(line - 1).map(|l| l.trim().to_string()),
                language: Some("go".to_string()),
                visibility: Some(go_visibility(name)),
                hash: None,
            });
            result
                .edges
                .push(CodeEdge::certain(file_id.clone(), id, "defines", None));
        };

        let const_matches: Vec<(String, usize)> = CONST_SINGLE
            .captures_iter(source)
            .map(|m| {
                (
                    m[1].to_string(),
                    line_of(source, m.get(0).map_or(0, |g| g.start())),
                )
            })
            .collect();
        for (name, line) in const_matches {
            push_const(&name, line, &mut result);
        }

        let group_matches: Vec<(String, usize)> = CONST_GROUP
            .captures_iter(source)
            .flat_map(|group| {
                let block = group.get(1).map_or("", |g| g.as_str());
                let block_start = group.get(1).map_or(0, |g| g.start());
                CONST_GROUP_LINE
                    .captures_iter(block)
                    .map(|m| {
                        let offset = block_start + m.get(1).map_or(0, |g| g.start());
                        (m[1].to_string(), line_of(source, offset))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        for (name, line) in group_matches {
            push_const(&name, line, &mut result);
        }

        result
    }
}

fn go_visibility(name: &str) -> Visibility {
    if name.chars().next().is_some_and(|c| c.is_uppercase()) {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> ExtractionResult {
        GO.extract(source, "server/main.go", "beefcafe")
    }

    #[test]
    fn single_and_grouped_imports() {
        let result = extract(
            "package main\n\n\
             import \"fmt\"\n\n\
             import (\n\
             \t\"net/http\"\n\
             \tlog \"github.com/sirupsen/logrus\"\n\
             )\n",
        );
        let targets: Vec<&str> = result
            .edges
            .iter()
            .filter(|e| e.kind == "imports")
            .map(|e| e.to_id.as_str())
            .collect();
        assert_eq!(
            targets,
            vec!["module.fmt", "module.net/http", "module.github.com/sirupsen/logrus"]
        );
    }

    #[test]
    fn functions_and_methods_with_case_visibility() {
        let result = extract(
            "package main\n\n\
             func Handle(w http.ResponseWriter) {\n\
             }\n\n\
             func (s *Server) listen(addr string) {\n\
             }\n",
        );
        let handle = result.nodes.iter().find(|n| n.name == "Handle").unwrap();
        let listen = result.nodes.iter().find(|n| n.name == "listen").unwrap();
        assert_eq!(handle.visibility, Some(Visibility::Public));
        assert_eq!(listen.visibility, Some(Visibility::Private));
        assert_eq!(handle.line_start, 3);
        assert_eq!(handle.line_end, 4);
    }

    #[test]
    fn type_declarations_map_to_kinds() {
        let result = extract(
            "package main\n\n\
             type Server struct {\n\
             \taddr string\n\
             }\n\n\
             type Handler interface {\n\
             \tServe()\n\
             }\n\n\
             type UserID int64\n",
        );
        assert!(result.nodes.iter().any(|n| n.kind == "class" && n.name == "Server"));
        assert!(result.nodes.iter().any(|n| n.kind == "interface" && n.name == "Handler"));
        let alias = result
            .nodes
            .iter()
            .find(|n| n.kind == "type" && n.name == "UserID")
            .unwrap();
        assert_eq!(alias.line_start, alias.line_end);
    }

    #[test]
    fn const_declarations() {
        let result = extract(
            "package main\n\n\
             const MaxConns = 10\n\n\
             const (\n\
             \tStateIdle = iota\n\
             \tstateBusy\n\
             )\n",
        );
        let consts: Vec<&str> = result
            .nodes
            .iter()
            .filter(|n| n.kind == "constant")
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(consts, vec!["MaxConns", "StateIdle", "stateBusy"]);
        let idle = result.nodes.iter().find(|n| n.name == "StateIdle").unwrap();
        assert_eq!(idle.visibility, Some(Visibility::Public));
        assert_eq!(idle.line_start, 6);
    }
}
