//! TypeScript and JavaScript extraction.
//!
//! One pattern table serves both languages; TSX/JSX files go through the
//! same patterns since top-level declarations look identical.

use super::{block_end_braced, file_node, line_of, LanguageExtractor};
use carto_core::{module_id, node_id, CodeEdge, CodeNode, ExtractionResult, Visibility};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^import\s+(?:(?:\{[^}]+\}|\*\s+as\s+\w+|\w+)\s+from\s+)?['"]([^'"]+)['"]"#)
        .expect("valid regex")
});

static FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?P<vis>export\s+)?(?:async\s+)?function\s+(?P<name>\w+)")
        .expect("valid regex")
});

static ARROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^(?P<vis>export\s+)?const\s+(?P<name>\w+)\s*=\s*(?:async\s+)?\([^)]*\)\s*(?::\s*[^=]+)?\s*=>",
    )
    .expect("valid regex")
});

static CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^(?:export\s+)?(?:abstract\s+)?class\s+(?P<name>\w+)(?:\s+extends\s+(?P<extends>\w+))?(?:\s+implements\s+(?P<implements>[^\{]+))?",
    )
    .expect("valid regex")
});

static INTERFACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:export\s+)?interface\s+(?P<name>\w+)(?:\s+extends\s+(?P<extends>[^\{]+))?")
        .expect("valid regex")
});

static TYPE_ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:export\s+)?type\s+(?P<name>\w+)\s*=").expect("valid regex"));

static CONSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:export\s+)?const\s+(?P<name>\w+)\s*(?::\s*[^=]+)?\s*=\s*[^=]")
        .expect("valid regex")
});

/// Extractor shared by TypeScript and JavaScript.
pub struct TsLike {
    language: &'static str,
    extensions: &'static [&'static str],
}

pub static TYPESCRIPT: TsLike = TsLike {
    language: "typescript",
    extensions: &["ts", "tsx"],
};

pub static JAVASCRIPT: TsLike = TsLike {
    language: "javascript",
    extensions: &["js", "jsx"],
};

impl LanguageExtractor for TsLike {
    fn language(&self) -> &'static str {
        self.language
    }

    fn extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    fn extract(&self, source: &str, file_path: &str, file_hash: &str) -> ExtractionResult {
        let mut result = ExtractionResult {
            file_path: file_path.to_string(),
            file_hash: file_hash.to_string(),
            language: self.language.to_string(),
            ..ExtractionResult::default()
        };

        let file = file_node(file_path, self.language, file_hash);
        let file_id = file.id.clone();
        result.nodes.push(file);

        let lines: Vec<&str> = source.lines().collect();
        let signature = |line: usize| lines.get(line - 1).map(|l| l.trim().to_string());
        let mut seen: HashSet<String> = HashSet::new();
        // Names claimed as arrow functions, so CONSTANT does not re-report
        // them as constants.
        let mut function_names: HashSet<String> = HashSet::new();

        for m in IMPORT.captures_iter(source) {
            let target = &m[1];
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            result.edges.push(CodeEdge::certain(
                file_id.clone(),
                module_id(target),
                "imports",
                Some(line),
            ));
        }

        for m in FUNCTION.captures_iter(source) {
            let name = &m["name"];
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            let id = node_id("function", file_path, Some(name));
            if !seen.insert(id.clone()) {
                continue;
            }
            function_names.insert(name.to_string());
            result.nodes.push(CodeNode {
                id: id.clone(),
                kind: "function".to_string(),
                name: name.to_string(),
                file_path: file_path.to_string(),
                line_start: line,
                line_end: block_end_braced(&lines, line - 1),
                signature: signature(line),
                language: Some(self.language.to_string()),
                visibility: Some(visibility_from_export(m.name("vis").is_some())),
                hash: None,
            });
            result
                .edges
                .push(CodeEdge::certain(file_id.clone(), id, "defines", None));
        }

        for m in ARROW.captures_iter(source) {
            let name = &m["name"];
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            let id = node_id("function", file_path, Some(name));
            if !seen.insert(id.clone()) {
                continue;
            }
            function_names.insert(name.to_string());
            result.nodes.push(CodeNode {
                id: id.clone(),
                kind: "function".to_string(),
                name: name.to_string(),
                file_path: file_path.to_string(),
                line_start: line,
                line_end: block_end_braced(&lines, line - 1),
                signature: signature(line),
                language: Some(self.language.to_string()),
                visibility: Some(visibility_from_export(m.name("vis").is_some())),
                hash: None,
            });
            result
                .edges
                .push(CodeEdge::certain(file_id.clone(), id, "defines", None));
        }

        for m in CLASS.captures_iter(source) {
            let name = &m["name"];
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
                line_end: block_end_braced(&lines, line - 1),
                signature: signature(line),
                language: Some(self.language.to_string()),
                visibility: Some(Visibility::Public),
                hash: None,
            });
            result
                .edges
                .push(CodeEdge::certain(file_id.clone(), id.clone(), "defines", None));

            if let Some(parent) = m.name("extends") {
                result.edges.push(CodeEdge::heuristic(
                    id.clone(),
                    format!("class.{}", parent.as_str()),
                    "extends",
                    Some(line),
                    0.8,
                ));
            }
            if let Some(ifaces) = m.name("implements") {
                for iface in ifaces.as_str().split(',') {
                    let iface = iface.trim();
                    if !iface.is_empty() {
                        result.edges.push(CodeEdge::heuristic(
                            id.clone(),
                            format!("interface.{iface}"),
                            "implements",
                            Some(line),
                            0.8,
                        ));
                    }
                }
            }
        }

        for m in INTERFACE.captures_iter(source) {
            let name = &m["name"];
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            let id = node_id("interface", file_path, Some(name));
            if !seen.insert(id.clone()) {
                continue;
            }
            result.nodes.push(CodeNode {
                id: id.clone(),
                kind: "interface".to_string(),
                name: name.to_string(),
                file_path: file_path.to_string(),
                line_start: line,
                line_end: block_end_braced(&lines, line - 1),
                signature: signature(line),
                language: Some(self.language.to_string()),
                visibility: None,
                hash: None,
            });
            result
                .edges
                .push(CodeEdge::certain(file_id.clone(), id.clone(), "defines", None));

            if let Some(parents) = m.name("extends") {
                for parent in parents.as_str().split(',') {
                    let parent = parent.trim();
                    if !parent.is_empty() {
                        result.edges.push(CodeEdge::heuristic(
                            id.clone(),
                            format!("interface.{parent}"),
                            "extends",
                            Some(line),
                            0.8,
                        ));
                    }
                }
            }
        }

        for m in TYPE_ALIAS.captures_iter(source) {
            let name = &m["name"];
            let line = line_of(source, m.get(0).map_or(0, |g| g.start()));
            let id = node_id("type", file_path, Some(name));
            if !seen.insert(id.clone()) {
                continue;
            }
            result.nodes.push(CodeNode {
                id: id.clone(),
                kind: "type".to_string(),
                name: name.to_string(),
                file_path: file_path.to_string(),
                line_start: line,
                line_end: line,
                signature: signature(line),
                language: Some(self.language.to_string()),
                visibility: None,
                hash: None,
            });
            result
                .edges
                .push(CodeEdge::certain(file_id.clone(), id, "defines", None));
        }

        for m in CONSTANT.captures_iter(source) {
            let name = &m["name"];
            if function_names.contains(name) {
                continue;
            }
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
                language: Some(self.language.to_string()),
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

fn visibility_from_export(exported: bool) -> Visibility {
    if exported {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> ExtractionResult {
        TYPESCRIPT.extract(source, "src/auth.ts", "deadbeef")
    }

    fn node<'a>(result: &'a ExtractionResult, id: &str) -> &'a CodeNode {
        result
            .nodes
            .iter()
            .find(|n| n.id == id)
            .unwrap_or_else(|| panic!("missing node {id}"))
    }

    #[test]
    fn imports_become_module_edges() {
        let result = extract(
            "import express from 'express';\n\
             import { Router } from 'express';\n\
             import * as path from 'path';\n\
             import './side-effect';\n",
        );
        let targets: Vec<&str> = result
            .edges
            .iter()
            .filter(|e| e.kind == "imports")
            .map(|e| e.to_id.as_str())
            .collect();
        assert_eq!(
            targets,
            vec![
                "module.express",
                "module.express",
                "module.path",
                "module../side-effect"
            ]
        );
        assert_eq!(result.edges[0].line_number, Some(1));
    }

    #[test]
    fn export_function_is_public_with_extent() {
        let result = extract(
            "export async function validateToken(token: string) {\n\
               return verify(token);\n\
             }\n",
        );
        let func = node(&result, "function.src/auth.ts:validateToken");
        assert_eq!(func.visibility, Some(Visibility::Public));
        assert_eq!(func.line_start, 1);
        assert_eq!(func.line_end, 3);
        assert!(result
            .edges
            .iter()
            .any(|e| e.kind == "defines" && e.to_id == func.id));
    }

    #[test]
    fn plain_function_is_private() {
        let result = extract("function helper() {\n  return 1;\n}\n");
        let func = node(&result, "function.src/auth.ts:helper");
        assert_eq!(func.visibility, Some(Visibility::Private));
    }

    #[test]
    fn arrow_const_is_a_function_not_a_constant() {
        let result = extract("export const login = async (user: User): Promise<Session> =>\n  doLogin(user);\n");
        assert!(result.nodes.iter().any(|n| n.id == "function.src/auth.ts:login"));
        assert!(!result.nodes.iter().any(|n| n.kind == "constant"));
    }

    #[test]
    fn class_with_extends_and_implements() {
        let result = extract(
            "export class AdminUser extends User implements Serializable, Auditable {\n\
               role = 'admin';\n\
             }\n",
        );
        let class = node(&result, "class.src/auth.ts:AdminUser");
        assert_eq!(class.line_end, 3);

        let extends: Vec<&CodeEdge> =
            result.edges.iter().filter(|e| e.kind == "extends").collect();
        assert_eq!(extends.len(), 1);
        assert_eq!(extends[0].to_id, "class.User");
        assert!((extends[0].confidence - 0.8).abs() < f64::EPSILON);

        let implements: Vec<&str> = result
            .edges
            .iter()
            .filter(|e| e.kind == "implements")
            .map(|e| e.to_id.as_str())
            .collect();
        assert_eq!(implements, vec!["interface.Serializable", "interface.Auditable"]);
    }

    #[test]
    fn interface_and_type_alias() {
        let result = extract(
            "export interface Session extends Base {\n\
               id: string;\n\
             }\n\
             export type Token = string;\n",
        );
        assert!(result.nodes.iter().any(|n| n.id == "interface.src/auth.ts:Session"));
        let alias = node(&result, "type.src/auth.ts:Token");
        assert_eq!(alias.line_start, alias.line_end);
        assert!(result
            .edges
            .iter()
            .any(|e| e.kind == "extends" && e.to_id == "interface.Base"));
    }

    #[test]
    fn plain_const_is_a_constant() {
        let result = extract("export const MAX_RETRIES: number = 3;\n");
        let constant = node(&result, "constant.src/auth.ts:MAX_RETRIES");
        assert_eq!(constant.kind, "constant");
    }

    #[test]
    fn every_file_gets_a_file_node() {
        let result = extract("");
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.nodes[0].id, "file.src/auth.ts");
        assert_eq!(result.nodes[0].hash.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn javascript_uses_its_own_language_tag() {
        let result = JAVASCRIPT.extract("function f() {}\n", "app.js", "cafe");
        assert_eq!(result.language, "javascript");
        assert_eq!(
            node(&result, "function.app.js:f").language.as_deref(),
            Some("javascript")
        );
    }
}
