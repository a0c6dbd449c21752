use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::CartoError;

// ── Node Identity ───────────────────────────────────────────────────────────

/// Build a node id from kind, file path, and optional declaration name.
///
/// Format: `{kind}.{file_path}` for whole-file nodes,
/// `{kind}.{file_path}:{name}` for declarations. File paths are always
/// relative to the sync root, so the same declaration re-extracted from
/// unchanged source yields an identical id regardless of where the project
/// is mounted.
///
/// Examples: `file.src/auth.ts`, `function.src/auth.ts:validateToken`,
/// `module.os`.
pub fn node_id(kind: &str, file_path: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{kind}.{file_path}:{name}"),
        None => format!("{kind}.{file_path}"),
    }
}

/// Build the synthesized id for an import target module.
pub fn module_id(target: &str) -> String {
    format!("module.{target}")
}

// ── Visibility ──────────────────────────────────────────────────────────────

/// Declaration visibility, inferred from keywords or naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = CartoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            _ => Err(CartoError::InvalidVisibility(s.to_string())),
        }
    }
}

// ── Graph Elements ──────────────────────────────────────────────────────────

/// A declaration found in source: one row in the code graph.
///
/// `kind` is an open string validated against the [`crate::KindRegistry`]
/// at the merge boundary, not a closed enum, so new declaration kinds can be
/// registered without code changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeNode {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub file_path: String,
    pub line_start: usize,
    pub line_end: usize,
    pub signature: Option<String>,
    pub language: Option<String>,
    pub visibility: Option<Visibility>,
    /// Content digest; only meaningful for `file`-kind nodes.
    pub hash: Option<String>,
}

/// A directed relationship between two node ids.
///
/// `to_id` may reference a node that does not exist in the store (a dangling
/// reference): expected when the target lives in a not-yet-processed file or
/// an external module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEdge {
    pub from_id: String,
    pub to_id: String,
    pub kind: String,
    pub line_number: Option<usize>,
    /// 1.0 for syntactically certain relations (`defines`), lower for
    /// heuristic ones (`extends` to an unresolved target).
    pub confidence: f64,
}

impl CodeEdge {
    /// A syntactically certain edge (confidence 1.0).
    pub fn certain(from_id: String, to_id: String, kind: &str, line_number: Option<usize>) -> Self {
        Self {
            from_id,
            to_id,
            kind: kind.to_string(),
            line_number,
            confidence: 1.0,
        }
    }

    /// A heuristic edge whose target file is not resolved.
    pub fn heuristic(
        from_id: String,
        to_id: String,
        kind: &str,
        line_number: Option<usize>,
        confidence: f64,
    ) -> Self {
        Self {
            from_id,
            to_id,
            kind: kind.to_string(),
            line_number,
            confidence,
        }
    }
}

/// Per-file change-tracking record. Counts are advisory (reporting only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHashRecord {
    pub project: String,
    pub file_path: String,
    pub hash: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub last_updated: DateTime<Utc>,
}

// ── Pipeline Results ────────────────────────────────────────────────────────

/// Result of extracting one source file. Transient; merged immediately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub nodes: Vec<CodeNode>,
    pub edges: Vec<CodeEdge>,
    pub file_path: String,
    pub file_hash: String,
    pub language: String,
    pub errors: Vec<String>,
}

impl ExtractionResult {
    /// An empty result carrying a single per-file error.
    pub fn with_error(file_path: &str, error: String) -> Self {
        Self {
            file_path: file_path.to_string(),
            errors: vec![error],
            ..Self::default()
        }
    }
}

/// Aggregate output of walking a directory tree.
#[derive(Debug, Default)]
pub struct WalkResult {
    pub nodes: Vec<CodeNode>,
    pub edges: Vec<CodeEdge>,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub errors: Vec<String>,
    /// Relative path -> content hash for every file seen this walk
    /// (freshly computed for processed files, carried forward for skipped).
    pub new_hashes: HashMap<String, String>,
}

/// Counters from applying one walk batch to the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeStats {
    pub nodes_added: usize,
    pub nodes_updated: usize,
    pub nodes_removed: usize,
    pub edges_added: usize,
}

/// Outcome of one sync run: merge counters plus walker bookkeeping.
///
/// A non-empty `errors` list signals degraded (partial) success; an error
/// from `sync` itself means the transaction did not apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub nodes_added: usize,
    pub nodes_updated: usize,
    pub nodes_removed: usize,
    pub edges_added: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub errors: Vec<String>,
}

// ── Query DTOs ──────────────────────────────────────────────────────────────

/// Traversal direction for dependency queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
    Both,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incoming => write!(f, "incoming"),
            Self::Outgoing => write!(f, "outgoing"),
            Self::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = CartoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "incoming" | "in" => Ok(Self::Incoming),
            "outgoing" | "out" => Ok(Self::Outgoing),
            "both" => Ok(Self::Both),
            _ => Err(CartoError::InvalidDirection(s.to_string())),
        }
    }
}

/// One node reached by a dependency traversal.
///
/// `kind`/`name`/`file_path` are `None` for dangling targets that have no
/// stored node row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub id: String,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub file_path: Option<String>,
    /// The edge kind that led to this node.
    pub relation: String,
    pub direction: Direction,
    pub depth: usize,
}

/// An import recorded for a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRef {
    pub target: String,
    pub line: Option<usize>,
}

/// Structural summary of one file: its node plus everything it defines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStructure {
    pub file: CodeNode,
    pub classes: Vec<CodeNode>,
    pub functions: Vec<CodeNode>,
    pub interfaces: Vec<CodeNode>,
    pub types: Vec<CodeNode>,
    pub constants: Vec<CodeNode>,
    pub imports: Vec<ImportRef>,
}

/// Aggregate statistics for one project's code graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub file_count: usize,
    pub kinds: HashMap<String, usize>,
    pub last_sync: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_format() {
        assert_eq!(node_id("file", "src/a.ts", None), "file.src/a.ts");
        assert_eq!(
            node_id("function", "src/a.ts", Some("validateToken")),
            "function.src/a.ts:validateToken"
        );
        assert_eq!(module_id("os"), "module.os");
    }

    #[test]
    fn node_id_is_deterministic() {
        let a = node_id("class", "models/user.py", Some("User"));
        let b = node_id("class", "models/user.py", Some("User"));
        assert_eq!(a, b);
    }

    #[test]
    fn visibility_roundtrip() {
        for vis in [Visibility::Public, Visibility::Private] {
            let s = vis.to_string();
            let parsed: Visibility = s.parse().unwrap();
            assert_eq!(vis, parsed);
        }
        assert!("protected".parse::<Visibility>().is_err());
    }

    #[test]
    fn direction_accepts_short_forms() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::Incoming);
        assert_eq!("out".parse::<Direction>().unwrap(), Direction::Outgoing);
        assert_eq!("BOTH".parse::<Direction>().unwrap(), Direction::Both);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn certain_edge_has_full_confidence() {
        let edge = CodeEdge::certain(
            "file.a.py".to_string(),
            "function.a.py:foo".to_string(),
            "defines",
            None,
        );
        assert!((edge.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn extraction_result_with_error_is_empty() {
        let result = ExtractionResult::with_error("a.bin", "undecodable".to_string());
        assert!(result.nodes.is_empty());
        assert!(result.edges.is_empty());
        assert_eq!(result.errors.len(), 1);
    }
}
