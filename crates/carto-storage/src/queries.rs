//! Read-only queries over the code graph.

use crate::Store;
use carto_core::{
    CartoError, CodeEdge, CodeNode, DependencyEntry, Direction, FileHashRecord, FileStructure,
    GraphStats, ImportRef,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::{HashMap, HashSet, VecDeque};

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<CodeNode> {
    let visibility: Option<String> = row.get("visibility")?;
    Ok(CodeNode {
        id: row.get("id")?,
        kind: row.get("kind")?,
        name: row.get("name")?,
        file_path: row.get("file_path")?,
        line_start: row.get::<_, i64>("line_start")? as usize,
        line_end: row.get::<_, i64>("line_end")? as usize,
        signature: row.get("signature")?,
        language: row.get("language")?,
        visibility: visibility.and_then(|v| v.parse().ok()),
        hash: row.get("hash")?,
    })
}

impl Store {
    /// Stored content hashes for a project, keyed by relative file path.
    /// This is the change-detection baseline for an incremental walk.
    pub fn file_hashes(&self, project: &str) -> Result<HashMap<String, String>, CartoError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT file_path, hash FROM file_hashes WHERE project = ?1")
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(params![project], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let mut hashes = HashMap::new();
        for row in rows {
            let (path, hash) = row.map_err(|e| CartoError::Storage(e.to_string()))?;
            hashes.insert(path, hash);
        }
        Ok(hashes)
    }

    /// Full hash records for a project, ordered by file path.
    pub fn file_hash_records(&self, project: &str) -> Result<Vec<FileHashRecord>, CartoError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT file_path, hash, node_count, edge_count, last_updated
                 FROM file_hashes WHERE project = ?1 ORDER BY file_path",
            )
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(params![project], |row| {
                Ok(FileHashRecord {
                    project: project.to_string(),
                    file_path: row.get(0)?,
                    hash: row.get(1)?,
                    node_count: row.get::<_, i64>(2)? as usize,
                    edge_count: row.get::<_, i64>(3)? as usize,
                    last_updated: epoch_to_datetime(row.get(4)?),
                })
            })
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| CartoError::Storage(e.to_string()))
    }

    /// List nodes for a project, optionally filtered by kind and/or file
    /// path. Ordered by file path then starting line for stable output.
    pub fn nodes(
        &self,
        project: &str,
        kind: Option<&str>,
        file_path: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CodeNode>, CartoError> {
        let mut sql = String::from("SELECT * FROM code_nodes WHERE project = ?1");
        let mut args: Vec<&str> = vec![project];
        if let Some(kind) = kind {
            args.push(kind);
            sql.push_str(&format!(" AND kind = ?{}", args.len()));
        }
        if let Some(file_path) = file_path {
            args.push(file_path);
            sql.push_str(&format!(" AND file_path = ?{}", args.len()));
        }
        sql.push_str(&format!(
            " ORDER BY file_path, line_start LIMIT {limit}"
        ));

        let conn = self.conn();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args), node_from_row)
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| CartoError::Storage(e.to_string()))
    }

    /// List edges, optionally filtered by endpoint ids and/or kind.
    pub fn edges(
        &self,
        project: &str,
        from_id: Option<&str>,
        to_id: Option<&str>,
        kind: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CodeEdge>, CartoError> {
        let mut sql = String::from(
            "SELECT from_id, to_id, kind, line_number, confidence
             FROM code_edges WHERE project = ?1",
        );
        let mut args: Vec<&str> = vec![project];
        if let Some(from_id) = from_id {
            args.push(from_id);
            sql.push_str(&format!(" AND from_id = ?{}", args.len()));
        }
        if let Some(to_id) = to_id {
            args.push(to_id);
            sql.push_str(&format!(" AND to_id = ?{}", args.len()));
        }
        if let Some(kind) = kind {
            args.push(kind);
            sql.push_str(&format!(" AND kind = ?{}", args.len()));
        }
        sql.push_str(&format!(" ORDER BY from_id, to_id LIMIT {limit}"));

        let conn = self.conn();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args), |row| {
                Ok(CodeEdge {
                    from_id: row.get(0)?,
                    to_id: row.get(1)?,
                    kind: row.get(2)?,
                    line_number: row.get::<_, Option<i64>>(3)?.map(|n| n as usize),
                    confidence: row.get(4)?,
                })
            })
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| CartoError::Storage(e.to_string()))
    }

    /// Breadth-first dependency traversal from a node id.
    ///
    /// Walks up to `max_depth` hops along stored edges, outgoing, incoming,
    /// or both. Dangling targets are reported with `None` metadata rather
    /// than dropped; a visited set keeps cycles from looping.
    pub fn dependencies(
        &self,
        project: &str,
        start_id: &str,
        max_depth: usize,
        direction: Direction,
    ) -> Result<Vec<DependencyEntry>, CartoError> {
        let conn = self.conn();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start_id.to_string());
        let mut frontier: VecDeque<(String, usize)> = VecDeque::new();
        frontier.push_back((start_id.to_string(), 0));
        let mut entries = Vec::new();

        while let Some((id, depth)) = frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let next_depth = depth + 1;

            if matches!(direction, Direction::Outgoing | Direction::Both) {
                let mut stmt = conn
                    .prepare(
                        "SELECT e.to_id, e.kind, n.kind, n.name, n.file_path
                         FROM code_edges e
                         LEFT JOIN code_nodes n
                           ON n.id = e.to_id AND n.project = e.project
                         WHERE e.project = ?1 AND e.from_id = ?2",
                    )
                    .map_err(|e| CartoError::Storage(e.to_string()))?;
                let rows = stmt
                    .query_map(params![project, id], |row| {
                        Ok(DependencyEntry {
                            id: row.get(0)?,
                            relation: row.get(1)?,
                            kind: row.get(2)?,
                            name: row.get(3)?,
                            file_path: row.get(4)?,
                            direction: Direction::Outgoing,
                            depth: next_depth,
                        })
                    })
                    .map_err(|e| CartoError::Storage(e.to_string()))?;
                for entry in rows {
                    let entry = entry.map_err(|e| CartoError::Storage(e.to_string()))?;
                    if visited.insert(entry.id.clone()) {
                        frontier.push_back((entry.id.clone(), next_depth));
                        entries.push(entry);
                    }
                }
            }

            if matches!(direction, Direction::Incoming | Direction::Both) {
                let mut stmt = conn
                    .prepare(
                        "SELECT e.from_id, e.kind, n.kind, n.name, n.file_path
                         FROM code_edges e
                         LEFT JOIN code_nodes n
                           ON n.id = e.from_id AND n.project = e.project
                         WHERE e.project = ?1 AND e.to_id = ?2",
                    )
                    .map_err(|e| CartoError::Storage(e.to_string()))?;
                let rows = stmt
                    .query_map(params![project, id], |row| {
                        Ok(DependencyEntry {
                            id: row.get(0)?,
                            relation: row.get(1)?,
                            kind: row.get(2)?,
                            name: row.get(3)?,
                            file_path: row.get(4)?,
                            direction: Direction::Incoming,
                            depth: next_depth,
                        })
                    })
                    .map_err(|e| CartoError::Storage(e.to_string()))?;
                for entry in rows {
                    let entry = entry.map_err(|e| CartoError::Storage(e.to_string()))?;
                    if visited.insert(entry.id.clone()) {
                        frontier.push_back((entry.id.clone(), next_depth));
                        entries.push(entry);
                    }
                }
            }
        }

        Ok(entries)
    }

    /// Structural summary of one file: its node plus everything it defines,
    /// bucketed by kind, with the file's recorded imports.
    ///
    /// Returns [`CartoError::NotFound`] when the file has no stored node.
    pub fn file_structure(
        &self,
        project: &str,
        file_path: &str,
    ) -> Result<FileStructure, CartoError> {
        let conn = self.conn();
        let file: Option<CodeNode> = conn
            .query_row(
                "SELECT * FROM code_nodes
                 WHERE project = ?1 AND file_path = ?2 AND kind = 'file'",
                params![project, file_path],
                node_from_row,
            )
            .optional()
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let file = file.ok_or_else(|| {
            CartoError::NotFound(format!("no file node for '{file_path}' in '{project}'"))
        })?;

        let mut structure = FileStructure {
            file: file.clone(),
            classes: Vec::new(),
            functions: Vec::new(),
            interfaces: Vec::new(),
            types: Vec::new(),
            constants: Vec::new(),
            imports: Vec::new(),
        };

        let mut stmt = conn
            .prepare(
                "SELECT * FROM code_nodes
                 WHERE project = ?1 AND file_path = ?2 AND kind != 'file'
                 ORDER BY line_start",
            )
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(params![project, file_path], node_from_row)
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        for node in rows {
            let node = node.map_err(|e| CartoError::Storage(e.to_string()))?;
            match node.kind.as_str() {
                "class" => structure.classes.push(node),
                "function" => structure.functions.push(node),
                "interface" => structure.interfaces.push(node),
                "type" => structure.types.push(node),
                "constant" => structure.constants.push(node),
                _ => {}
            }
        }

        let mut stmt = conn
            .prepare(
                "SELECT to_id, line_number FROM code_edges
                 WHERE project = ?1 AND from_id = ?2 AND kind = 'imports'
                 ORDER BY line_number",
            )
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(params![project, file.id], |row| {
                let to_id: String = row.get(0)?;
                let line: Option<i64> = row.get(1)?;
                Ok(ImportRef {
                    target: to_id
                        .strip_prefix("module.")
                        .unwrap_or(&to_id)
                        .to_string(),
                    line: line.map(|n| n as usize),
                })
            })
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        for import in rows {
            structure
                .imports
                .push(import.map_err(|e| CartoError::Storage(e.to_string()))?);
        }

        Ok(structure)
    }

    /// Aggregate counts for a project's graph.
    pub fn stats(&self, project: &str) -> Result<GraphStats, CartoError> {
        let conn = self.conn();
        let node_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM code_nodes WHERE project = ?1",
                params![project],
                |row| row.get(0),
            )
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let edge_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM code_edges WHERE project = ?1",
                params![project],
                |row| row.get(0),
            )
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let file_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM file_hashes WHERE project = ?1",
                params![project],
                |row| row.get(0),
            )
            .map_err(|e| CartoError::Storage(e.to_string()))?;

        let mut kinds = HashMap::new();
        let mut stmt = conn
            .prepare(
                "SELECT kind, COUNT(*) FROM code_nodes
                 WHERE project = ?1 GROUP BY kind",
            )
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(params![project], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        for row in rows {
            let (kind, count) = row.map_err(|e| CartoError::Storage(e.to_string()))?;
            kinds.insert(kind, count as usize);
        }

        let last_sync: Option<i64> = conn
            .query_row(
                "SELECT MAX(last_updated) FROM file_hashes WHERE project = ?1",
                params![project],
                |row| row.get(0),
            )
            .map_err(|e| CartoError::Storage(e.to_string()))?;

        Ok(GraphStats {
            node_count: node_count as usize,
            edge_count: edge_count as usize,
            file_count: file_count as usize,
            kinds,
            last_sync: last_sync.map(epoch_to_datetime),
        })
    }

    /// Project names present in the store, with their node counts.
    pub fn projects(&self) -> Result<Vec<(String, usize)>, CartoError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT project, COUNT(*) FROM code_nodes
                 GROUP BY project ORDER BY project",
            )
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| CartoError::Storage(e.to_string()))
    }
}

fn epoch_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
