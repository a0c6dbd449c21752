//! The graph merge engine: reconciles one walk batch with persistent state.
//!
//! All mutations for a sync run happen inside a single transaction. The
//! critical invariant is edge replacement: before inserting a reprocessed
//! file's edges, every previously stored edge originating from one of that
//! file's nodes (old or new) is deleted, so stale relationships cannot
//! outlive the source that produced them. Skipped files' edges are left
//! untouched. Ownership is by exact node id, never by path pattern: a path
//! that is a suffix of another (`config.ts` vs `webpack.config.ts`) must not
//! reach into the other file's edges.

use crate::Store;
use carto_core::{CartoError, CodeEdge, CodeNode, MergeStats, WalkResult};
use rusqlite::{params, Transaction};
use std::collections::{HashMap, HashSet};

impl Store {
    /// Apply one walk batch to the store for `project`.
    ///
    /// With `full_rebuild` set, all existing nodes/edges/hash records for the
    /// project are cleared first (inside the same transaction), so
    /// declarations removed from source do not linger as orphans.
    ///
    /// Commits as a single unit; any storage error rolls the whole batch
    /// back and propagates.
    pub fn apply_batch(
        &self,
        project: &str,
        batch: &WalkResult,
        full_rebuild: bool,
    ) -> Result<MergeStats, CartoError> {
        let conn = self.conn();
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| CartoError::Storage(e.to_string()))?;

        let mut stats = MergeStats::default();

        if full_rebuild {
            clear_project_tx(&tx, project)?;
        }

        // Every node carries the relative path of the file that produced it,
        // so the reprocessed-file set is derivable from the batch itself.
        let mut nodes_by_file: HashMap<&str, Vec<&CodeNode>> = HashMap::new();
        for node in &batch.nodes {
            nodes_by_file.entry(&node.file_path).or_default().push(node);
        }

        // Per reprocessed file: diff out disappeared declarations, then
        // delete every edge owned by the file's nodes (old ids included, so
        // a removed declaration's edges go too). Ownership is exact id
        // membership.
        for (file_path, nodes) in &nodes_by_file {
            let existing = existing_node_ids(&tx, project, file_path)?;
            let fresh_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

            if !full_rebuild {
                for id in &existing {
                    if !fresh_ids.contains(id.as_str()) {
                        stats.nodes_removed += tx
                            .execute(
                                "DELETE FROM code_nodes WHERE project = ?1 AND id = ?2",
                                params![project, id],
                            )
                            .map_err(|e| CartoError::Storage(e.to_string()))?;
                    }
                }
            }

            let owned: HashSet<&str> = existing
                .iter()
                .map(String::as_str)
                .chain(fresh_ids.iter().copied())
                .collect();
            for id in owned {
                tx.execute(
                    "DELETE FROM code_edges WHERE project = ?1 AND from_id = ?2",
                    params![project, id],
                )
                .map_err(|e| CartoError::Storage(e.to_string()))?;
            }
        }

        for node in &batch.nodes {
            if upsert_node(&tx, project, node)? {
                stats.nodes_added += 1;
            } else {
                stats.nodes_updated += 1;
            }
        }

        for edge in &batch.edges {
            stats.edges_added += insert_edge(&tx, project, edge)?;
        }

        upsert_hash_records(&tx, project, batch, &nodes_by_file)?;

        tx.commit().map_err(|e| CartoError::Storage(e.to_string()))?;

        tracing::info!(
            project,
            nodes_added = stats.nodes_added,
            nodes_updated = stats.nodes_updated,
            nodes_removed = stats.nodes_removed,
            edges_added = stats.edges_added,
            "merged walk batch"
        );

        Ok(stats)
    }

    /// Delete all graph state for a project. Returns the deleted node count.
    pub fn clear_project(&self, project: &str) -> Result<usize, CartoError> {
        let conn = self.conn();
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| CartoError::Storage(e.to_string()))?;
        let removed = clear_project_tx(&tx, project)?;
        tx.commit().map_err(|e| CartoError::Storage(e.to_string()))?;
        Ok(removed)
    }
}

fn clear_project_tx(tx: &Transaction<'_>, project: &str) -> Result<usize, CartoError> {
    let removed = tx
        .execute("DELETE FROM code_nodes WHERE project = ?1", params![project])
        .map_err(|e| CartoError::Storage(e.to_string()))?;
    tx.execute("DELETE FROM code_edges WHERE project = ?1", params![project])
        .map_err(|e| CartoError::Storage(e.to_string()))?;
    tx.execute("DELETE FROM file_hashes WHERE project = ?1", params![project])
        .map_err(|e| CartoError::Storage(e.to_string()))?;
    Ok(removed)
}

/// Upsert one node by `(id, project)`. Returns true when the row was new.
fn upsert_node(tx: &Transaction<'_>, project: &str, node: &CodeNode) -> Result<bool, CartoError> {
    let existed: bool = tx
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM code_nodes WHERE id = ?1 AND project = ?2)",
            params![node.id, project],
            |row| row.get(0),
        )
        .map_err(|e| CartoError::Storage(e.to_string()))?;

    let now = chrono::Utc::now().timestamp();
    tx.execute(
        "INSERT INTO code_nodes
         (id, project, kind, name, file_path, line_start, line_end,
          signature, language, visibility, hash, created_at, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
         ON CONFLICT(id, project) DO UPDATE SET
             kind = excluded.kind,
             name = excluded.name,
             file_path = excluded.file_path,
             line_start = excluded.line_start,
             line_end = excluded.line_end,
             signature = excluded.signature,
             language = excluded.language,
             visibility = excluded.visibility,
             hash = excluded.hash,
             last_updated = excluded.last_updated",
        params![
            node.id,
            project,
            node.kind,
            node.name,
            node.file_path,
            node.line_start as i64,
            node.line_end as i64,
            node.signature,
            node.language,
            node.visibility.map(|v| v.to_string()),
            node.hash,
            now,
        ],
    )
    .map_err(|e| CartoError::Storage(e.to_string()))?;

    Ok(!existed)
}

/// Stored node ids for one file of a project.
fn existing_node_ids(
    tx: &Transaction<'_>,
    project: &str,
    file_path: &str,
) -> Result<Vec<String>, CartoError> {
    let mut stmt = tx
        .prepare("SELECT id FROM code_nodes WHERE project = ?1 AND file_path = ?2")
        .map_err(|e| CartoError::Storage(e.to_string()))?;
    let rows = stmt
        .query_map(params![project, file_path], |row| row.get(0))
        .map_err(|e| CartoError::Storage(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| CartoError::Storage(e.to_string()))
}

/// Insert one edge, ignoring exact `(from_id, to_id, kind)` duplicates.
/// Returns 1 when a row was actually inserted.
fn insert_edge(tx: &Transaction<'_>, project: &str, edge: &CodeEdge) -> Result<usize, CartoError> {
    tx.execute(
        "INSERT OR IGNORE INTO code_edges
         (project, from_id, to_id, kind, line_number, confidence)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            project,
            edge.from_id,
            edge.to_id,
            edge.kind,
            edge.line_number.map(|n| n as i64),
            edge.confidence,
        ],
    )
    .map_err(|e| CartoError::Storage(e.to_string()))
}

/// Upsert hash records for every file in the walk result. Processed files
/// get fresh advisory node/edge counts; skipped files only refresh hash and
/// timestamp so their counts survive.
fn upsert_hash_records(
    tx: &Transaction<'_>,
    project: &str,
    batch: &WalkResult,
    nodes_by_file: &HashMap<&str, Vec<&CodeNode>>,
) -> Result<(), CartoError> {
    let mut edges_by_file: HashMap<&str, usize> = HashMap::new();
    for (file_path, nodes) in nodes_by_file {
        let prefixes: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        let count = batch
            .edges
            .iter()
            .filter(|e| prefixes.iter().any(|id| *id == e.from_id))
            .count();
        edges_by_file.insert(*file_path, count);
    }

    let now = chrono::Utc::now().timestamp();
    for (file_path, hash) in &batch.new_hashes {
        match nodes_by_file.get(file_path.as_str()) {
            Some(nodes) => {
                let edge_count = edges_by_file.get(file_path.as_str()).copied().unwrap_or(0);
                tx.execute(
                    "INSERT INTO file_hashes
                     (project, file_path, hash, node_count, edge_count, last_updated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(project, file_path) DO UPDATE SET
                         hash = excluded.hash,
                         node_count = excluded.node_count,
                         edge_count = excluded.edge_count,
                         last_updated = excluded.last_updated",
                    params![project, file_path, hash, nodes.len() as i64, edge_count as i64, now],
                )
                .map_err(|e| CartoError::Storage(e.to_string()))?;
            }
            None => {
                // Skipped file: hash is unchanged; keep prior counts.
                tx.execute(
                    "INSERT INTO file_hashes
                     (project, file_path, hash, node_count, edge_count, last_updated)
                     VALUES (?1, ?2, ?3, 0, 0, ?4)
                     ON CONFLICT(project, file_path) DO UPDATE SET
                         hash = excluded.hash,
                         last_updated = excluded.last_updated",
                    params![project, file_path, hash, now],
                )
                .map_err(|e| CartoError::Storage(e.to_string()))?;
            }
        }
    }
    Ok(())
}
