//! Sync orchestration: walk, validate, merge.

use crate::walker::walk_directory;
use carto_core::{CartoError, KindRegistry, SyncReport};
use carto_storage::Store;
use std::collections::HashMap;
use std::path::Path;

/// Drives a sync run: walks a project tree and merges the extracted graph
/// into a [`Store`].
///
/// Kind validation happens here, at the boundary between extraction and
/// persistence: a batch containing an unregistered node or edge kind aborts
/// the run before anything is written.
pub struct SyncEngine {
    registry: KindRegistry,
    extra_ignored_dirs: Vec<String>,
}

impl SyncEngine {
    pub fn new(registry: KindRegistry) -> Self {
        Self {
            registry,
            extra_ignored_dirs: Vec::new(),
        }
    }

    /// Additional directory names to prune during walks, on top of the
    /// built-in set.
    pub fn with_extra_ignored_dirs(mut self, dirs: Vec<String>) -> Self {
        self.extra_ignored_dirs = dirs;
        self
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Sync `root` into the store under `project`.
    ///
    /// Incremental runs load the stored hash table first and skip unchanged
    /// files; the merge then only touches reprocessed files. A
    /// non-incremental run reprocesses everything and clears prior project
    /// state, so declarations from deleted files are reaped.
    ///
    /// Per-file extraction failures surface in the report's `errors`; the
    /// files that did extract are still committed.
    pub fn sync(
        &self,
        store: &Store,
        project: &str,
        root: &Path,
        incremental: bool,
    ) -> Result<SyncReport, CartoError> {
        let known_hashes = if incremental {
            store.file_hashes(project)?
        } else {
            HashMap::new()
        };

        tracing::info!(
            project,
            root = %root.display(),
            incremental,
            known_files = known_hashes.len(),
            "starting sync"
        );

        let walk = walk_directory(root, &known_hashes, incremental, &self.extra_ignored_dirs)?;

        for node in &walk.nodes {
            self.registry.validate_node_kind(&node.kind)?;
        }
        for edge in &walk.edges {
            self.registry.validate_edge_kind(&edge.kind)?;
        }

        let stats = store.apply_batch(project, &walk, !incremental)?;

        Ok(SyncReport {
            nodes_added: stats.nodes_added,
            nodes_updated: stats.nodes_updated,
            nodes_removed: stats.nodes_removed,
            edges_added: stats.edges_added,
            files_processed: walk.files_processed,
            files_skipped: walk.files_skipped,
            errors: walk.errors,
        })
    }
}
