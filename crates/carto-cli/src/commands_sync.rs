//! Sync command.

use carto_core::CartoConfig;
use carto_index::SyncEngine;
use carto_storage::Store;
use std::path::Path;

pub(crate) fn cmd_sync(
    store: &Store,
    config: &CartoConfig,
    project: &str,
    root: &Path,
    full: bool,
) -> anyhow::Result<()> {
    let registry = config.kind_registry()?;
    let engine = SyncEngine::new(registry)
        .with_extra_ignored_dirs(config.index.extra_ignored_dirs.clone());

    let report = engine.sync(store, project, root, !full)?;

    let mode = if full { "full" } else { "incremental" };
    println!(
        "Synced {} into '{}' ({} mode)",
        root.display(),
        project,
        mode
    );
    println!(
        "  files: {} processed, {} skipped",
        report.files_processed, report.files_skipped
    );
    println!(
        "  nodes: {} added, {} updated, {} removed",
        report.nodes_added, report.nodes_updated, report.nodes_removed
    );
    println!("  edges: {} added", report.edges_added);

    if !report.errors.is_empty() {
        println!("  {} file(s) failed:", report.errors.len());
        for error in &report.errors {
            println!("    {error}");
        }
    }

    Ok(())
}
