//! carto-cli: CLI entry point for the carto code graph.

mod commands_query;
mod commands_sync;

use carto_core::CartoConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "carto",
    about = "Code structure graph extractor with incremental SQLite sync"
)]
#[command(version, propagate_version = true)]
struct Cli {
    /// Database file (overrides the configured path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a directory tree and merge it into the graph
    Sync {
        /// Project name the graph is stored under
        project: String,

        /// Directory to sync (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Rebuild from scratch instead of skipping unchanged files
        #[arg(long)]
        full: bool,
    },

    /// List code nodes
    Nodes {
        project: String,

        /// Filter by node kind (function, class, ...)
        #[arg(short, long)]
        kind: Option<String>,

        /// Filter by file path
        #[arg(short, long)]
        file: Option<String>,

        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List code edges
    Edges {
        project: String,

        /// Filter by source node id
        #[arg(long)]
        from: Option<String>,

        /// Filter by target node id
        #[arg(long)]
        to: Option<String>,

        /// Filter by edge kind (imports, defines, ...)
        #[arg(short, long)]
        kind: Option<String>,

        #[arg(short, long, default_value = "50")]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Traverse dependencies from a node
    Deps {
        project: String,

        /// Starting node id, e.g. file.src/auth.ts
        node_id: String,

        /// Maximum traversal depth
        #[arg(short, long, default_value = "1")]
        depth: usize,

        /// Traversal direction: outgoing, incoming, or both
        #[arg(long, default_value = "outgoing")]
        direction: String,
    },

    /// Summarize the structure of one file
    Structure {
        project: String,

        /// Root-relative file path
        file: String,

        #[arg(long)]
        json: bool,
    },

    /// Show graph statistics (all projects when none is given)
    Stats {
        project: Option<String>,
    },

    /// Delete all graph data for a project
    Clear {
        project: String,
    },

    /// List supported languages and extensions
    Languages,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("carto=info".parse().expect("valid tracing directive")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = CartoConfig::load_or_default();

    match cli.command {
        Commands::Sync {
            project,
            path,
            full,
        } => {
            let root = match path {
                Some(p) => p,
                None => std::env::current_dir()?,
            };
            let store = open_store(cli.db.as_deref(), &config)?;
            commands_sync::cmd_sync(&store, &config, &project, &root, full)?;
        }
        Commands::Nodes {
            project,
            kind,
            file,
            limit,
            json,
        } => {
            let store = open_store(cli.db.as_deref(), &config)?;
            commands_query::cmd_nodes(
                &store,
                &project,
                kind.as_deref(),
                file.as_deref(),
                limit,
                json,
            )?;
        }
        Commands::Edges {
            project,
            from,
            to,
            kind,
            limit,
            json,
        } => {
            let store = open_store(cli.db.as_deref(), &config)?;
            commands_query::cmd_edges(
                &store,
                &project,
                from.as_deref(),
                to.as_deref(),
                kind.as_deref(),
                limit,
                json,
            )?;
        }
        Commands::Deps {
            project,
            node_id,
            depth,
            direction,
        } => {
            let store = open_store(cli.db.as_deref(), &config)?;
            commands_query::cmd_deps(&store, &project, &node_id, depth, &direction)?;
        }
        Commands::Structure {
            project,
            file,
            json,
        } => {
            let store = open_store(cli.db.as_deref(), &config)?;
            commands_query::cmd_structure(&store, &project, &file, json)?;
        }
        Commands::Stats { project } => {
            let store = open_store(cli.db.as_deref(), &config)?;
            commands_query::cmd_stats(&store, project.as_deref())?;
        }
        Commands::Clear { project } => {
            let store = open_store(cli.db.as_deref(), &config)?;
            commands_query::cmd_clear(&store, &project)?;
        }
        Commands::Languages => {
            commands_query::cmd_languages();
        }
    }

    Ok(())
}

// ── Helpers (shared across modules) ────────────────────────────────────────

/// Open the store at the `--db` override or the configured path, creating
/// parent directories as needed.
fn open_store(
    db_override: Option<&std::path::Path>,
    config: &CartoConfig,
) -> anyhow::Result<carto_storage::Store> {
    let path = match db_override {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(&config.storage.db_path),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(carto_storage::Store::open_with(
        &path,
        config.storage.cache_size_mb,
        config.storage.busy_timeout_secs,
    )?)
}
