//! Query & maintenance commands.

use carto_core::{CodeNode, Direction};
use carto_storage::Store;

pub(crate) fn cmd_nodes(
    store: &Store,
    project: &str,
    kind: Option<&str>,
    file: Option<&str>,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let nodes = store.nodes(project, kind, file, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    if nodes.is_empty() {
        println!("No nodes found");
        return Ok(());
    }
    for node in &nodes {
        let vis = node
            .visibility
            .map(|v| format!(" [{v}]"))
            .unwrap_or_default();
        println!(
            "  [{}] {} ({}:{}-{}){}",
            node.kind, node.name, node.file_path, node.line_start, node.line_end, vis
        );
    }
    println!("\n{} node(s)", nodes.len());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_edges(
    store: &Store,
    project: &str,
    from: Option<&str>,
    to: Option<&str>,
    kind: Option<&str>,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let edges = store.edges(project, from, to, kind, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&edges)?);
        return Ok(());
    }

    if edges.is_empty() {
        println!("No edges found");
        return Ok(());
    }
    for edge in &edges {
        let line = edge
            .line_number
            .map(|n| format!(" (line {n})"))
            .unwrap_or_default();
        println!(
            "  {} --{}--> {} [{:.1}]{}",
            edge.from_id, edge.kind, edge.to_id, edge.confidence, line
        );
    }
    println!("\n{} edge(s)", edges.len());
    Ok(())
}

pub(crate) fn cmd_deps(
    store: &Store,
    project: &str,
    node_id: &str,
    depth: usize,
    direction: &str,
) -> anyhow::Result<()> {
    let direction: Direction = direction.parse()?;
    let deps = store.dependencies(project, node_id, depth, direction)?;

    if deps.is_empty() {
        println!("No dependencies found for {node_id}");
        return Ok(());
    }

    println!("Dependencies of {node_id} ({direction}, depth {depth}):\n");
    for dep in &deps {
        let arrow = match dep.direction {
            Direction::Outgoing => "->",
            _ => "<-",
        };
        let label = match (&dep.name, &dep.file_path) {
            (Some(name), Some(path)) => format!("{name} ({path})"),
            _ => "(external)".to_string(),
        };
        println!(
            "  {}{arrow} [{}] {} {label}",
            "  ".repeat(dep.depth - 1),
            dep.relation,
            dep.id
        );
    }
    println!("\n{} node(s) reached", deps.len());
    Ok(())
}

pub(crate) fn cmd_structure(
    store: &Store,
    project: &str,
    file: &str,
    json: bool,
) -> anyhow::Result<()> {
    let structure = store.file_structure(project, file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&structure)?);
        return Ok(());
    }

    println!("# {}", structure.file.file_path);
    if let Some(language) = &structure.file.language {
        println!("\nLanguage: {language}");
    }

    if !structure.imports.is_empty() {
        println!("\n## Imports ({})", structure.imports.len());
        for import in &structure.imports {
            let line = import
                .line
                .map(|n| format!(" (line {n})"))
                .unwrap_or_default();
            println!("- {}{line}", import.target);
        }
    }

    print_section("Classes", &structure.classes);
    print_section("Interfaces", &structure.interfaces);
    print_section("Functions", &structure.functions);
    print_section("Types", &structure.types);
    print_section("Constants", &structure.constants);
    Ok(())
}

fn print_section(title: &str, nodes: &[CodeNode]) {
    if nodes.is_empty() {
        return;
    }
    println!("\n## {title} ({})", nodes.len());
    for node in nodes {
        let vis = node
            .visibility
            .map(|v| format!(" [{v}]"))
            .unwrap_or_default();
        println!("- {} (lines {}-{}){vis}", node.name, node.line_start, node.line_end);
    }
}

pub(crate) fn cmd_stats(store: &Store, project: Option<&str>) -> anyhow::Result<()> {
    match project {
        Some(project) => {
            let stats = store.stats(project)?;
            println!("Project '{project}'");
            println!("  nodes: {}", stats.node_count);
            println!("  edges: {}", stats.edge_count);
            println!("  files: {}", stats.file_count);
            if !stats.kinds.is_empty() {
                let mut kinds: Vec<_> = stats.kinds.iter().collect();
                kinds.sort();
                println!("  by kind:");
                for (kind, count) in kinds {
                    println!("    {kind}: {count}");
                }
            }
            match stats.last_sync {
                Some(ts) => println!("  last sync: {}", ts.format("%Y-%m-%d %H:%M:%S UTC")),
                None => println!("  last sync: never"),
            }
        }
        None => {
            let projects = store.projects()?;
            if projects.is_empty() {
                println!("No projects in the graph");
                return Ok(());
            }
            for (name, node_count) in projects {
                println!("  {name}: {node_count} node(s)");
            }
        }
    }
    Ok(())
}

pub(crate) fn cmd_clear(store: &Store, project: &str) -> anyhow::Result<()> {
    let removed = store.clear_project(project)?;
    println!("Cleared project '{project}' ({removed} node(s) removed)");
    Ok(())
}

pub(crate) fn cmd_languages() {
    println!("Supported languages:");
    for extractor in carto_index::languages::EXTRACTORS {
        println!(
            "  {} (.{})",
            extractor.language(),
            extractor.extensions().join(", .")
        );
    }
}
