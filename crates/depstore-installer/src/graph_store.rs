use anyhow::{Context, Result};
use depstore_core::Graph;
use std::fs;
use std::io;

use crate::fs_utils::write_atomically;
use crate::layout::absolute_project_dir;
use crate::ProjectLayout;

/// Reads the project's dependency graph. A project that was never installed
/// has no graph file and loads as an empty graph.
///
/// Older graphs keyed the project entry by the absolute project directory;
/// that entry is folded into the canonical root entry here and nowhere else.
pub fn load_graph(layout: &ProjectLayout) -> Result<Graph> {
    let path = layout.graph_path();
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Graph::new()),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read dependency graph: {}", path.display()));
        }
    };

    let mut graph = Graph::from_json_str(&raw)
        .with_context(|| format!("failed to parse dependency graph: {}", path.display()))?;
    let legacy_key = absolute_project_dir(layout.root())?
        .display()
        .to_string();
    if graph.normalize_root_key(&legacy_key) {
        tracing::debug!(
            path = %path.display(),
            legacy_key = %legacy_key,
            "normalized legacy project entry in dependency graph"
        );
    }
    Ok(graph)
}

/// Persists the graph. The rename onto the final path is the commit point.
pub fn save_graph(layout: &ProjectLayout, graph: &Graph) -> Result<()> {
    let path = layout.graph_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let payload = graph.to_json_string()?;
    write_atomically(&path, payload.as_bytes())
        .with_context(|| format!("failed to write dependency graph: {}", path.display()))
}
