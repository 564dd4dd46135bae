use std::path::Path;

use anyhow::{Context, Result};
use kgviz_models::{LinkRecord, NodeRecord};
use serde::Deserialize;

/// Contents of an import file; both arrays must be present.
#[derive(Debug, Deserialize)]
pub struct GraphFile {
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

pub fn read_graph_file(path: &Path) -> Result<GraphFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Error reading file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| {
        format!(
            "Invalid data format in {}. Expected {{\"nodes\": [...], \"links\": [...]}}",
            path.display()
        )
    })
}
