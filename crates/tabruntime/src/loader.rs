use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tabcore::{GraphError, ToolRecord, ToolRegistry, WorkflowGraph, WorkflowId};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid workflow snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid workflow graph: {0}")]
    Graph(#[from] GraphError),
}

/// Persisted state of one workflow, as handed over by a storage layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    #[serde(default = "Uuid::new_v4")]
    pub id: WorkflowId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub tools: Vec<ToolRecord>,
}

impl WorkflowSnapshot {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LoadError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let snapshot = Self::from_json(&text)?;
        tracing::debug!(
            "Loaded snapshot '{}' ({} tools) from {}",
            snapshot.name,
            snapshot.tools.len(),
            path.display()
        );
        Ok(snapshot)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, text)
            .await
            .map_err(|source| LoadError::Io {
                path: path.display().to_string(),
                source,
            })
    }

    /// Rebuilds the graph, keeping record ids and per-tool diagnostics.
    pub fn into_graph(self, registry: Arc<ToolRegistry>) -> Result<WorkflowGraph, LoadError> {
        Ok(WorkflowGraph::from_records(self.id, registry, &self.tools)?)
    }
}
