use crate::{events::EventEmitter, Table, ToolError, ToolId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-kind behavior that turns upstream tables into this tool's table.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn run(&self, ctx: ToolContext) -> Result<Table, ToolError>;
}

/// Execution context passed to each executor.
#[derive(Clone)]
pub struct ToolContext {
    pub tool_id: ToolId,

    /// Results of every declared input, keyed by input id.
    pub inputs: BTreeMap<ToolId, Arc<Table>>,

    pub events: EventEmitter,
}

impl ToolContext {
    pub fn new(tool_id: ToolId, events: EventEmitter) -> Self {
        Self {
            tool_id,
            inputs: BTreeMap::new(),
            events,
        }
    }

    pub fn with_input(mut self, input_id: ToolId, table: impl Into<Arc<Table>>) -> Self {
        self.inputs.insert(input_id, table.into());
        self
    }

    /// The only (or lowest-id) input, or `MissingInput`.
    pub fn first_input(&self) -> Result<&Table, ToolError> {
        self.inputs
            .values()
            .next()
            .map(Arc::as_ref)
            .ok_or(ToolError::MissingInput)
    }

    /// At least `n` inputs in ascending id order, or `MissingInput`.
    pub fn require_inputs(&self, n: usize) -> Result<Vec<&Table>, ToolError> {
        if self.inputs.len() < n {
            return Err(ToolError::MissingInput);
        }
        Ok(self.inputs.values().map(Arc::as_ref).collect())
    }
}
