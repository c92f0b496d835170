use crate::{ToolId, WorkflowId};
use serde::Serialize;
use thiserror::Error;

/// Structural failures raised by graph mutations and ordering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Requested tool is not implemented: {0}")]
    ToolNotAvailable(String),

    #[error("Unknown tool type: {0}")]
    UnknownToolType(String),

    #[error("Provided tool does not exist: {0}")]
    ToolDoesNotExist(ToolId),

    #[error("Root tool cannot be deleted.")]
    RootCannotBeDeleted,

    #[error("Root tool cannot be configured.")]
    RootNotConfigurable,

    #[error("Coordinates need to be a pair of integers: {0}")]
    InvalidCoordinates(String),

    #[error("Both coordinates must fall in the [0, {max}] range, got ({x}, {y}).")]
    CoordinatesOutOfRange { x: i64, y: i64, max: i64 },

    #[error("Duplicate tool id in records: {0}")]
    DuplicateToolId(ToolId),

    #[error("No tool ids left to allocate.")]
    IdSpaceExhausted,

    #[error("Workflow cannot be run without at least one zero-input tool.")]
    NoInputsAvailable,
}

/// Failures reported by a tool executor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool is missing input to process.")]
    MissingInput,

    #[error("Tool has no configuration.")]
    MissingConfig,

    #[error("Failed to load data: {0}")]
    Load(String),

    #[error("{message}")]
    Processing { code: String, message: String },
}

impl ToolError {
    pub fn processing(code: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::Processing {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Machine-readable code for the API layer.
    pub fn code(&self) -> &str {
        match self {
            ToolError::MissingInput => "missing_input",
            ToolError::MissingConfig => "missing_config",
            ToolError::Load(_) => "load_error",
            ToolError::Processing { code, .. } => code,
        }
    }
}

impl From<TableError> for ToolError {
    fn from(err: TableError) -> Self {
        ToolError::Load(err.to_string())
    }
}

/// Errors produced while parsing delimited text into a table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("No header row found")]
    MissingHeader,

    #[error("Row {line} has {found} fields, expected {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unterminated quoted field on line {0}")]
    UnterminatedQuote(usize),
}

/// Fatal outcome of a pipeline run, attributed to a workflow or a tool.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunError {
    #[error("Workflow {workflow_id}: {message}")]
    Workflow {
        workflow_id: WorkflowId,
        message: String,
        code: String,
    },

    #[error("Tool {tool_id}: {message}")]
    Tool {
        tool_id: ToolId,
        message: String,
        code: String,
    },
}

impl RunError {
    pub fn no_inputs(workflow_id: WorkflowId) -> Self {
        RunError::Workflow {
            workflow_id,
            message: "Workflow cannot be run without any input files.".to_string(),
            code: "workflow_no_inputs".to_string(),
        }
    }

    pub fn unreachable_tools(workflow_id: WorkflowId, omitted: &[ToolId]) -> Self {
        RunError::Workflow {
            workflow_id,
            message: format!("Tools {:?} cannot be reached from any zero-input tool.", omitted),
            code: "workflow_unreachable_tools".to_string(),
        }
    }

    pub fn not_found(workflow_id: WorkflowId) -> Self {
        RunError::Workflow {
            workflow_id,
            message: "Workflow not found.".to_string(),
            code: "workflow_not_found".to_string(),
        }
    }

    pub fn cancelled(workflow_id: WorkflowId) -> Self {
        RunError::Workflow {
            workflow_id,
            message: "Workflow run was cancelled.".to_string(),
            code: "run_cancelled".to_string(),
        }
    }

    pub fn tool(tool_id: ToolId, err: &ToolError) -> Self {
        RunError::Tool {
            tool_id,
            message: err.to_string(),
            code: err.code().to_string(),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            RunError::Workflow { code, .. } | RunError::Tool { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RunError::Workflow { message, .. } | RunError::Tool { message, .. } => message,
        }
    }
}
