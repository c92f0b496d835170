//! Core abstractions for the tabular workflow engine
//!
//! This crate provides the workflow graph, its execution ordering, the tool
//! registry and the tabular data model that all other crates build on. It
//! performs no I/O.

mod config;
mod error;
pub mod events;
mod node;
mod ordering;
mod registry;
mod table;
mod tool;
mod value;
mod workflow;

pub use config::{
    issues_from, ConcatDataConfig, ConfigIssue, DescribeDataConfig, DescribeMode, InputUrlConfig,
    JoinDataConfig, JoinHow, ToolConfig, ToolKind,
};
pub use error::{GraphError, RunError, TableError, ToolError};
pub use events::*;
pub use node::{Coordinates, Diagnostics, ToolId, ToolNode, MAX_CANVAS_SIZE, ROOT_ID};
pub use ordering::ExecutionPlan;
pub use registry::{FieldDefinition, ToolFactory, ToolMetadata, ToolRegistry};
pub use table::{ColumnKind, Table};
pub use tool::{ToolContext, ToolExecutor};
pub use value::Value;
pub use workflow::{NewTool, ToolRecord, WorkflowGraph, WorkflowId};
