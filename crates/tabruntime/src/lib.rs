//! Workflow execution runtime
//!
//! This crate provides the pipeline that runs a workflow graph tool by tool,
//! the runtime facade holding registered workflows, and the snapshot loader.

mod executor;
mod loader;
mod runtime;

pub use executor::{RunOutput, ToolOutput, WorkflowPipeline};
pub use loader::{LoadError, WorkflowSnapshot};
pub use runtime::{Runtime, RuntimeConfig};
