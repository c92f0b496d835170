//! Standard tool library
//!
//! Built-in executors for loading, summarizing and combining tables.

mod concat;
mod describe;
mod input;
mod join;

pub use concat::{concat, ConcatDataFactory, ConcatDataTool};
pub use describe::{describe, DescribeDataFactory, DescribeDataTool, DESCRIBE_ERROR};
pub use input::{InputUrlFactory, InputUrlTool};
pub use join::{join, JoinDataFactory, JoinDataTool, JOIN_ERROR};
use tabcore::ToolRegistry;

use std::sync::Arc;

/// Register all standard tools with a registry
pub fn register_all(registry: &mut ToolRegistry) {
    registry.register(Arc::new(input::InputUrlFactory));
    registry.register(Arc::new(describe::DescribeDataFactory));
    registry.register(Arc::new(join::JoinDataFactory));
    registry.register(Arc::new(concat::ConcatDataFactory));
}

/// Registry holding every standard tool
pub fn default_registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_all(&mut registry);
    Arc::new(registry)
}
