use crate::{RunOutput, WorkflowPipeline};
use std::collections::HashMap;
use std::sync::Arc;
use tabcore::{EventBus, RunError, RunEvent, ToolRegistry, WorkflowGraph, WorkflowId};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Main runtime for executing workflows
///
/// Every registered graph sits behind its own lock, so a run and a mutation
/// of the same workflow never overlap while distinct workflows stay
/// independent.
pub struct Runtime {
    registry: Arc<ToolRegistry>,
    pipeline: WorkflowPipeline,
    event_bus: Arc<EventBus>,
    workflows: RwLock<HashMap<WorkflowId, Arc<Mutex<WorkflowGraph>>>>,
}

impl Runtime {
    /// Create a new runtime with a pre-configured registry
    pub fn new(registry: Arc<ToolRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            pipeline: WorkflowPipeline::new(config.reject_unreachable_tools),
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
            workflows: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Empty graph bound to this runtime's registry
    pub fn new_workflow(&self) -> WorkflowGraph {
        WorkflowGraph::new(Arc::clone(&self.registry))
    }

    /// Register a workflow, replacing any graph with the same id
    pub async fn register_workflow(&self, graph: WorkflowGraph) -> Arc<Mutex<WorkflowGraph>> {
        let id = graph.id();
        let handle = Arc::new(Mutex::new(graph));
        self.workflows.write().await.insert(id, Arc::clone(&handle));
        tracing::debug!("Registered workflow {}", id);
        handle
    }

    pub async fn workflow(&self, workflow_id: WorkflowId) -> Option<Arc<Mutex<WorkflowGraph>>> {
        self.workflows.read().await.get(&workflow_id).cloned()
    }

    pub async fn remove_workflow(&self, workflow_id: WorkflowId) -> bool {
        self.workflows.write().await.remove(&workflow_id).is_some()
    }

    pub async fn workflow_ids(&self) -> Vec<WorkflowId> {
        self.workflows.read().await.keys().copied().collect()
    }

    /// Execute a registered workflow by ID
    pub async fn execute_workflow(&self, workflow_id: WorkflowId) -> Result<RunOutput, RunError> {
        self.execute_workflow_with_cancel(workflow_id, CancellationToken::new())
            .await
    }

    /// Like [`Self::execute_workflow`], stopping between tools once `cancel` fires
    pub async fn execute_workflow_with_cancel(
        &self,
        workflow_id: WorkflowId,
        cancel: CancellationToken,
    ) -> Result<RunOutput, RunError> {
        let handle = self
            .workflow(workflow_id)
            .await
            .ok_or_else(|| RunError::not_found(workflow_id))?;
        let graph = handle.lock().await;
        self.pipeline.execute(&graph, &self.event_bus, &cancel).await
    }

    /// Execute a workflow directly (without registration)
    pub async fn execute(
        &self,
        graph: &WorkflowGraph,
        cancel: &CancellationToken,
    ) -> Result<RunOutput, RunError> {
        self.pipeline.execute(graph, &self.event_bus, cancel).await
    }

    /// Subscribe to run events
    pub fn subscribe_events(&self) -> broadcast::Receiver<RunEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,

    /// Fail runs whose execution order leaves tools out instead of running
    /// the reachable part.
    pub reject_unreachable_tools: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            reject_unreachable_tools: false,
        }
    }
}
