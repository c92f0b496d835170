use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tabcore::{
    EventBus, RunError, RunEvent, RunId, RunState, Table, ToolContext, ToolId, WorkflowGraph,
    WorkflowId,
};
use tokio_util::sync::CancellationToken;

/// Runs a workflow graph one tool at a time, in execution order.
///
/// Each executor is awaited to completion before the next tool starts; the
/// first failing tool aborts the run.
pub struct WorkflowPipeline {
    reject_unreachable_tools: bool,
}

impl WorkflowPipeline {
    pub fn new(reject_unreachable_tools: bool) -> Self {
        Self {
            reject_unreachable_tools,
        }
    }

    /// Execute a workflow and return results
    pub async fn execute(
        &self,
        graph: &WorkflowGraph,
        event_bus: &EventBus,
        cancel: &CancellationToken,
    ) -> Result<RunOutput, RunError> {
        let run_id = RunId::new_v4();
        let start_time = Instant::now();

        event_bus.emit(RunEvent::RunStarted {
            run_id,
            workflow_id: graph.id(),
            timestamp: Utc::now(),
        });
        emit_state(event_bus, run_id, RunState::Pending);
        tracing::info!("Starting workflow run {} for {}", run_id, graph.id());

        let result = self.execute_ordered(graph, event_bus, run_id, cancel).await;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let state = if result.is_ok() {
            RunState::Completed
        } else {
            RunState::Failed
        };
        emit_state(event_bus, run_id, state);
        event_bus.emit(RunEvent::RunCompleted {
            run_id,
            success: result.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        match &result {
            Ok(output) => tracing::info!(
                "Workflow run {} completed {} tools in {}ms",
                run_id,
                output.results.len(),
                duration_ms
            ),
            Err(e) => tracing::error!("Workflow run {} failed [{}]: {}", run_id, e.code(), e),
        }

        result
    }

    async fn execute_ordered(
        &self,
        graph: &WorkflowGraph,
        event_bus: &EventBus,
        run_id: RunId,
        cancel: &CancellationToken,
    ) -> Result<RunOutput, RunError> {
        emit_state(event_bus, run_id, RunState::Ordering);
        let plan = graph
            .execution_plan()
            .map_err(|_| RunError::no_inputs(graph.id()))?;
        if self.reject_unreachable_tools && !plan.is_complete() {
            return Err(RunError::unreachable_tools(graph.id(), plan.omitted()));
        }

        emit_state(event_bus, run_id, RunState::Running);
        let mut output = RunOutput::new(run_id, graph.id());
        output.omitted = plan.omitted().to_vec();

        for tool_id in plan.order() {
            if cancel.is_cancelled() {
                tracing::warn!("Workflow run {} cancelled before tool {}", run_id, tool_id);
                return Err(RunError::cancelled(graph.id()));
            }

            let node = graph
                .tool(tool_id)
                .map_err(|e| RunError::Tool {
                    tool_id,
                    message: e.to_string(),
                    code: "tool_error".to_string(),
                })?;

            event_bus.emit(RunEvent::ToolStarted {
                run_id,
                tool_id,
                kind: node.kind(),
                timestamp: Utc::now(),
            });

            let mut ctx = ToolContext::new(tool_id, event_bus.create_emitter(run_id, tool_id));
            for input_id in node.inputs() {
                if let Some(table) = output.results.get(input_id) {
                    ctx = ctx.with_input(*input_id, Arc::clone(table));
                }
            }

            let start = Instant::now();
            let result = match graph.registry().create_executor(node) {
                Ok(executor) => executor.run(ctx).await,
                Err(e) => Err(e),
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(table) => {
                    let (rows, columns) = table.shape();
                    tracing::info!(
                        "Tool {} ({}) produced {}x{} in {}ms",
                        tool_id,
                        node.kind(),
                        rows,
                        columns,
                        duration_ms
                    );
                    event_bus.emit(RunEvent::ToolCompleted {
                        run_id,
                        tool_id,
                        rows,
                        columns,
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    output.order.push(tool_id);
                    output.results.insert(tool_id, Arc::new(table));
                }
                Err(e) => {
                    tracing::error!("Tool {} failed: {}", tool_id, e);
                    event_bus.emit(RunEvent::ToolFailed {
                        run_id,
                        tool_id,
                        code: e.code().to_string(),
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(RunError::tool(tool_id, &e));
                }
            }
        }

        Ok(output)
    }
}

impl Default for WorkflowPipeline {
    fn default() -> Self {
        Self::new(false)
    }
}

fn emit_state(event_bus: &EventBus, run_id: RunId, state: RunState) {
    event_bus.emit(RunEvent::StateChanged {
        run_id,
        state,
        timestamp: Utc::now(),
    });
}

/// Result set of a successful run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_id: RunId,
    pub workflow_id: WorkflowId,

    /// Tools in the order they ran.
    pub order: Vec<ToolId>,

    /// Tools left out of the execution order.
    pub omitted: Vec<ToolId>,

    pub results: BTreeMap<ToolId, Arc<Table>>,
}

impl RunOutput {
    fn new(run_id: RunId, workflow_id: WorkflowId) -> Self {
        Self {
            run_id,
            workflow_id,
            order: Vec::new(),
            omitted: Vec::new(),
            results: BTreeMap::new(),
        }
    }

    pub fn result(&self, tool_id: ToolId) -> Option<&Table> {
        self.results.get(&tool_id).map(Arc::as_ref)
    }

    /// Per-tool results sorted by tool id.
    pub fn outputs(&self) -> Vec<ToolOutput<'_>> {
        self.results
            .iter()
            .map(|(tool_id, data)| ToolOutput {
                tool_id: *tool_id,
                data: data.as_ref(),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ToolOutput<'a> {
    pub tool_id: ToolId,
    pub data: &'a Table,
}
