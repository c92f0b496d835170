use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tabcore::{
    NewTool, RunError, RunEvent, RunState, Table, ToolConfig, ToolContext, ToolError,
    ToolExecutor, ToolFactory, ToolKind, ToolRegistry, Value, WorkflowGraph, WorkflowId,
};
use tabruntime::{Runtime, RuntimeConfig, WorkflowPipeline, WorkflowSnapshot};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

const SALES: &str = "region,units,price\nnorth,10,2.5\nsouth,4,3\nnorth,6,2.5\n";

fn csv_fixture(contents: &str) -> (NamedTempFile, String) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    let url = url_for(&file);
    (file, url)
}

fn url_for(file: &NamedTempFile) -> String {
    format!("file://{}", file.path().display())
}

fn runtime() -> Runtime {
    Runtime::new(tabtools::default_registry(), RuntimeConfig::default())
}

fn insert(graph: &mut WorkflowGraph, kind: &str, inputs: &[u64]) -> u64 {
    graph
        .insert_node(NewTool::new(kind).with_inputs(inputs.iter().copied()))
        .unwrap()
        .id()
}

fn input(graph: &mut WorkflowGraph, url: &str) -> u64 {
    let id = insert(graph, "input_url", &[]);
    graph.set_config(id, &json!({"url": url})).unwrap();
    assert!(graph.tool(id).unwrap().errors().is_empty());
    id
}

#[tokio::test]
async fn test_source_and_describe_produce_two_results() {
    let (_file, url) = csv_fixture(SALES);
    let runtime = runtime();
    let mut graph = runtime.new_workflow();
    let t1 = input(&mut graph, &url);
    let t2 = insert(&mut graph, "describe_data", &[t1]);

    let output = runtime
        .execute(&graph, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.order, [t1, t2]);
    assert_eq!(output.results.len(), 2);
    assert_eq!(output.result(t1).unwrap().shape(), (3, 3));

    let summary = output.result(t2).unwrap();
    assert_eq!(summary.columns(), ["units", "price"]);
    assert_eq!(summary.rows()[0], [Value::Float(3.0), Value::Float(3.0)]);

    let outputs = output.outputs();
    let ids: Vec<_> = outputs.iter().map(|o| o.tool_id).collect();
    assert_eq!(ids, [t1, t2]);

    let json = serde_json::to_value(&outputs).unwrap();
    assert_eq!(json[1]["data"]["index"][0], "count");
    assert_eq!(json[0]["data"]["columns"], json!(["region", "units", "price"]));
}

#[tokio::test]
async fn test_lonely_processing_tool_is_missing_input() {
    let runtime = runtime();
    let mut graph = runtime.new_workflow();
    let t1 = insert(&mut graph, "describe_data", &[]);

    let err = runtime
        .execute(&graph, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "missing_input");
    assert!(matches!(err, RunError::Tool { tool_id, .. } if tool_id == t1));
}

#[tokio::test]
async fn test_empty_workflow_has_no_inputs() {
    let runtime = runtime();
    let graph = runtime.new_workflow();

    let err = runtime
        .execute(&graph, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RunError::Workflow {
            workflow_id: graph.id(),
            message: "Workflow cannot be run without any input files.".to_string(),
            code: "workflow_no_inputs".to_string(),
        }
    );
}

#[tokio::test]
async fn test_fully_cyclic_workflow_has_no_inputs() {
    let runtime = runtime();
    let mut graph = runtime.new_workflow();
    let a = insert(&mut graph, "concat_data", &[]);
    let b = insert(&mut graph, "concat_data", &[a]);
    graph.add_input(a, [b]).unwrap();

    let err = runtime
        .execute(&graph, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "workflow_no_inputs");
}

#[tokio::test]
async fn test_failing_tool_aborts_remaining_order() {
    let (_file, url) = csv_fixture(SALES);
    let runtime = runtime();
    let mut graph = runtime.new_workflow();
    let t1 = input(&mut graph, &url);
    let t2 = insert(&mut graph, "describe_data", &[t1]);
    graph.set_config(t2, &json!({"data_type": 3})).unwrap();
    insert(&mut graph, "concat_data", &[t2]);

    let mut events = runtime.subscribe_events();
    let err = runtime
        .execute(&graph, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "describe_error");
    assert!(err.message().starts_with("Describe Tool could not process provided data."));
    assert!(matches!(err, RunError::Tool { tool_id, .. } if tool_id == t2));

    let mut started = Vec::new();
    let mut states = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            RunEvent::ToolStarted { tool_id, .. } => started.push(tool_id),
            RunEvent::StateChanged { state, .. } => states.push(state),
            _ => {}
        }
    }
    assert_eq!(started, [t1, t2]);
    assert_eq!(
        states,
        [RunState::Pending, RunState::Ordering, RunState::Running, RunState::Failed]
    );
}

#[tokio::test]
async fn test_join_and_concat_across_branches() {
    let (_orders, orders_url) = csv_fixture("id,customer\n1,7\n2,8\n");
    let (_customers, customers_url) = csv_fixture("customer,name\n7,ann\n8,bob\n");
    let runtime = runtime();
    let mut graph = runtime.new_workflow();
    let orders = input(&mut graph, &orders_url);
    let customers = input(&mut graph, &customers_url);
    let joined = insert(&mut graph, "join_data", &[orders, customers]);
    graph.set_config(joined, &json!({"on": "customer"})).unwrap();
    let stacked = insert(&mut graph, "concat_data", &[joined, orders]);

    let output = runtime
        .execute(&graph, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.result(joined).unwrap().columns(), ["id", "customer", "name"]);
    // Inputs stack in id order: the raw orders come before the joined rows.
    let stacked = output.result(stacked).unwrap();
    assert_eq!(stacked.shape(), (4, 3));
    assert_eq!(stacked.rows()[0][2], Value::Null);
    assert_eq!(stacked.rows()[3][2], Value::from("bob"));
}

#[tokio::test]
async fn test_unreachable_tools_are_skipped_or_rejected() {
    let (_file, url) = csv_fixture(SALES);
    let registry = tabtools::default_registry();
    let mut graph = WorkflowGraph::new(Arc::clone(&registry));
    let t1 = input(&mut graph, &url);
    let a = insert(&mut graph, "concat_data", &[t1]);
    let b = insert(&mut graph, "concat_data", &[a]);
    graph.add_input(a, [b]).unwrap();

    let lenient = Runtime::new(Arc::clone(&registry), RuntimeConfig::default());
    let output = lenient
        .execute(&graph, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(output.order, [t1]);
    assert_eq!(output.omitted, [a, b]);

    let strict = Runtime::new(
        registry,
        RuntimeConfig {
            reject_unreachable_tools: true,
            ..Default::default()
        },
    );
    let err = strict
        .execute(&graph, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "workflow_unreachable_tools");
}

struct CancelOnRun(CancellationToken);

#[async_trait::async_trait]
impl ToolExecutor for CancelOnRun {
    async fn run(&self, _ctx: ToolContext) -> Result<Table, ToolError> {
        self.0.cancel();
        Ok(Table::new(vec!["x".to_string()]))
    }
}

struct CancelFactory(CancellationToken);

impl ToolFactory for CancelFactory {
    fn kind(&self) -> ToolKind {
        ToolKind::ConcatData
    }

    fn max_inputs(&self) -> usize {
        10
    }

    fn create(&self, _config: &ToolConfig) -> Result<Box<dyn ToolExecutor>, ToolError> {
        Ok(Box::new(CancelOnRun(self.0.clone())))
    }
}

#[tokio::test]
async fn test_cancellation_is_checked_between_tools() {
    let cancel = CancellationToken::new();
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CancelFactory(cancel.clone())));
    let registry = Arc::new(registry);

    let mut graph = WorkflowGraph::new(Arc::clone(&registry));
    let first = insert(&mut graph, "concat_data", &[]);
    insert(&mut graph, "concat_data", &[first]);

    let pipeline = WorkflowPipeline::default();
    let err = pipeline
        .execute(&graph, &tabcore::EventBus::default(), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.code(), "run_cancelled");
}

#[tokio::test]
async fn test_registered_workflow_runs_by_id() {
    let (_file, url) = csv_fixture(SALES);
    let runtime = runtime();
    let mut graph = runtime.new_workflow();
    input(&mut graph, &url);
    let id = graph.id();

    runtime.register_workflow(graph).await;
    let output = runtime.execute_workflow(id).await.unwrap();
    assert_eq!(output.workflow_id, id);

    let unknown = WorkflowId::new_v4();
    let err = runtime.execute_workflow(unknown).await.unwrap_err();
    assert_eq!(err.code(), "workflow_not_found");

    assert!(runtime.remove_workflow(id).await);
    assert!(runtime.workflow(id).await.is_none());
}

#[tokio::test]
async fn test_snapshot_round_trip_through_disk() {
    let (_file, url) = csv_fixture(SALES);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workflow.json");

    let snapshot = WorkflowSnapshot::from_json(
        &json!({
            "name": "sales",
            "tools": [
                {"id": 3, "type": "input_url", "config": {"url": url}, "x": 10, "y": "20"},
                {"id": 7, "type": "describe_data", "inputs": [3], "config": {"data_type": 0}}
            ]
        })
        .to_string(),
    )
    .unwrap();
    snapshot.save(&path).await.unwrap();

    let loaded = WorkflowSnapshot::load(&path).await.unwrap();
    assert_eq!(loaded.id, snapshot.id);

    let runtime = runtime();
    let graph = loaded.into_graph(Arc::clone(runtime.registry())).unwrap();
    assert_eq!(graph.tool(3).unwrap().coordinates().map(|c| (c.x, c.y)), Some((10, 20)));

    // Loaded ids stay reserved: the next insert continues after the highest.
    let mut graph = graph;
    let next = insert(&mut graph, "concat_data", &[]);
    assert_eq!(next, 8);

    let err = runtime
        .execute(&graph, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Tool { tool_id: 8, .. }));
}
