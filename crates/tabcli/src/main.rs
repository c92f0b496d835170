use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tabcore::{RunEvent, ToolEvent, ToolRecord, WorkflowGraph};
use tabruntime::{Runtime, RuntimeConfig, WorkflowSnapshot};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tabflow")]
#[command(about = "Tabular workflow CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow snapshot
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Fail when some tools cannot be placed in the execution order
        #[arg(long)]
        strict: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow snapshot
    Validate {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List available tool types
    Tools,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            strict,
            verbose,
        } => {
            init_tracing(verbose);
            run_workflow(file, strict).await?;
        }

        Commands::Validate { file } => {
            init_tracing(false);
            validate_workflow(file).await?;
        }

        Commands::Tools => {
            list_tools();
        }

        Commands::Init { output } => {
            create_example_workflow(output).await?;
        }
    }

    Ok(())
}

async fn run_workflow(file: PathBuf, strict: bool) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let snapshot = WorkflowSnapshot::load(&file).await?;
    println!("📋 Workflow: {}", snapshot.name);
    println!("   Tools: {}", snapshot.tools.len());
    println!();

    let runtime = Runtime::new(
        tabtools::default_registry(),
        RuntimeConfig {
            reject_unreachable_tools: strict,
            ..Default::default()
        },
    );
    let graph = snapshot.into_graph(runtime.registry().clone())?;
    print_diagnostics(&graph);
    let workflow_id = graph.id();
    runtime.register_workflow(graph).await;

    // Subscribe to events for real-time output
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RunEvent::RunStarted { .. } => {
                    println!("▶️  Workflow started");
                }
                RunEvent::StateChanged { .. } => {}
                RunEvent::ToolStarted { tool_id, kind, .. } => {
                    println!("  ⚡ Starting tool: {} ({})", tool_id, kind);
                }
                RunEvent::ToolCompleted {
                    tool_id,
                    rows,
                    columns,
                    duration_ms,
                    ..
                } => {
                    println!(
                        "  ✅ Tool {} produced {}x{} in {}ms",
                        tool_id, rows, columns, duration_ms
                    );
                }
                RunEvent::ToolFailed {
                    tool_id, code, error, ..
                } => {
                    println!("  ❌ Tool {} failed [{}]: {}", tool_id, code, error);
                }
                RunEvent::ToolMessage { tool_id, event, .. } => match event {
                    ToolEvent::Info { message } => {
                        println!("     ℹ️  [{}] {}", tool_id, message);
                    }
                    ToolEvent::Warning { message } => {
                        println!("     ⚠️  [{}] {}", tool_id, message);
                    }
                },
                RunEvent::RunCompleted {
                    success,
                    duration_ms,
                    ..
                } => {
                    if success {
                        println!("✨ Workflow completed successfully in {}ms", duration_ms);
                    } else {
                        println!("💥 Workflow failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current tool");
            on_ctrl_c.cancel();
        }
    });

    let result = runtime
        .execute_workflow_with_cancel(workflow_id, cancel)
        .await;

    // Wait for events to finish printing
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            println!();
            println!("{}", serde_json::to_string_pretty(&e)?);
            return Err(e.into());
        }
    };

    println!();
    println!("📊 Run Summary:");
    println!("   Run ID: {}", output.run_id);
    println!("   Order: {:?}", output.order);
    if !output.omitted.is_empty() {
        println!("   Omitted: {:?}", output.omitted);
    }

    println!();
    println!("📤 Results:");
    println!("{}", serde_json::to_string_pretty(&output.outputs())?);

    Ok(())
}

fn print_diagnostics(graph: &WorkflowGraph) {
    for tool in graph.tools().filter(|t| !t.errors().is_empty()) {
        for message in &tool.errors().input {
            println!("  ⚠️  Tool {} input: {}", tool.id(), message);
        }
        for issue in &tool.errors().config {
            println!(
                "  ⚠️  Tool {} config [{}/{}]: {}",
                tool.id(),
                issue.field,
                issue.kind,
                issue.message
            );
        }
    }
}

async fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let snapshot = WorkflowSnapshot::load(&file).await?;
    let name = snapshot.name.clone();
    let graph = snapshot.into_graph(tabtools::default_registry())?;

    println!("   Name: {}", name);
    println!("   Tools: {}", graph.size());
    print_diagnostics(&graph);

    match graph.execution_plan() {
        Ok(plan) => {
            for (depth, layer) in plan.layers().iter().enumerate() {
                println!("   Layer {}: {:?}", depth, layer);
            }
            if !plan.is_complete() {
                println!("   ⚠️  Never executed: {:?}", plan.omitted());
                if !plan.cyclic().is_empty() {
                    println!("   ⚠️  On a cycle: {:?}", plan.cyclic());
                }
            }
        }
        Err(e) => {
            println!("   ❌ {}", e);
            return Err(e.into());
        }
    }

    if graph.has_errors() {
        anyhow::bail!("Workflow has tool diagnostics");
    }
    println!("✅ Workflow is valid");

    Ok(())
}

fn list_tools() {
    println!("📦 Available Tool Types:");
    println!();

    let registry = tabtools::default_registry();
    for kind in registry.list_tool_kinds() {
        let max_inputs = registry.max_inputs(kind).unwrap_or_default();
        match registry.metadata(kind) {
            Some(metadata) => {
                println!("  • {} ({}, max inputs {})", kind, metadata.category, max_inputs);
                println!("    {}", metadata.description);
                for field in metadata.fields {
                    let mut flags = Vec::new();
                    if field.required {
                        flags.push("required");
                    }
                    if field.read_only {
                        flags.push("read-only");
                    }
                    if flags.is_empty() {
                        println!("      - {}: {}", field.name, field.description);
                    } else {
                        println!(
                            "      - {} [{}]: {}",
                            field.name,
                            flags.join(", "),
                            field.description
                        );
                    }
                }
            }
            None => println!("  • {} (max inputs {})", kind, max_inputs),
        }
    }
}

async fn create_example_workflow(output: PathBuf) -> Result<()> {
    let snapshot = WorkflowSnapshot {
        id: uuid::Uuid::new_v4(),
        name: "Example describe workflow".to_string(),
        tools: vec![
            ToolRecord {
                id: 1,
                tool_type: "input_url".to_string(),
                config: json!({
                    "url": "https://people.sc.fsu.edu/~jburkardt/data/csv/hw_200.csv",
                    "extension": "csv"
                }),
                inputs: vec![],
                x: json!(100),
                y: json!(100),
            },
            ToolRecord {
                id: 2,
                tool_type: "describe_data".to_string(),
                config: json!({ "data_type": 0 }),
                inputs: vec![1],
                x: json!(300),
                y: json!(100),
            },
        ],
    };
    snapshot.save(&output).await?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  tabflow run --file {}", output.display());

    Ok(())
}
