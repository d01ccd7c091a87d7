use anyhow::{bail, Context, Result};
use autocore::{ExecutionEvent, NodeEvent, NodeSpec, NodeStatus, SocketSpec, Value, Workflow};
use autonodes::{ActionDispatcher, ActionServices};
use autoruntime::{FlowRuntime, NodeRegistry, RuntimeConfig};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "auto")]
#[command(about = "Automation workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Trigger node id (defaults to the first trigger)
        #[arg(short, long)]
        trigger: Option<Uuid>,

        /// Run inputs as a JSON object
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Compile a workflow file without running it
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create an example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },

    /// Run a single node action against in-memory collaborators
    Dispatch {
        /// Action tag, e.g. `link-issuance`
        #[arg(short, long)]
        node_id: String,

        /// nodeData as a JSON object
        #[arg(short, long, default_value = "{}")]
        data: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn dispatcher() -> Arc<ActionDispatcher> {
    Arc::new(ActionDispatcher::new(ActionServices::in_memory()))
}

fn runtime() -> FlowRuntime {
    let mut registry = NodeRegistry::new();
    autonodes::register_all(&mut registry, dispatcher());
    FlowRuntime::with_registry(Arc::new(registry), RuntimeConfig::default())
}

fn load_workflow(file: &PathBuf) -> Result<Workflow> {
    let workflow_json = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    Ok(Workflow::from_json(&workflow_json)?)
}

/// Parse `--input` into run inputs
fn parse_inputs(input: Option<&str>) -> Result<HashMap<String, Value>> {
    let Some(input) = input else {
        return Ok(HashMap::new());
    };
    match serde_json::from_str(input)? {
        serde_json::Value::Object(obj) => Ok(obj
            .into_iter()
            .map(|(k, v)| (k, Value::from_json(v)))
            .collect()),
        _ => bail!("Input must be a JSON object"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            trigger,
            input,
            verbose,
        } => {
            init_tracing(verbose);
            run_workflow(file, trigger, input).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }

        Commands::Dispatch { node_id, data } => {
            init_tracing(false);
            dispatch_action(&node_id, &data).await?;
        }
    }

    Ok(())
}

async fn run_workflow(file: PathBuf, trigger: Option<Uuid>, input: Option<String>) -> Result<()> {
    println!("Loading workflow from: {}", file.display());

    let workflow = load_workflow(&file)?;
    println!("Workflow: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Connections: {}", workflow.connections.len());
    println!();

    let inputs = parse_inputs(input.as_deref())?;
    let runtime = runtime();

    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::RunStarted { trigger, .. } => {
                    println!("Run started from trigger {}", trigger);
                }
                ExecutionEvent::NodeStarted {
                    node_id, node_type, ..
                } => {
                    println!("  > {} ({})", node_id, node_type);
                }
                ExecutionEvent::NodeCompleted {
                    node_id,
                    duration_ms,
                    ..
                } => {
                    println!("  ok {} in {}ms", node_id, duration_ms);
                }
                ExecutionEvent::NodeFailed { node_id, error, .. } => {
                    println!("  FAILED {}: {}", node_id, error);
                }
                ExecutionEvent::NodeEvent { node_id, event, .. } => match event {
                    NodeEvent::Info { message } => println!("     [{}] {}", node_id, message),
                    NodeEvent::Warning { message } => {
                        println!("     [{}] warning: {}", node_id, message)
                    }
                    NodeEvent::Data { .. } => {}
                },
                ExecutionEvent::PulseIgnored {
                    node_id,
                    pulse_input,
                    ..
                } => {
                    println!("  skipped {} (already ran, pulse '{}')", node_id, pulse_input);
                }
                ExecutionEvent::RunFinished {
                    success,
                    error,
                    duration_ms,
                    ..
                } => {
                    if success {
                        println!("Run finished in {}ms", duration_ms);
                    } else {
                        println!(
                            "Run aborted after {}ms: {}",
                            duration_ms,
                            error.unwrap_or_default()
                        );
                    }
                }
            }
        }
    });

    let result = runtime.execute(&workflow, trigger, inputs).await;

    // Closing the bus lets the listener drain and stop
    drop(runtime);
    let _ = event_task.await;
    let report = result?;

    println!();
    println!("Execution Summary:");
    println!("   Execution ID: {}", report.execution_id);
    println!("   State: {:?}", report.state);
    println!("   Steps: {}", report.steps);

    for entry in &report.log {
        if let NodeStatus::Failed(reason) = &entry.status {
            println!("   {} ({}) failed: {}", entry.node_id, entry.node_type, reason);
        }
    }

    if !report.outputs.is_empty() {
        println!();
        println!("Outputs:");
        for (node_id, outputs) in &report.outputs {
            if !outputs.is_empty() {
                println!("   Node {}:", node_id);
                for (key, value) in outputs {
                    println!("     {}: {}", key, value.to_json());
                }
            }
        }
    }

    Ok(())
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("Validating workflow: {}", file.display());

    let workflow = load_workflow(&file)?;
    let graph = runtime()
        .compile(&workflow)
        .with_context(|| format!("workflow '{}' does not compile", workflow.name))?;

    println!("Workflow is valid:");
    println!("   Name: {}", workflow.name);
    println!("   Nodes: {}", graph.node_count());
    println!("   Connections: {}", workflow.connections.len());
    println!("   Triggers: {}", graph.triggers().len());

    Ok(())
}

fn list_nodes() {
    println!("Available Node Types:");
    println!();

    let mut registry = NodeRegistry::new();
    autonodes::register_all(&mut registry, dispatcher());

    for node in registry.describe_all() {
        println!("  - {} ({})", node.node_type, node.category);
        println!("    {}", node.description);
        println!("    in:  [{}]", socket_list(&node.inputs));
        println!("    out: [{}]", socket_list(&node.outputs));
    }
}

fn socket_list(specs: &[SocketSpec]) -> String {
    specs
        .iter()
        .map(|s| format!("{}:{}", s.name, s.socket_type))
        .collect::<Vec<_>>()
        .join(", ")
}

fn example_workflow() -> Workflow {
    let mut workflow = Workflow::new("Maintenance follow-up");
    workflow.description =
        Some("Creates a follow-up task when the unit is old, otherwise sends a reminder".to_string());

    let trigger = workflow.add_trigger(
        NodeSpec::new("trigger.manual")
            .with_name("Start")
            .with_position(50.0, 100.0),
    );
    let check = workflow.add_node(
        NodeSpec::new("logic.condition")
            .with_name("Unit older than 10 years?")
            .with_config("dataSource", "equipment")
            .with_config("field", "ageYears")
            .with_config("operator", ">")
            .with_config("value", 10.0)
            .with_position(250.0, 100.0),
    );
    let task = workflow.add_node(
        NodeSpec::new("action.task-creation")
            .with_name("Offer replacement")
            .with_config("description", "Call customer about a replacement unit")
            .with_position(450.0, 50.0),
    );
    let body = workflow.add_node(
        NodeSpec::new("transform.template")
            .with_name("Reminder text")
            .with_config("template", "Hi {{customer}}, your yearly service is due.")
            .with_position(250.0, 250.0),
    );
    let reminder = workflow.add_node(
        NodeSpec::new("action.messaging")
            .with_name("Send reminder")
            .with_config("recipient", "customer@example.com")
            .with_config("subject", "Service reminder")
            .with_position(450.0, 200.0),
    );
    let log = workflow.add_node(
        NodeSpec::new("debug.log")
            .with_name("Done")
            .with_config("message", "follow-up handled")
            .with_position(650.0, 100.0),
    );

    workflow.connect(trigger, "out", check, "in");
    workflow.connect(check, "true", task, "in");
    workflow.connect(check, "false", reminder, "in");
    workflow.connect(body, "text", reminder, "body");
    workflow.connect(task, "then", log, "in");

    workflow
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let workflow = example_workflow();
    std::fs::write(&output, workflow.to_json_pretty()?)?;

    println!("Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  auto run --file {} --input '{{\"customer\": \"Ms. Novak\"}}'",
        output.display()
    );

    Ok(())
}

async fn dispatch_action(tag: &str, data: &str) -> Result<()> {
    let node_data: serde_json::Value =
        serde_json::from_str(data).context("--data must be valid JSON")?;

    match dispatcher().dispatch(tag, node_data).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome.to_json())?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_json())?);
            bail!("action {} failed: {}", tag, e)
        }
    }
}
