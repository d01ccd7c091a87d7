use crate::{events::EventEmitter, NodeError, NodeId, SocketSpec, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A unit of computation in a workflow graph.
///
/// A node declares its sockets and exposes zero, one or both capabilities:
/// [`Producer`] for the dataflow pass and [`Runnable`] for the control-flow
/// pass. Node instances hold no per-run state, so one graph can serve
/// concurrent runs.
pub trait Node: Send + Sync {
    /// Unique type identifier (e.g., "action.messaging", "data.constant")
    fn node_type(&self) -> &str;

    /// Ordered input sockets
    fn inputs(&self) -> Vec<SocketSpec>;

    /// Ordered output sockets
    fn outputs(&self) -> Vec<SocketSpec>;

    fn as_producer(&self) -> Option<&dyn Producer> {
        None
    }

    fn as_runnable(&self) -> Option<&dyn Runnable> {
        None
    }
}

/// Pure data capability. Invoked at most once per node per run; the result
/// covers every data output the node offers.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn produce(&self, ctx: &NodeContext) -> Result<NodeOutput, NodeError>;
}

/// Procedural capability, entered through an exec input.
///
/// `forward` must be called at most once; not calling it halts the branch.
#[async_trait]
pub trait Runnable: Send + Sync {
    async fn run(
        &self,
        pulse_input: &str,
        ctx: &NodeContext,
        forward: &mut Forward,
    ) -> Result<NodeOutput, NodeError>;
}

/// Forward callback bound to a node's declared exec outputs.
#[derive(Debug)]
pub struct Forward {
    allowed: Vec<String>,
    fired: Option<String>,
}

impl Forward {
    pub fn new(allowed: Vec<String>) -> Self {
        Self {
            allowed,
            fired: None,
        }
    }

    pub fn forward(&mut self, pulse_output: &str) -> Result<(), NodeError> {
        if let Some(previous) = &self.fired {
            return Err(NodeError::AlreadyForwarded(previous.clone()));
        }
        if !self.allowed.iter().any(|name| name == pulse_output) {
            return Err(NodeError::UnknownPulse(pulse_output.to_string()));
        }
        self.fired = Some(pulse_output.to_string());
        Ok(())
    }

    pub fn fired(&self) -> Option<&str> {
        self.fired.as_deref()
    }

    pub fn into_fired(self) -> Option<String> {
        self.fired
    }
}

/// Execution context passed to `produce` and `run`
#[derive(Clone)]
pub struct NodeContext {
    pub node_id: NodeId,

    pub node_type: String,

    /// Resolved values of the node's connected data inputs
    pub inputs: HashMap<String, Value>,

    /// Static configuration authored in the workflow
    pub config: HashMap<String, Value>,

    /// Inputs handed to the run by whoever fired the trigger
    pub run_inputs: Arc<HashMap<String, Value>>,

    /// Event emitter for real-time updates
    pub events: EventEmitter,
}

impl NodeContext {
    pub fn new(node_id: NodeId, node_type: impl Into<String>, events: EventEmitter) -> Self {
        Self {
            node_id,
            node_type: node_type.into(),
            inputs: HashMap::new(),
            config: HashMap::new(),
            run_inputs: Arc::new(HashMap::new()),
            events,
        }
    }

    pub fn with_inputs(mut self, inputs: HashMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_config(mut self, config: HashMap<String, Value>) -> Self {
        self.config = config;
        self
    }

    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, NodeError> {
        self.inputs
            .get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    /// Get config value or return error
    pub fn require_config(&self, name: &str) -> Result<&Value, NodeError> {
        self.config
            .get(name)
            .ok_or_else(|| NodeError::Configuration(format!("Missing config: {}", name)))
    }

    /// Get config with default
    pub fn get_config_or(&self, name: &str, default: Value) -> Value {
        self.config.get(name).cloned().unwrap_or(default)
    }

    /// A wired, non-empty input wins over the authored config value.
    pub fn input_or_config(&self, name: &str) -> Option<&Value> {
        self.inputs
            .get(name)
            .filter(|v| !v.is_null())
            .or_else(|| self.config.get(name))
    }
}

/// Per-run status of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason")]
pub enum NodeStatus {
    Waiting,
    Running,
    Completed,
    Failed(String),
}

impl NodeStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, NodeStatus::Failed(_))
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Waiting => f.write_str("waiting"),
            NodeStatus::Running => f.write_str("running"),
            NodeStatus::Completed => f.write_str("completed"),
            NodeStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Output from node execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeOutput {
    /// Output port values
    pub outputs: HashMap<String, Value>,

    /// Execution metadata
    pub metadata: NodeMetadata,
}

impl NodeOutput {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            metadata: NodeMetadata::default(),
        }
    }

    pub fn with_output(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(port.into(), value.into());
        self
    }

    pub fn get(&self, port: &str) -> Option<&Value> {
        self.outputs.get(port)
    }
}

impl Default for NodeOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata about node execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub execution_time_ms: u64,
}
