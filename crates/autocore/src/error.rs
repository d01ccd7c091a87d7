use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Run error: {0}")]
    Run(#[from] RunError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Per-node failure. Recorded on the node's status; halts only its branch.
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Unknown pulse output: {0}")]
    UnknownPulse(String),

    #[error("Pulse already forwarded on '{0}'")]
    AlreadyForwarded(String),

    #[error("Timeout after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Action failed: {0}")]
    Action(String),
}

/// Rejected while building a graph, before any run starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Type mismatch: {from} ({from_type}) -> {to} ({to_type})")]
    TypeMismatch {
        from: String,
        from_type: String,
        to: String,
        to_type: String,
    },

    #[error("Execution pulse graph contains a cycle")]
    CyclicPulseGraph,

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Socket '{socket}' not found on node {node}")]
    SocketNotFound { node: String, socket: String },

    #[error("Input '{socket}' on node {node} already has an incoming connection")]
    InputAlreadyConnected { node: String, socket: String },

    #[error("Unknown socket type '{socket_type}' declared by node {node}")]
    UnknownSocketType { node: String, socket_type: String },

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Node {0} declares execution pulse sockets but cannot run")]
    NotRunnable(String),

    #[error("Trigger node {0} cannot run")]
    InvalidTrigger(String),

    #[error("Failed to create node {node}: {reason}")]
    NodeCreation { node: String, reason: String },
}

/// Raised during a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunError {
    #[error("Cyclic dependency detected while resolving node {node}")]
    CyclicDependency { node: String },

    #[error("Output '{output}' of node {node} is not producible")]
    NotProducible { node: String, output: String },

    #[error("Unknown trigger: {0}")]
    UnknownTrigger(String),

    #[error("Workflow has no trigger")]
    NoTrigger,
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Invalid workflow: {0}")]
    Invalid(String),
}
