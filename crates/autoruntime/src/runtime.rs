use crate::{graph::Graph, registry::NodeRegistry, ExecutionReport, WorkflowExecutor};
use autocore::{
    EventBus, ExecutionEvent, FlowError, NodeId, SocketRegistry, Value, Workflow, WorkflowError,
    WorkflowId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Main runtime for compiling and running workflows
pub struct FlowRuntime {
    registry: Arc<NodeRegistry>,
    sockets: Arc<SocketRegistry>,
    executor: WorkflowExecutor,
    event_bus: Arc<EventBus>,
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
}

impl FlowRuntime {
    /// Create a new runtime with an empty registry
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(NodeRegistry::new()), config)
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            sockets: Arc::new(SocketRegistry::with_builtins()),
            executor: WorkflowExecutor::new(),
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the socket registry, e.g. to add custom socket types
    pub fn with_sockets(mut self, sockets: SocketRegistry) -> Self {
        self.sockets = Arc::new(sockets);
        self
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn sockets(&self) -> &Arc<SocketRegistry> {
        &self.sockets
    }

    /// Build the executable graph for a workflow
    pub fn compile(&self, workflow: &Workflow) -> Result<Graph, FlowError> {
        Ok(Graph::from_workflow(workflow, &self.registry, &self.sockets)?)
    }

    /// Store a workflow after checking that it compiles
    pub async fn register_workflow(&self, workflow: Workflow) -> Result<WorkflowId, FlowError> {
        self.compile(&workflow)?;
        let id = workflow.id;
        self.workflows.write().await.insert(id, workflow);
        Ok(id)
    }

    pub async fn get_workflow(&self, id: WorkflowId) -> Option<Workflow> {
        self.workflows.read().await.get(&id).cloned()
    }

    pub async fn list_workflows(&self) -> Vec<Workflow> {
        self.workflows.read().await.values().cloned().collect()
    }

    pub async fn remove_workflow(&self, id: WorkflowId) -> Option<Workflow> {
        self.workflows.write().await.remove(&id)
    }

    /// Run a stored workflow
    pub async fn execute_workflow(
        &self,
        workflow_id: WorkflowId,
        trigger: Option<NodeId>,
        inputs: HashMap<String, Value>,
    ) -> Result<ExecutionReport, FlowError> {
        let workflow = self
            .get_workflow(workflow_id)
            .await
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;

        self.execute(&workflow, trigger, inputs).await
    }

    /// Run a workflow directly (without registration)
    pub async fn execute(
        &self,
        workflow: &Workflow,
        trigger: Option<NodeId>,
        inputs: HashMap<String, Value>,
    ) -> Result<ExecutionReport, FlowError> {
        let graph = self.compile(workflow)?;
        Ok(self
            .executor
            .execute(&graph, trigger, &self.event_bus, inputs)
            .await?)
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
        }
    }
}
