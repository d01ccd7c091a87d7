use crate::registry::NodeRegistry;
use autocore::{
    GraphError, Node, NodeId, SocketRegistry, SocketSpec, SocketType, Value, Workflow,
    WorkflowId, WorkflowSettings,
};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt;

/// An instantiated node stored in the graph arena
pub struct GraphNode {
    pub id: NodeId,
    pub node_type: String,
    pub name: Option<String>,
    pub config: HashMap<String, Value>,
    pub inputs: Vec<SocketSpec>,
    pub outputs: Vec<SocketSpec>,
    pub node: Box<dyn Node>,
}

impl GraphNode {
    pub fn input(&self, name: &str) -> Option<&SocketSpec> {
        self.inputs.iter().find(|s| s.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&SocketSpec> {
        self.outputs.iter().find(|s| s.name == name)
    }

    /// Data inputs in declaration order
    pub fn data_inputs(&self) -> impl Iterator<Item = &SocketSpec> {
        self.inputs.iter().filter(|s| !s.is_exec())
    }

    pub fn pulse_outputs(&self) -> Vec<String> {
        self.outputs
            .iter()
            .filter(|s| s.is_exec())
            .map(|s| s.name.clone())
            .collect()
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("node_type", &self.node_type)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Typed connection between an output socket and an input socket
#[derive(Debug, Clone)]
pub struct Edge {
    pub from_socket: String,
    pub to_socket: String,
    pub socket_type: SocketType,
}

/// Compiled, immutable workflow graph.
///
/// Nodes live in a petgraph arena and are addressed by `NodeIndex`; all
/// per-run state is kept outside the graph, so one `Graph` can back any
/// number of runs.
#[derive(Debug)]
pub struct Graph {
    workflow_id: WorkflowId,
    graph: DiGraph<GraphNode, Edge>,
    index: HashMap<NodeId, NodeIndex>,
    triggers: Vec<NodeIndex>,
    settings: WorkflowSettings,
}

impl Graph {
    /// Instantiate every node of `workflow` through the registry and wire
    /// the connections, rejecting type mismatches and pulse cycles.
    pub fn from_workflow(
        workflow: &Workflow,
        registry: &NodeRegistry,
        sockets: &SocketRegistry,
    ) -> Result<Graph, GraphError> {
        let mut builder = GraphBuilder::new(sockets)
            .with_workflow_id(workflow.id)
            .with_settings(workflow.settings.clone());

        for spec in &workflow.nodes {
            let node = registry.create_node(&spec.node_type, &spec.config)?;
            builder.add_node(spec.id, spec.name.clone(), spec.config.clone(), node)?;
        }

        for conn in &workflow.connections {
            builder.connect(conn.from_node, &conn.from_port, conn.to_node, &conn.to_port)?;
        }

        for trigger in &workflow.triggers {
            builder.add_trigger(*trigger)?;
        }

        builder.build()
    }

    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn node(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn triggers(&self) -> &[NodeIndex] {
        &self.triggers
    }

    /// The output feeding `input` on `idx`, if connected
    pub fn source_of(&self, idx: NodeIndex, input: &str) -> Option<(NodeIndex, &str)> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|e| e.weight().to_socket == input)
            .map(|e| (e.source(), e.weight().from_socket.as_str()))
    }

    /// Targets of `output` on `idx`, in connection declaration order
    pub fn targets_of(&self, idx: NodeIndex, output: &str) -> Vec<(NodeIndex, String)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().from_socket == output)
            .collect();
        edges.sort_by_key(|e| e.id().index());
        edges
            .into_iter()
            .map(|e| (e.target(), e.weight().to_socket.clone()))
            .collect()
    }
}

/// Incremental graph construction; every check happens here, never at run time.
pub struct GraphBuilder<'a> {
    sockets: &'a SocketRegistry,
    workflow_id: WorkflowId,
    settings: WorkflowSettings,
    graph: DiGraph<GraphNode, Edge>,
    index: HashMap<NodeId, NodeIndex>,
    triggers: Vec<NodeIndex>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(sockets: &'a SocketRegistry) -> Self {
        Self {
            sockets,
            workflow_id: WorkflowId::nil(),
            settings: WorkflowSettings::default(),
            graph: DiGraph::new(),
            index: HashMap::new(),
            triggers: Vec::new(),
        }
    }

    pub fn with_workflow_id(mut self, workflow_id: WorkflowId) -> Self {
        self.workflow_id = workflow_id;
        self
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn add_node(
        &mut self,
        id: NodeId,
        name: Option<String>,
        config: HashMap<String, Value>,
        node: Box<dyn Node>,
    ) -> Result<NodeIndex, GraphError> {
        if self.index.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id.to_string()));
        }

        let inputs = node.inputs();
        let outputs = node.outputs();

        for spec in inputs.iter().chain(outputs.iter()) {
            if !self.sockets.contains(&spec.socket_type) {
                return Err(GraphError::UnknownSocketType {
                    node: id.to_string(),
                    socket_type: spec.socket_type.to_string(),
                });
            }
        }

        let has_pulse = inputs.iter().chain(outputs.iter()).any(SocketSpec::is_exec);
        if has_pulse && node.as_runnable().is_none() {
            return Err(GraphError::NotRunnable(id.to_string()));
        }

        let idx = self.graph.add_node(GraphNode {
            id,
            node_type: node.node_type().to_string(),
            name,
            config,
            inputs,
            outputs,
            node,
        });
        self.index.insert(id, idx);
        Ok(idx)
    }

    pub fn connect(
        &mut self,
        from: NodeId,
        from_socket: &str,
        to: NodeId,
        to_socket: &str,
    ) -> Result<(), GraphError> {
        let from_idx = self.lookup(from)?;
        let to_idx = self.lookup(to)?;

        let from_type = self.graph[from_idx]
            .output(from_socket)
            .map(|s| s.socket_type.clone())
            .ok_or_else(|| GraphError::SocketNotFound {
                node: from.to_string(),
                socket: from_socket.to_string(),
            })?;
        let to_type = self.graph[to_idx]
            .input(to_socket)
            .map(|s| s.socket_type.clone())
            .ok_or_else(|| GraphError::SocketNotFound {
                node: to.to_string(),
                socket: to_socket.to_string(),
            })?;

        if !from_type.is_compatible(&to_type) {
            return Err(GraphError::TypeMismatch {
                from: format!("{}.{}", from, from_socket),
                from_type: from_type.to_string(),
                to: format!("{}.{}", to, to_socket),
                to_type: to_type.to_string(),
            });
        }

        let occupied = self
            .graph
            .edges_directed(to_idx, Direction::Incoming)
            .any(|e| e.weight().to_socket == to_socket);
        if occupied {
            return Err(GraphError::InputAlreadyConnected {
                node: to.to_string(),
                socket: to_socket.to_string(),
            });
        }

        self.graph.add_edge(
            from_idx,
            to_idx,
            Edge {
                from_socket: from_socket.to_string(),
                to_socket: to_socket.to_string(),
                socket_type: from_type,
            },
        );
        Ok(())
    }

    pub fn add_trigger(&mut self, id: NodeId) -> Result<(), GraphError> {
        let idx = self.lookup(id)?;
        if self.graph[idx].node.as_runnable().is_none() {
            return Err(GraphError::InvalidTrigger(id.to_string()));
        }
        if !self.triggers.contains(&idx) {
            self.triggers.push(idx);
        }
        Ok(())
    }

    /// Finish construction. Fails if the execution pulse subgraph has a cycle.
    pub fn build(self) -> Result<Graph, GraphError> {
        let mut pulse: DiGraph<(), ()> = DiGraph::with_capacity(
            self.graph.node_count(),
            self.graph.edge_count(),
        );
        for _ in self.graph.node_indices() {
            pulse.add_node(());
        }
        for edge in self.graph.edge_references() {
            if edge.weight().socket_type.is_exec() {
                pulse.add_edge(edge.source(), edge.target(), ());
            }
        }
        if toposort(&pulse, None).is_err() {
            return Err(GraphError::CyclicPulseGraph);
        }

        Ok(Graph {
            workflow_id: self.workflow_id,
            graph: self.graph,
            index: self.index,
            triggers: self.triggers,
            settings: self.settings,
        })
    }

    fn lookup(&self, id: NodeId) -> Result<NodeIndex, GraphError> {
        self.index
            .get(&id)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }
}
