use crate::graph::Graph;
use autocore::{ExecutionId, NodeId, NodeStatus, RunError, Value, WorkflowId};
use chrono::{DateTime, Utc};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Lifecycle of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// One line of the ordered execution log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub node_id: NodeId,
    pub node_type: String,
    pub status: NodeStatus,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

/// State of one traversal from a trigger.
///
/// Owns the memo table and the log; discarded when the run ends. Nothing
/// here is shared, so it needs no locking.
pub struct ExecutionRun {
    execution_id: ExecutionId,
    state: RunState,
    inputs: Arc<HashMap<String, Value>>,
    memo: HashMap<NodeIndex, HashMap<String, Value>>,
    in_progress: HashSet<NodeIndex>,
    executed: HashSet<NodeIndex>,
    statuses: HashMap<NodeIndex, NodeStatus>,
    log: Vec<LogEntry>,
    steps: usize,
    error: Option<RunError>,
}

impl ExecutionRun {
    pub fn new(inputs: HashMap<String, Value>) -> Self {
        Self {
            execution_id: ExecutionId::new_v4(),
            state: RunState::Idle,
            inputs: Arc::new(inputs),
            memo: HashMap::new(),
            in_progress: HashSet::new(),
            executed: HashSet::new(),
            statuses: HashMap::new(),
            log: Vec::new(),
            steps: 0,
            error: None,
        }
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn inputs(&self) -> Arc<HashMap<String, Value>> {
        Arc::clone(&self.inputs)
    }

    pub fn start(&mut self) {
        self.state = RunState::Running;
    }

    pub fn finish(&mut self) {
        if self.state == RunState::Running {
            self.state = RunState::Completed;
        }
    }

    /// End the whole run; the log collected so far is kept.
    pub fn abort(&mut self, error: RunError) {
        self.state = RunState::Failed;
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&RunError> {
        self.error.as_ref()
    }

    pub fn memoized(&self, idx: NodeIndex) -> Option<&HashMap<String, Value>> {
        self.memo.get(&idx)
    }

    pub fn memoize(&mut self, idx: NodeIndex, outputs: HashMap<String, Value>) {
        self.memo.insert(idx, outputs);
    }

    /// Returns false if the node was already being resolved.
    pub fn enter(&mut self, idx: NodeIndex) -> bool {
        self.in_progress.insert(idx)
    }

    pub fn leave(&mut self, idx: NodeIndex) {
        self.in_progress.remove(&idx);
    }

    /// Returns false if the node already ran in this run.
    pub fn mark_executed(&mut self, idx: NodeIndex) -> bool {
        self.executed.insert(idx)
    }

    pub fn has_executed(&self, idx: NodeIndex) -> bool {
        self.executed.contains(&idx)
    }

    pub fn count_step(&mut self) {
        self.steps += 1;
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn status(&self, idx: NodeIndex) -> NodeStatus {
        self.statuses
            .get(&idx)
            .cloned()
            .unwrap_or(NodeStatus::Waiting)
    }

    /// Record a status change and append it to the log
    pub fn set_status(&mut self, graph: &Graph, idx: NodeIndex, status: NodeStatus) {
        let node = graph.node(idx);
        let error = match &status {
            NodeStatus::Failed(reason) => Some(reason.clone()),
            _ => None,
        };
        self.log.push(LogEntry {
            node_id: node.id,
            node_type: node.node_type.clone(),
            status: status.clone(),
            timestamp: Utc::now(),
            error,
        });
        self.statuses.insert(idx, status);
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn into_report(
        self,
        graph: &Graph,
        trigger: NodeId,
        duration_ms: u64,
    ) -> ExecutionReport {
        let statuses = self
            .statuses
            .iter()
            .map(|(idx, status)| (graph.node(*idx).id, status.clone()))
            .collect();
        let outputs = self
            .memo
            .into_iter()
            .map(|(idx, outputs)| (graph.node(idx).id, outputs))
            .collect();

        ExecutionReport {
            execution_id: self.execution_id,
            workflow_id: graph.workflow_id(),
            trigger,
            state: self.state,
            error: self.error.map(|e| e.to_string()),
            statuses,
            outputs,
            log: self.log,
            steps: self.steps,
            duration_ms,
        }
    }
}

/// What a finished run leaves behind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub trigger: NodeId,
    pub state: RunState,
    pub error: Option<String>,
    pub statuses: HashMap<NodeId, NodeStatus>,
    pub outputs: HashMap<NodeId, HashMap<String, Value>>,
    pub log: Vec<LogEntry>,
    pub steps: usize,
    pub duration_ms: u64,
}

impl ExecutionReport {
    pub fn status_of(&self, node_id: NodeId) -> NodeStatus {
        self.statuses
            .get(&node_id)
            .cloned()
            .unwrap_or(NodeStatus::Waiting)
    }

    pub fn output(&self, node_id: NodeId, port: &str) -> Option<&Value> {
        self.outputs.get(&node_id).and_then(|o| o.get(port))
    }

    pub fn failed_nodes(&self) -> Vec<NodeId> {
        self.statuses
            .iter()
            .filter(|(_, s)| s.is_failed())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.state == RunState::Completed && self.failed_nodes().is_empty()
    }
}
