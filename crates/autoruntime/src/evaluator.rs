use crate::graph::Graph;
use crate::run::ExecutionRun;
use autocore::{
    EventBus, ExecutionEvent, NodeContext, NodeError, NodeOutput, NodeStatus, Producer, RunError,
    Value,
};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Instant;
use tokio::time::{timeout, Duration};

/// Pull-based resolver of data outputs.
///
/// Each producer is evaluated at most once per run; later reads come from
/// the run's memo table. A node re-entered while its own inputs are still
/// being resolved aborts the run with [`RunError::CyclicDependency`].
pub struct DataflowEvaluator<'a> {
    graph: &'a Graph,
    events: &'a EventBus,
}

impl<'a> DataflowEvaluator<'a> {
    pub fn new(graph: &'a Graph, events: &'a EventBus) -> Self {
        Self { graph, events }
    }

    /// Resolve the connected data inputs of `idx`, in declaration order.
    /// Unconnected inputs are left out.
    pub fn resolve_inputs<'r>(
        &'r self,
        run: &'r mut ExecutionRun,
        idx: NodeIndex,
    ) -> BoxFuture<'r, Result<HashMap<String, Value>, RunError>> {
        async move {
            let node = self.graph.node(idx);
            let mut inputs = HashMap::new();
            for socket in node.data_inputs() {
                if let Some((source, output)) = self.graph.source_of(idx, &socket.name) {
                    let value = self.resolve_output(run, source, output).await?;
                    inputs.insert(socket.name.clone(), value);
                }
            }
            Ok(inputs)
        }
        .boxed()
    }

    /// Value of `output` on `idx`, evaluating the producer on first use.
    pub async fn resolve_output(
        &self,
        run: &mut ExecutionRun,
        idx: NodeIndex,
        output: &str,
    ) -> Result<Value, RunError> {
        let node = self.graph.node(idx);

        if !run.enter(idx) {
            return Err(RunError::CyclicDependency {
                node: node.id.to_string(),
            });
        }
        let result = self.ensure_evaluated(run, idx).await;
        run.leave(idx);
        result?;

        self.read_output(run, idx, output)
    }

    async fn ensure_evaluated(&self, run: &mut ExecutionRun, idx: NodeIndex) -> Result<(), RunError> {
        if run.memoized(idx).is_some() {
            tracing::debug!("Memo hit for node {}", self.graph.node(idx).id);
            return Ok(());
        }
        match self.graph.node(idx).node.as_producer() {
            Some(producer) => self.evaluate(run, idx, producer).await,
            // Runnable-only node that has not run yet; read_output reports it.
            None => Ok(()),
        }
    }

    fn read_output(&self, run: &ExecutionRun, idx: NodeIndex, output: &str) -> Result<Value, RunError> {
        if run.status(idx).is_failed() {
            return Ok(Value::Null);
        }
        run.memoized(idx)
            .and_then(|outputs| outputs.get(output))
            .cloned()
            .ok_or_else(|| RunError::NotProducible {
                node: self.graph.node(idx).id.to_string(),
                output: output.to_string(),
            })
    }

    async fn evaluate(
        &self,
        run: &mut ExecutionRun,
        idx: NodeIndex,
        producer: &dyn Producer,
    ) -> Result<(), RunError> {
        let inputs = self.resolve_inputs(run, idx).await?;
        let ctx = node_context(self.graph, run, self.events, idx, inputs);

        run.set_status(self.graph, idx, NodeStatus::Running);
        self.events.emit(ExecutionEvent::NodeStarted {
            execution_id: run.execution_id(),
            node_id: ctx.node_id,
            node_type: ctx.node_type.clone(),
            timestamp: Utc::now(),
        });

        let start = Instant::now();
        let result = with_timeout(
            self.graph.settings().node_timeout_ms,
            producer.produce(&ctx),
        )
        .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(mut output) => {
                output.metadata.execution_time_ms = duration_ms;
                tracing::info!("Node {} produced in {}ms", ctx.node_id, duration_ms);
                self.events.emit(ExecutionEvent::NodeCompleted {
                    execution_id: run.execution_id(),
                    node_id: ctx.node_id,
                    outputs: output.outputs.clone(),
                    duration_ms,
                    timestamp: Utc::now(),
                });
                run.memoize(idx, output.outputs);
                run.set_status(self.graph, idx, NodeStatus::Completed);
            }
            Err(e) => {
                tracing::error!("Node {} failed to produce: {}", ctx.node_id, e);
                self.events.emit(ExecutionEvent::NodeFailed {
                    execution_id: run.execution_id(),
                    node_id: ctx.node_id,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                run.memoize(idx, HashMap::new());
                run.set_status(self.graph, idx, NodeStatus::Failed(e.to_string()));
            }
        }
        Ok(())
    }
}

pub(crate) fn node_context(
    graph: &Graph,
    run: &ExecutionRun,
    events: &EventBus,
    idx: NodeIndex,
    inputs: HashMap<String, Value>,
) -> NodeContext {
    let node = graph.node(idx);
    NodeContext {
        node_id: node.id,
        node_type: node.node_type.clone(),
        inputs,
        config: node.config.clone(),
        run_inputs: run.inputs(),
        events: events.create_emitter(run.execution_id(), node.id),
    }
}

pub(crate) async fn with_timeout<F>(timeout_ms: Option<u64>, task: F) -> Result<NodeOutput, NodeError>
where
    F: Future<Output = Result<NodeOutput, NodeError>>,
{
    match timeout_ms {
        Some(millis) => match timeout(Duration::from_millis(millis), task).await {
            Ok(result) => result,
            Err(_) => Err(NodeError::Timeout { millis }),
        },
        None => task.await,
    }
}
