use crate::evaluator::{node_context, with_timeout, DataflowEvaluator};
use crate::graph::Graph;
use crate::run::{ExecutionReport, ExecutionRun};
use autocore::{
    EventBus, ExecutionEvent, Forward, NodeId, NodeStatus, RunError, Value,
};
use chrono::Utc;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use std::time::Instant;

/// Push-based walker of the execution pulse subgraph.
///
/// Starting from a trigger, every node has its data inputs pulled through
/// the [`DataflowEvaluator`], then its `run` is awaited, then the pulse it
/// forwarded is followed. Branches fanning out of one pulse output run one
/// after another, in connection order.
#[derive(Debug, Default)]
pub struct WorkflowExecutor;

/// Outcome of one executor step
enum Step {
    Forwarded(String),
    Halted,
}

impl WorkflowExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run `graph` from `trigger` (or its first declared trigger).
    ///
    /// Node failures are recorded in the report and halt only their own
    /// branch. Only an unknown trigger is reported as `Err`; every run
    /// that starts yields a report.
    pub async fn execute(
        &self,
        graph: &Graph,
        trigger: Option<NodeId>,
        event_bus: &EventBus,
        inputs: HashMap<String, Value>,
    ) -> Result<ExecutionReport, RunError> {
        let trigger_idx = match trigger {
            Some(id) => graph
                .index_of(id)
                .filter(|idx| graph.triggers().contains(idx))
                .ok_or_else(|| RunError::UnknownTrigger(id.to_string()))?,
            None => *graph.triggers().first().ok_or(RunError::NoTrigger)?,
        };
        let trigger_id = graph.node(trigger_idx).id;

        let mut run = ExecutionRun::new(inputs);
        let start_time = Instant::now();
        run.start();

        event_bus.emit(ExecutionEvent::RunStarted {
            execution_id: run.execution_id(),
            workflow_id: graph.workflow_id(),
            trigger: trigger_id,
            timestamp: Utc::now(),
        });
        tracing::info!(
            "Starting run {} of workflow {} from trigger {}",
            run.execution_id(),
            graph.workflow_id(),
            trigger_id
        );

        // Depth-first: the top of the stack is the next branch to run.
        let mut pending: Vec<(NodeIndex, String)> = vec![(trigger_idx, String::new())];

        while let Some((idx, pulse_input)) = pending.pop() {
            if !run.mark_executed(idx) {
                tracing::warn!(
                    "Node {} already ran in this run, ignoring pulse on '{}'",
                    graph.node(idx).id,
                    pulse_input
                );
                event_bus.emit(ExecutionEvent::PulseIgnored {
                    execution_id: run.execution_id(),
                    node_id: graph.node(idx).id,
                    pulse_input,
                    timestamp: Utc::now(),
                });
                continue;
            }
            run.count_step();

            match self.step(graph, &mut run, event_bus, idx, &pulse_input).await {
                Ok(Step::Forwarded(output)) => {
                    let targets = graph.targets_of(idx, &output);
                    pending.extend(targets.into_iter().rev());
                }
                Ok(Step::Halted) => {}
                Err(e) => {
                    tracing::error!("Run {} aborted: {}", run.execution_id(), e);
                    run.abort(e);
                    break;
                }
            }
        }

        run.finish();

        let duration_ms = start_time.elapsed().as_millis() as u64;
        event_bus.emit(ExecutionEvent::RunFinished {
            execution_id: run.execution_id(),
            success: run.error().is_none(),
            error: run.error().map(|e| e.to_string()),
            duration_ms,
            timestamp: Utc::now(),
        });
        tracing::info!(
            "Run {} finished as {:?} after {} steps in {}ms",
            run.execution_id(),
            run.state(),
            run.steps(),
            duration_ms
        );

        Ok(run.into_report(graph, trigger_id, duration_ms))
    }

    /// Execute one node. `Err` is reserved for failures that end the run.
    async fn step(
        &self,
        graph: &Graph,
        run: &mut ExecutionRun,
        event_bus: &EventBus,
        idx: NodeIndex,
        pulse_input: &str,
    ) -> Result<Step, RunError> {
        let node = graph.node(idx);
        let evaluator = DataflowEvaluator::new(graph, event_bus);

        run.enter(idx);
        let resolved = evaluator.resolve_inputs(run, idx).await;
        run.leave(idx);

        let inputs = match resolved {
            Ok(inputs) => inputs,
            Err(e @ RunError::CyclicDependency { .. }) => {
                run.set_status(graph, idx, NodeStatus::Failed(e.to_string()));
                return Err(e);
            }
            Err(e) => {
                self.fail(graph, run, event_bus, idx, e.to_string());
                return Ok(Step::Halted);
            }
        };

        let Some(runnable) = node.node.as_runnable() else {
            self.fail(graph, run, event_bus, idx, format!("node type {} cannot run", node.node_type));
            return Ok(Step::Halted);
        };

        let ctx = node_context(graph, run, event_bus, idx, inputs);
        run.set_status(graph, idx, NodeStatus::Running);
        event_bus.emit(ExecutionEvent::NodeStarted {
            execution_id: run.execution_id(),
            node_id: node.id,
            node_type: node.node_type.clone(),
            timestamp: Utc::now(),
        });

        let mut forward = Forward::new(node.pulse_outputs());
        let start = Instant::now();
        let result = with_timeout(
            graph.settings().node_timeout_ms,
            runnable.run(pulse_input, &ctx, &mut forward),
        )
        .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                tracing::info!("Node {} completed in {}ms", node.id, duration_ms);
                event_bus.emit(ExecutionEvent::NodeCompleted {
                    execution_id: run.execution_id(),
                    node_id: node.id,
                    outputs: output.outputs.clone(),
                    duration_ms,
                    timestamp: Utc::now(),
                });
                run.memoize(idx, output.outputs);
                run.set_status(graph, idx, NodeStatus::Completed);

                Ok(match forward.into_fired() {
                    Some(output) => Step::Forwarded(output),
                    None => Step::Halted,
                })
            }
            Err(e) => {
                self.fail(graph, run, event_bus, idx, e.to_string());
                Ok(Step::Halted)
            }
        }
    }

    fn fail(
        &self,
        graph: &Graph,
        run: &mut ExecutionRun,
        event_bus: &EventBus,
        idx: NodeIndex,
        reason: String,
    ) {
        let node_id = graph.node(idx).id;
        tracing::error!("Node {} failed: {}", node_id, reason);
        event_bus.emit(ExecutionEvent::NodeFailed {
            execution_id: run.execution_id(),
            node_id,
            error: reason.clone(),
            timestamp: Utc::now(),
        });
        run.memoize(idx, HashMap::new());
        run.set_status(graph, idx, NodeStatus::Failed(reason));
    }
}
