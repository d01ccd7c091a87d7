use async_trait::async_trait;
use autocore::{
    EventBus, Forward, GraphError, Node, NodeContext, NodeError, NodeId, NodeOutput, NodeSpec,
    NodeStatus, Producer, Runnable, SocketRegistry, SocketSpec, SocketType, Value, Workflow,
};
use autoruntime::{
    FlowRuntime, GraphBuilder, NodeFactory, NodeRegistry, RunState, RuntimeConfig,
    WorkflowExecutor,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

struct Start;

#[async_trait]
impl Runnable for Start {
    async fn run(
        &self,
        _pulse: &str,
        _ctx: &NodeContext,
        forward: &mut Forward,
    ) -> Result<NodeOutput, NodeError> {
        forward.forward("out")?;
        Ok(NodeOutput::new())
    }
}

impl Node for Start {
    fn node_type(&self) -> &str {
        "test.start"
    }
    fn inputs(&self) -> Vec<SocketSpec> {
        vec![]
    }
    fn outputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::exec("out")]
    }
    fn as_runnable(&self) -> Option<&dyn Runnable> {
        Some(self)
    }
}

/// Producer that counts how often it is asked
struct Counter {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Producer for Counter {
    async fn produce(&self, _ctx: &NodeContext) -> Result<NodeOutput, NodeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(NodeOutput::new().with_output("value", 42.0 + n as f64))
    }
}

impl Node for Counter {
    fn node_type(&self) -> &str {
        "test.counter"
    }
    fn inputs(&self) -> Vec<SocketSpec> {
        vec![]
    }
    fn outputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::new("value", SocketType::NUMBER)]
    }
    fn as_producer(&self) -> Option<&dyn Producer> {
        Some(self)
    }
}

/// Producer copying its input, used to build data cycles
struct Echo;

#[async_trait]
impl Producer for Echo {
    async fn produce(&self, ctx: &NodeContext) -> Result<NodeOutput, NodeError> {
        let value = ctx.inputs.get("value").cloned().unwrap_or_default();
        Ok(NodeOutput::new().with_output("value", value))
    }
}

impl Node for Echo {
    fn node_type(&self) -> &str {
        "test.echo"
    }
    fn inputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::new("value", SocketType::NUMBER)]
    }
    fn outputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::new("value", SocketType::NUMBER)]
    }
    fn as_producer(&self) -> Option<&dyn Producer> {
        Some(self)
    }
}

struct BrokenProducer;

#[async_trait]
impl Producer for BrokenProducer {
    async fn produce(&self, _ctx: &NodeContext) -> Result<NodeOutput, NodeError> {
        Err(NodeError::ExecutionFailed("record store offline".into()))
    }
}

impl Node for BrokenProducer {
    fn node_type(&self) -> &str {
        "test.broken_producer"
    }
    fn inputs(&self) -> Vec<SocketSpec> {
        vec![]
    }
    fn outputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::new("value", SocketType::NUMBER)]
    }
    fn as_producer(&self) -> Option<&dyn Producer> {
        Some(self)
    }
}

/// Runnable that records the value it saw and forwards `then`
struct Sink;

#[async_trait]
impl Runnable for Sink {
    async fn run(
        &self,
        _pulse: &str,
        ctx: &NodeContext,
        forward: &mut Forward,
    ) -> Result<NodeOutput, NodeError> {
        let seen = ctx.inputs.get("value").cloned().unwrap_or_default();
        forward.forward("then")?;
        Ok(NodeOutput::new().with_output("seen", seen))
    }
}

impl Node for Sink {
    fn node_type(&self) -> &str {
        "test.sink"
    }
    fn inputs(&self) -> Vec<SocketSpec> {
        vec![
            SocketSpec::exec("in"),
            SocketSpec::new("value", SocketType::NUMBER),
        ]
    }
    fn outputs(&self) -> Vec<SocketSpec> {
        vec![
            SocketSpec::exec("then"),
            SocketSpec::new("seen", SocketType::NUMBER),
        ]
    }
    fn as_runnable(&self) -> Option<&dyn Runnable> {
        Some(self)
    }
}

struct Failing;

#[async_trait]
impl Runnable for Failing {
    async fn run(
        &self,
        _pulse: &str,
        _ctx: &NodeContext,
        _forward: &mut Forward,
    ) -> Result<NodeOutput, NodeError> {
        Err(NodeError::ExecutionFailed("mail server rejected message".into()))
    }
}

impl Node for Failing {
    fn node_type(&self) -> &str {
        "test.failing"
    }
    fn inputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::exec("in")]
    }
    fn outputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::exec("then")]
    }
    fn as_runnable(&self) -> Option<&dyn Runnable> {
        Some(self)
    }
}

struct Fixture {
    sockets: SocketRegistry,
    bus: EventBus,
}

impl Fixture {
    fn new() -> Self {
        Self {
            sockets: SocketRegistry::with_builtins(),
            bus: EventBus::new(256),
        }
    }

    fn builder(&self) -> GraphBuilder<'_> {
        GraphBuilder::new(&self.sockets)
    }
}

fn add(builder: &mut GraphBuilder<'_>, node: Box<dyn Node>) -> NodeId {
    let id = Uuid::new_v4();
    builder.add_node(id, None, HashMap::new(), node).unwrap();
    id
}

#[tokio::test]
async fn test_producer_with_three_consumers_runs_once() {
    let fixture = Fixture::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut builder = fixture.builder();

    let start = add(&mut builder, Box::new(Start));
    let counter = add(&mut builder, Box::new(Counter { calls: calls.clone() }));
    let sinks: Vec<NodeId> = (0..3).map(|_| add(&mut builder, Box::new(Sink))).collect();

    builder.connect(start, "out", sinks[0], "in").unwrap();
    builder.connect(sinks[0], "then", sinks[1], "in").unwrap();
    builder.connect(sinks[1], "then", sinks[2], "in").unwrap();
    for sink in &sinks {
        builder.connect(counter, "value", *sink, "value").unwrap();
    }
    builder.add_trigger(start).unwrap();
    let graph = builder.build().unwrap();

    let report = WorkflowExecutor::new()
        .execute(&graph, None, &fixture.bus, HashMap::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for sink in &sinks {
        assert_eq!(report.output(*sink, "seen"), Some(&Value::Number(42.0)));
    }
}

#[tokio::test]
async fn test_data_cycle_fails_run_with_cyclic_dependency() {
    let fixture = Fixture::new();
    let mut builder = fixture.builder();

    let start = add(&mut builder, Box::new(Start));
    let sink = add(&mut builder, Box::new(Sink));
    let a = add(&mut builder, Box::new(Echo));
    let b = add(&mut builder, Box::new(Echo));

    builder.connect(start, "out", sink, "in").unwrap();
    builder.connect(a, "value", sink, "value").unwrap();
    builder.connect(b, "value", a, "value").unwrap();
    builder.connect(a, "value", b, "value").unwrap();
    builder.add_trigger(start).unwrap();
    let graph = builder.build().unwrap();

    let report = WorkflowExecutor::new()
        .execute(&graph, Some(start), &fixture.bus, HashMap::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Failed);
    assert!(report.error.as_ref().unwrap().contains("Cyclic dependency"));
    assert_eq!(report.status_of(start), NodeStatus::Completed);
    assert!(report.status_of(sink).is_failed());
}

#[tokio::test]
async fn test_node_wired_to_its_own_output_is_cyclic() {
    let fixture = Fixture::new();
    let mut builder = fixture.builder();

    let start = add(&mut builder, Box::new(Start));
    let sink = add(&mut builder, Box::new(Sink));
    builder.connect(start, "out", sink, "in").unwrap();
    builder.connect(sink, "seen", sink, "value").unwrap();
    builder.add_trigger(start).unwrap();
    let graph = builder.build().unwrap();

    let report = WorkflowExecutor::new()
        .execute(&graph, None, &fixture.bus, HashMap::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Failed);
    assert!(report.error.unwrap().contains(&sink.to_string()));
}

#[tokio::test]
async fn test_failed_branch_does_not_block_sibling() {
    let fixture = Fixture::new();
    let mut builder = fixture.builder();

    let start = add(&mut builder, Box::new(Start));
    let failing = add(&mut builder, Box::new(Failing));
    let after_failing = add(&mut builder, Box::new(Sink));
    let sibling = add(&mut builder, Box::new(Sink));
    let sibling_next = add(&mut builder, Box::new(Sink));

    builder.connect(start, "out", failing, "in").unwrap();
    builder.connect(failing, "then", after_failing, "in").unwrap();
    builder.connect(start, "out", sibling, "in").unwrap();
    builder.connect(sibling, "then", sibling_next, "in").unwrap();
    builder.add_trigger(start).unwrap();
    let graph = builder.build().unwrap();

    let report = WorkflowExecutor::new()
        .execute(&graph, None, &fixture.bus, HashMap::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(
        report.status_of(failing),
        NodeStatus::Failed("Execution failed: mail server rejected message".into())
    );
    assert_eq!(report.status_of(after_failing), NodeStatus::Waiting);
    assert_eq!(report.status_of(sibling), NodeStatus::Completed);
    assert_eq!(report.status_of(sibling_next), NodeStatus::Completed);
    assert_eq!(report.failed_nodes(), vec![failing]);

    // The failure is in the log, followed by the sibling branch.
    let order: Vec<(NodeId, NodeStatus)> = report
        .log
        .iter()
        .filter(|e| e.status != NodeStatus::Running)
        .map(|e| (e.node_id, e.status.clone()))
        .collect();
    assert_eq!(order[0], (start, NodeStatus::Completed));
    assert_eq!(order[1].0, failing);
    assert_eq!(order[2], (sibling, NodeStatus::Completed));
    assert_eq!(order[3], (sibling_next, NodeStatus::Completed));
}

#[tokio::test]
async fn test_failed_producer_resolves_to_empty_value() {
    let fixture = Fixture::new();
    let mut builder = fixture.builder();

    let start = add(&mut builder, Box::new(Start));
    let broken = add(&mut builder, Box::new(BrokenProducer));
    let sink = add(&mut builder, Box::new(Sink));
    builder.connect(start, "out", sink, "in").unwrap();
    builder.connect(broken, "value", sink, "value").unwrap();
    builder.add_trigger(start).unwrap();
    let graph = builder.build().unwrap();

    let report = WorkflowExecutor::new()
        .execute(&graph, None, &fixture.bus, HashMap::new())
        .await
        .unwrap();

    assert!(report.status_of(broken).is_failed());
    assert_eq!(report.status_of(sink), NodeStatus::Completed);
    assert_eq!(report.output(sink, "seen"), Some(&Value::Null));
}

#[tokio::test]
async fn test_steps_bounded_by_node_count() {
    let fixture = Fixture::new();
    let mut builder = fixture.builder();

    let start = add(&mut builder, Box::new(Start));
    let mut frontier = vec![(start, "out")];
    let mut total = 1;
    // Binary fan-out, three levels deep.
    for _ in 0..3 {
        let mut next = Vec::new();
        for (parent, port) in frontier {
            for _ in 0..2 {
                let child = add(&mut builder, Box::new(Sink));
                builder.connect(parent, port, child, "in").unwrap();
                next.push((child, "then"));
                total += 1;
            }
        }
        frontier = next;
    }
    builder.add_trigger(start).unwrap();
    let graph = builder.build().unwrap();

    let report = WorkflowExecutor::new()
        .execute(&graph, None, &fixture.bus, HashMap::new())
        .await
        .unwrap();

    assert_eq!(graph.node_count(), total);
    assert_eq!(report.steps, total);
    assert!(report.steps <= graph.node_count());
    assert!(report.is_success());
}

#[test]
fn test_type_mismatch_rejected_at_construction() {
    let fixture = Fixture::new();
    let mut builder = fixture.builder();

    let start = add(&mut builder, Box::new(Start));
    let sink = add(&mut builder, Box::new(Sink));

    let err = builder.connect(start, "out", sink, "value").unwrap_err();
    assert!(matches!(err, GraphError::TypeMismatch { ref from_type, ref to_type, .. }
        if from_type == "exec" && to_type == "number"));
}

#[test]
fn test_input_accepts_single_connection() {
    let fixture = Fixture::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut builder = fixture.builder();

    let first = add(&mut builder, Box::new(Counter { calls: calls.clone() }));
    let second = add(&mut builder, Box::new(Counter { calls }));
    let sink = add(&mut builder, Box::new(Sink));

    builder.connect(first, "value", sink, "value").unwrap();
    let err = builder.connect(second, "value", sink, "value").unwrap_err();
    assert!(matches!(err, GraphError::InputAlreadyConnected { .. }));
}

#[test]
fn test_pulse_cycle_rejected_at_build() {
    let fixture = Fixture::new();
    let mut builder = fixture.builder();

    let a = add(&mut builder, Box::new(Sink));
    let b = add(&mut builder, Box::new(Sink));
    builder.connect(a, "then", b, "in").unwrap();
    builder.connect(b, "then", a, "in").unwrap();

    assert_eq!(builder.build().unwrap_err(), GraphError::CyclicPulseGraph);
}

#[test]
fn test_unregistered_socket_type_rejected() {
    let sockets = SocketRegistry::new();
    let mut builder = GraphBuilder::new(&sockets);
    let err = builder
        .add_node(Uuid::new_v4(), None, HashMap::new(), Box::new(Start))
        .unwrap_err();
    assert!(matches!(err, GraphError::UnknownSocketType { .. }));
}

struct TestFactory {
    node_type: &'static str,
    make: fn() -> Box<dyn Node>,
}

impl NodeFactory for TestFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok((self.make)())
    }

    fn node_type(&self) -> &str {
        self.node_type
    }
}

fn runtime() -> FlowRuntime {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(TestFactory {
        node_type: "test.start",
        make: || Box::new(Start),
    }));
    registry.register(Arc::new(TestFactory {
        node_type: "test.sink",
        make: || Box::new(Sink),
    }));
    FlowRuntime::with_registry(Arc::new(registry), RuntimeConfig::default())
}

#[tokio::test]
async fn test_runtime_runs_registered_workflow() {
    let runtime = runtime();
    let mut workflow = Workflow::new("Maintenance reminder");
    let start = workflow.add_trigger(NodeSpec::new("test.start"));
    let sink = workflow.add_node(NodeSpec::new("test.sink"));
    workflow.connect(start, "out", sink, "in");

    let mut events = runtime.subscribe_events();
    let id = runtime.register_workflow(workflow).await.unwrap();
    let report = runtime
        .execute_workflow(id, None, HashMap::new())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.workflow_id, id);
    assert!(matches!(
        events.recv().await.unwrap(),
        autocore::ExecutionEvent::RunStarted { .. }
    ));
}

#[tokio::test]
async fn test_runtime_rejects_unknown_node_type_and_trigger() {
    let runtime = runtime();
    let mut workflow = Workflow::new("Broken");
    workflow.add_node(NodeSpec::new("test.missing"));
    assert!(runtime.register_workflow(workflow).await.is_err());

    let mut workflow = Workflow::new("No such trigger");
    workflow.add_trigger(NodeSpec::new("test.start"));
    let err = runtime
        .execute(&workflow, Some(Uuid::new_v4()), HashMap::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Unknown trigger"));
}
