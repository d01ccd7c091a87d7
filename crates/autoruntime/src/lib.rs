//! Workflow execution runtime
//!
//! This crate compiles workflow documents into typed graphs and runs them:
//! the dataflow evaluator pulls data outputs on demand, the control-flow
//! executor walks execution pulses from a trigger.

mod evaluator;
mod executor;
mod graph;
mod registry;
mod run;
mod runtime;

pub use evaluator::DataflowEvaluator;
pub use executor::WorkflowExecutor;
pub use graph::{Edge, Graph, GraphBuilder, GraphNode};
pub use registry::{NodeDescriptor, NodeFactory, NodeMetadata, NodeRegistry};
pub use run::{ExecutionReport, ExecutionRun, LogEntry, RunState};
pub use runtime::{FlowRuntime, RuntimeConfig};
