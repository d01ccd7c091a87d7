//! Core abstractions for the automation engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: dynamic values, typed sockets, the node
//! capability traits, the authored workflow document and the error
//! taxonomy. It has no runtime dependencies.

mod error;
pub mod events;
mod node;
mod socket;
mod value;
mod workflow;

pub use error::{FlowError, GraphError, NodeError, RunError, WorkflowError};
pub use events::*;
pub use node::{
    Forward, Node, NodeContext, NodeMetadata, NodeOutput, NodeStatus, Producer, Runnable,
};
pub use socket::{SocketRegistry, SocketSpec, SocketType};
pub use value::Value;
pub use workflow::{Connection, NodeId, NodeSpec, Position, Workflow, WorkflowId, WorkflowSettings};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
