use crate::actions::{ActionDispatcher, ActionKind};
use async_trait::async_trait;
use autocore::{
    Forward, Node, NodeContext, NodeError, NodeOutput, Runnable, SocketSpec, SocketType, Value,
};
use autoruntime::{NodeFactory, NodeMetadata};
use std::collections::HashMap;
use std::sync::Arc;

/// Runs one dispatcher action when pulsed. Every `nodeData` field is also
/// an input socket; wired values override the authored config.
pub struct ActionNode {
    kind: ActionKind,
    node_type: String,
    dispatcher: Arc<ActionDispatcher>,
}

impl ActionNode {
    pub fn new(kind: ActionKind, dispatcher: Arc<ActionDispatcher>) -> Self {
        Self {
            kind,
            node_type: format!("action.{}", kind.tag()),
            dispatcher,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }
}

impl Node for ActionNode {
    fn node_type(&self) -> &str {
        &self.node_type
    }

    fn inputs(&self) -> Vec<SocketSpec> {
        let mut inputs = vec![SocketSpec::exec("in")];
        inputs.extend(
            self.kind
                .fields()
                .into_iter()
                .map(|field| SocketSpec::new(field.name, field.socket_type)),
        );
        inputs
    }

    fn outputs(&self) -> Vec<SocketSpec> {
        vec![
            SocketSpec::exec("then"),
            SocketSpec::new("result", SocketType::JSON),
        ]
    }

    fn as_runnable(&self) -> Option<&dyn Runnable> {
        Some(self)
    }
}

#[async_trait]
impl Runnable for ActionNode {
    async fn run(
        &self,
        _pulse_input: &str,
        ctx: &NodeContext,
        forward: &mut Forward,
    ) -> Result<NodeOutput, NodeError> {
        let node_data = super::node_data(ctx, &self.kind.fields());

        let outcome = self
            .dispatcher
            .dispatch_kind(self.kind, node_data)
            .await
            .map_err(|e| NodeError::Action(e.to_string()))?;

        let result = serde_json::Value::Object(outcome.payload);
        ctx.events.data("result", Value::Json(result.clone()));

        forward.forward("then")?;
        Ok(NodeOutput::new().with_output("result", Value::Json(result)))
    }
}

pub struct ActionNodeFactory {
    kind: ActionKind,
    node_type: String,
    dispatcher: Arc<ActionDispatcher>,
}

impl ActionNodeFactory {
    pub fn new(kind: ActionKind, dispatcher: Arc<ActionDispatcher>) -> Self {
        Self {
            kind,
            node_type: format!("action.{}", kind.tag()),
            dispatcher,
        }
    }
}

impl NodeFactory for ActionNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(ActionNode::new(self.kind, self.dispatcher.clone())))
    }

    fn node_type(&self) -> &str {
        &self.node_type
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: self.kind.description().to_string(),
            category: "action".to_string(),
        }
    }
}
