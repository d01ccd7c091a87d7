use crate::actions::{ActionDispatcher, ActionKind};
use async_trait::async_trait;
use autocore::{
    Forward, Node, NodeContext, NodeError, NodeOutput, Producer, Runnable, SocketSpec, SocketType,
    Value,
};
use autoruntime::{NodeFactory, NodeMetadata};
use std::collections::HashMap;
use std::sync::Arc;

/// Conditional evaluation as a node: branches on `true`/`false` when
/// pulsed and also offers the boolean `result` to data consumers.
pub struct ConditionNode {
    dispatcher: Arc<ActionDispatcher>,
}

impl ConditionNode {
    pub fn new(dispatcher: Arc<ActionDispatcher>) -> Self {
        Self { dispatcher }
    }

    async fn evaluate(&self, ctx: &NodeContext) -> Result<bool, NodeError> {
        let kind = ActionKind::ConditionalEvaluation;
        let node_data = super::node_data(ctx, &kind.fields());

        let outcome = self
            .dispatcher
            .dispatch_kind(kind, node_data)
            .await
            .map_err(|e| NodeError::Action(e.to_string()))?;

        outcome
            .get("result")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| NodeError::ExecutionFailed("condition returned no result".to_string()))
    }
}

impl Node for ConditionNode {
    fn node_type(&self) -> &str {
        "logic.condition"
    }

    fn inputs(&self) -> Vec<SocketSpec> {
        let mut inputs = vec![SocketSpec::exec("in")];
        inputs.extend(
            ActionKind::ConditionalEvaluation
                .fields()
                .into_iter()
                .map(|field| SocketSpec::new(field.name, field.socket_type)),
        );
        inputs
    }

    fn outputs(&self) -> Vec<SocketSpec> {
        vec![
            SocketSpec::exec("true"),
            SocketSpec::exec("false"),
            SocketSpec::new("result", SocketType::BOOLEAN),
        ]
    }

    fn as_producer(&self) -> Option<&dyn Producer> {
        Some(self)
    }

    fn as_runnable(&self) -> Option<&dyn Runnable> {
        Some(self)
    }
}

#[async_trait]
impl Producer for ConditionNode {
    async fn produce(&self, ctx: &NodeContext) -> Result<NodeOutput, NodeError> {
        let result = self.evaluate(ctx).await?;
        Ok(NodeOutput::new().with_output("result", result))
    }
}

#[async_trait]
impl Runnable for ConditionNode {
    async fn run(
        &self,
        _pulse_input: &str,
        ctx: &NodeContext,
        forward: &mut Forward,
    ) -> Result<NodeOutput, NodeError> {
        let result = self.evaluate(ctx).await?;
        ctx.events.info(format!("Condition evaluated to {}", result));

        forward.forward(if result { "true" } else { "false" })?;
        Ok(NodeOutput::new().with_output("result", result))
    }
}

pub struct ConditionNodeFactory {
    dispatcher: Arc<ActionDispatcher>,
}

impl ConditionNodeFactory {
    pub fn new(dispatcher: Arc<ActionDispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl NodeFactory for ConditionNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(ConditionNode::new(self.dispatcher.clone())))
    }

    fn node_type(&self) -> &str {
        "logic.condition"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: ActionKind::ConditionalEvaluation.description().to_string(),
            category: "logic".to_string(),
        }
    }
}
