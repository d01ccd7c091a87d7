use async_trait::async_trait;
use autocore::{
    Forward, Node, NodeContext, NodeError, NodeOutput, Runnable, SocketSpec, SocketType, Value,
};
use autoruntime::{NodeFactory, NodeMetadata};
use std::collections::HashMap;

/// Logs its message and passes the pulse on
pub struct DebugNode;

impl Node for DebugNode {
    fn node_type(&self) -> &str {
        "debug.log"
    }

    fn inputs(&self) -> Vec<SocketSpec> {
        vec![
            SocketSpec::exec("in"),
            SocketSpec::new("message", SocketType::TEXT),
        ]
    }

    fn outputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::exec("then")]
    }

    fn as_runnable(&self) -> Option<&dyn Runnable> {
        Some(self)
    }
}

#[async_trait]
impl Runnable for DebugNode {
    async fn run(
        &self,
        _pulse_input: &str,
        ctx: &NodeContext,
        forward: &mut Forward,
    ) -> Result<NodeOutput, NodeError> {
        let message = ctx
            .input_or_config("message")
            .map(|v| match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_json().to_string(),
            })
            .unwrap_or_else(|| "(no message)".to_string());

        tracing::info!("DEBUG [{}]: {}", ctx.node_id, message);
        ctx.events.info(format!("DEBUG: {}", message));

        forward.forward("then")?;
        Ok(NodeOutput::new().with_output("message", message))
    }
}

pub struct DebugNodeFactory;

impl NodeFactory for DebugNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(DebugNode))
    }

    fn node_type(&self) -> &str {
        "debug.log"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Logs a message for debugging".to_string(),
            category: "debug".to_string(),
        }
    }
}
