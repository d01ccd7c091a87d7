use async_trait::async_trait;
use autocore::{
    Forward, Node, NodeContext, NodeError, NodeOutput, Producer, Runnable, SocketSpec, SocketType,
    Value,
};
use autoruntime::{NodeFactory, NodeMetadata};
use std::collections::HashMap;

/// Entry point of a workflow; exposes the run inputs as `payload`
pub struct ManualTriggerNode;

impl ManualTriggerNode {
    fn payload(ctx: &NodeContext) -> Value {
        Value::Json(serde_json::Value::Object(
            ctx.run_inputs
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        ))
    }
}

impl Node for ManualTriggerNode {
    fn node_type(&self) -> &str {
        "trigger.manual"
    }

    fn inputs(&self) -> Vec<SocketSpec> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<SocketSpec> {
        vec![
            SocketSpec::exec("out"),
            SocketSpec::new("payload", SocketType::JSON),
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
impl Producer for ManualTriggerNode {
    async fn produce(&self, ctx: &NodeContext) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::new().with_output("payload", Self::payload(ctx)))
    }
}

#[async_trait]
impl Runnable for ManualTriggerNode {
    async fn run(
        &self,
        _pulse_input: &str,
        ctx: &NodeContext,
        forward: &mut Forward,
    ) -> Result<NodeOutput, NodeError> {
        ctx.events.info(format!("Triggered with {} inputs", ctx.run_inputs.len()));
        forward.forward("out")?;
        Ok(NodeOutput::new().with_output("payload", Self::payload(ctx)))
    }
}

pub struct ManualTriggerNodeFactory;

impl NodeFactory for ManualTriggerNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(ManualTriggerNode))
    }

    fn node_type(&self) -> &str {
        "trigger.manual"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Start a run manually or from an API call".to_string(),
            category: "trigger".to_string(),
        }
    }
}
