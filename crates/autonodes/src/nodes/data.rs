use async_trait::async_trait;
use autocore::{Node, NodeContext, NodeError, NodeOutput, Producer, SocketSpec, SocketType, Value};
use autoruntime::{NodeFactory, NodeMetadata};
use std::collections::HashMap;

/// Emits its configured `value` as JSON
pub struct ConstantNode;

impl Node for ConstantNode {
    fn node_type(&self) -> &str {
        "data.constant"
    }

    fn inputs(&self) -> Vec<SocketSpec> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::new("value", SocketType::JSON)]
    }

    fn as_producer(&self) -> Option<&dyn Producer> {
        Some(self)
    }
}

#[async_trait]
impl Producer for ConstantNode {
    async fn produce(&self, ctx: &NodeContext) -> Result<NodeOutput, NodeError> {
        let value = ctx.require_config("value")?;
        Ok(NodeOutput::new().with_output("value", Value::Json(super::plain_json(value))))
    }
}

pub struct ConstantNodeFactory;

impl NodeFactory for ConstantNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(ConstantNode))
    }

    fn node_type(&self) -> &str {
        "data.constant"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Constant value from config".to_string(),
            category: "data".to_string(),
        }
    }
}
