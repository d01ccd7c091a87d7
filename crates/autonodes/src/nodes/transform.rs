use async_trait::async_trait;
use autocore::{Node, NodeContext, NodeError, NodeOutput, Producer, SocketSpec, SocketType, Value};
use autoruntime::{NodeFactory, NodeMetadata};
use minijinja::Environment;
use std::collections::HashMap;

/// Parse JSON text
pub struct JsonParseNode;

impl Node for JsonParseNode {
    fn node_type(&self) -> &str {
        "transform.json_parse"
    }

    fn inputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::new("json", SocketType::TEXT)]
    }

    fn outputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::new("parsed", SocketType::JSON)]
    }

    fn as_producer(&self) -> Option<&dyn Producer> {
        Some(self)
    }
}

#[async_trait]
impl Producer for JsonParseNode {
    async fn produce(&self, ctx: &NodeContext) -> Result<NodeOutput, NodeError> {
        let input = ctx
            .input_or_config("json")
            .ok_or_else(|| NodeError::MissingInput("json".to_string()))?;
        let text = input.as_str().ok_or_else(|| NodeError::InvalidInputType {
            field: "json".to_string(),
            expected: "string".to_string(),
            actual: input.type_name().to_string(),
        })?;

        let parsed: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| NodeError::ExecutionFailed(format!("JSON parse error: {}", e)))?;

        Ok(NodeOutput::new().with_output("parsed", Value::Json(parsed)))
    }
}

pub struct JsonParseNodeFactory;

impl NodeFactory for JsonParseNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(JsonParseNode))
    }

    fn node_type(&self) -> &str {
        "transform.json_parse"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Parse JSON string".to_string(),
            category: "transform".to_string(),
        }
    }
}

/// Renders a minijinja template against the `values` input and the run
/// inputs. Keys in `values` shadow run inputs of the same name; undefined
/// variables render empty.
pub struct TemplateNode;

impl Node for TemplateNode {
    fn node_type(&self) -> &str {
        "transform.template"
    }

    fn inputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::new("values", SocketType::JSON)]
    }

    fn outputs(&self) -> Vec<SocketSpec> {
        vec![SocketSpec::new("text", SocketType::TEXT)]
    }

    fn as_producer(&self) -> Option<&dyn Producer> {
        Some(self)
    }
}

pub fn render_template(
    template: &str,
    variables: &serde_json::Map<String, serde_json::Value>,
) -> Result<String, NodeError> {
    let env = Environment::new();
    env.render_str(template, minijinja::Value::from_serialize(variables))
        .map_err(|e| NodeError::ExecutionFailed(format!("Template error: {}", e)))
}

#[async_trait]
impl Producer for TemplateNode {
    async fn produce(&self, ctx: &NodeContext) -> Result<NodeOutput, NodeError> {
        let template = ctx
            .require_config("template")?
            .as_str()
            .ok_or_else(|| NodeError::Configuration("template must be a string".to_string()))?;

        let mut variables: serde_json::Map<String, serde_json::Value> = ctx
            .run_inputs
            .iter()
            .map(|(k, v)| (k.clone(), super::plain_json(v)))
            .collect();

        match ctx.input_or_config("values").map(super::plain_json) {
            Some(serde_json::Value::Object(values)) => variables.extend(values),
            Some(serde_json::Value::Null) | None => {}
            Some(other) => {
                return Err(NodeError::InvalidInputType {
                    field: "values".to_string(),
                    expected: "object".to_string(),
                    actual: Value::Json(other).type_name().to_string(),
                })
            }
        }

        let text = render_template(template, &variables)?;
        Ok(NodeOutput::new().with_output("text", text))
    }
}

pub struct TemplateNodeFactory;

impl NodeFactory for TemplateNodeFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        match config.get("template") {
            Some(Value::String(_)) | None => Ok(Box::new(TemplateNode)),
            Some(other) => Err(NodeError::Configuration(format!(
                "template must be a string, got {}",
                other.type_name()
            ))),
        }
    }

    fn node_type(&self) -> &str {
        "transform.template"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Render a text template from values and run inputs".to_string(),
            category: "transform".to_string(),
        }
    }
}
