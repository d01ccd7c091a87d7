use crate::{FlowError, Value, WorkflowError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type WorkflowId = Uuid;
pub type NodeId = Uuid;

/// Workflow document as authored in the visual editor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Nodes a run may start from
    #[serde(default)]
    pub triggers: Vec<NodeId>,
    #[serde(default)]
    pub settings: WorkflowSettings,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            connections: Vec::new(),
            triggers: Vec::new(),
            settings: WorkflowSettings::default(),
        }
    }

    pub fn add_node(&mut self, node: NodeSpec) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    /// Add a node and mark it as a trigger
    pub fn add_trigger(&mut self, node: NodeSpec) -> NodeId {
        let id = self.add_node(node);
        self.triggers.push(id);
        id
    }

    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: impl Into<String>,
        to_node: NodeId,
        to_port: impl Into<String>,
    ) {
        self.connections.push(Connection {
            from_node,
            from_port: from_port.into(),
            to_node,
            to_port: to_port.into(),
        });
    }

    pub fn find_node(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Parse an authored document. Only `id`, `name` and the node list are
    /// mandatory.
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        let workflow: Workflow = serde_json::from_str(json)?;
        if workflow.name.trim().is_empty() {
            return Err(WorkflowError::Invalid("workflow name is empty".to_string()).into());
        }
        Ok(workflow)
    }

    pub fn to_json_pretty(&self) -> Result<String, FlowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Node specification in a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub node_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: HashMap<String, Value>,
    #[serde(default)]
    pub position: Option<Position>,
}

impl NodeSpec {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_type: node_type.into(),
            name: None,
            config: HashMap::new(),
            position: None,
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Position { x, y });
        self
    }
}

/// Connection from an output socket to an input socket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub from_node: NodeId,
    pub from_port: String,
    pub to_node: NodeId,
    pub to_port: String,
}

/// Node position in visual editor
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Global workflow settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Upper bound on a single `produce` or `run` call
    #[serde(default)]
    pub node_timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_takes_defaults() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"id": "{}", "name": "Reminder", "nodes": [
                {{"id": "{}", "node_type": "debug.log"}}
            ]}}"#,
            Uuid::new_v4(),
            id
        );

        let workflow = Workflow::from_json(&json).unwrap();
        assert!(workflow.connections.is_empty());
        assert!(workflow.triggers.is_empty());
        assert!(workflow.settings.node_timeout_ms.is_none());
        assert!(workflow.find_node(id).unwrap().config.is_empty());
    }

    #[test]
    fn blank_name_is_invalid() {
        let json = format!(r#"{{"id": "{}", "name": " ", "nodes": []}}"#, Uuid::new_v4());
        assert!(matches!(
            Workflow::from_json(&json),
            Err(FlowError::Workflow(WorkflowError::Invalid(_)))
        ));
    }
}
