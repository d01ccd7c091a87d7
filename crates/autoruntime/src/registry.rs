use autocore::{GraphError, Node, NodeError, SocketSpec, Value};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating node instances
pub trait NodeFactory: Send + Sync {
    /// Create a new instance of the node with given configuration.
    ///
    /// Must not perform side effects; those belong in `produce`/`run`.
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError>;

    /// Get node type identifier
    fn node_type(&self) -> &str;

    /// Optional: Get node metadata (description, category)
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::default()
    }
}

/// Metadata about a node type
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub description: String,
    pub category: String,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

/// Palette entry for the editor: what a node type is and which plugs it
/// draws.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDescriptor {
    pub node_type: String,
    pub description: String,
    pub category: String,
    pub inputs: Vec<SocketSpec>,
    pub outputs: Vec<SocketSpec>,
    pub producer: bool,
    pub runnable: bool,
}

/// Registry of available node types
pub struct NodeRegistry {
    factories: HashMap<String, Arc<dyn NodeFactory>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a node factory
    pub fn register(&mut self, factory: Arc<dyn NodeFactory>) {
        let node_type = factory.node_type().to_string();
        tracing::debug!("Registering node type: {}", node_type);
        self.factories.insert(node_type, factory);
    }

    /// Create a node instance from a node type and config
    pub fn create_node(
        &self,
        node_type: &str,
        config: &HashMap<String, Value>,
    ) -> Result<Box<dyn Node>, GraphError> {
        let factory = self
            .factories
            .get(node_type)
            .ok_or_else(|| GraphError::UnknownNodeType(node_type.to_string()))?;

        factory.create(config).map_err(|e| GraphError::NodeCreation {
            node: node_type.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.factories.contains_key(node_type)
    }

    /// Get all registered node types, sorted
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<NodeMetadata> {
        self.factories.get(node_type).map(|f| f.metadata())
    }

    /// Sockets and capabilities of a node type, read from an instance built
    /// with empty config. `None` if the type is unknown or needs config to
    /// be built.
    pub fn describe(&self, node_type: &str) -> Option<NodeDescriptor> {
        let factory = self.factories.get(node_type)?;
        let node = factory.create(&HashMap::new()).ok()?;
        let metadata = factory.metadata();

        Some(NodeDescriptor {
            node_type: node_type.to_string(),
            description: metadata.description,
            category: metadata.category,
            inputs: node.inputs(),
            outputs: node.outputs(),
            producer: node.as_producer().is_some(),
            runnable: node.as_runnable().is_some(),
        })
    }

    /// Every describable node type, sorted by type tag
    pub fn describe_all(&self) -> Vec<NodeDescriptor> {
        self.list_node_types()
            .iter()
            .filter_map(|node_type| self.describe(node_type))
            .collect()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
