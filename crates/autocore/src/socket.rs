use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

/// Kind of plug a socket accepts. Two sockets connect only when their
/// types are equal, so `exec` only ever meets `exec`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketType(Cow<'static, str>);

impl SocketType {
    pub const EXEC: SocketType = SocketType(Cow::Borrowed("exec"));
    pub const TEXT: SocketType = SocketType(Cow::Borrowed("text"));
    pub const JSON: SocketType = SocketType(Cow::Borrowed("json"));
    pub const BOOLEAN: SocketType = SocketType(Cow::Borrowed("boolean"));
    pub const NUMBER: SocketType = SocketType(Cow::Borrowed("number"));
    pub const STRING: SocketType = SocketType(Cow::Borrowed("string"));

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_exec(&self) -> bool {
        *self == Self::EXEC
    }

    pub fn is_compatible(&self, other: &SocketType) -> bool {
        self == other
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named, typed connection point declared by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketSpec {
    pub name: String,
    pub socket_type: SocketType,
}

impl SocketSpec {
    pub fn new(name: impl Into<String>, socket_type: SocketType) -> Self {
        Self {
            name: name.into(),
            socket_type,
        }
    }

    pub fn exec(name: impl Into<String>) -> Self {
        Self::new(name, SocketType::EXEC)
    }

    pub fn is_exec(&self) -> bool {
        self.socket_type.is_exec()
    }
}

/// Set of socket types a graph may use.
#[derive(Debug, Clone, Default)]
pub struct SocketRegistry {
    types: BTreeSet<SocketType>,
}

impl SocketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with exec, text, json, boolean, number and string.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for builtin in [
            SocketType::EXEC,
            SocketType::TEXT,
            SocketType::JSON,
            SocketType::BOOLEAN,
            SocketType::NUMBER,
            SocketType::STRING,
        ] {
            registry.types.insert(builtin);
        }
        registry
    }

    /// Register a socket type by name. Registering the same name twice
    /// returns an equal type.
    pub fn register(&mut self, type_name: impl Into<String>) -> SocketType {
        let socket_type = SocketType(Cow::Owned(type_name.into()));
        self.types.insert(socket_type.clone());
        socket_type
    }

    pub fn lookup(&self, type_name: &str) -> Option<&SocketType> {
        self.types.iter().find(|t| t.name() == type_name)
    }

    pub fn contains(&self, socket_type: &SocketType) -> bool {
        self.types.contains(socket_type)
    }

    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(SocketType::name).collect()
    }
}
