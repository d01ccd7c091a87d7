//! Node action dispatcher
//!
//! Routes a node-type tag to the handler that performs its side effect.
//! Every tag maps to one [`ActionKind`] variant, and every variant to one
//! typed request with its own validation, so adding an action is a
//! compile-checked change.

mod ai;
mod condition;
mod link;
mod messaging;
mod record;
mod remote;
mod task;

pub use condition::Operator;
pub use link::{generate_token, join_url, verify_password};

use crate::services::{ActionServices, ServiceError};
use autocore::SocketType;
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Result of dispatching one action
pub type NodeResult = Result<ActionOutcome, ActionError>;

#[derive(Error, Debug, Clone)]
pub enum ActionError {
    #[error("{0}")]
    Validation(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("{0}")]
    Downstream(#[from] ServiceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::Validation(_) => "validation_error",
            ActionError::UnsupportedOperator(_) => "unsupported_operator",
            ActionError::UnknownAction(_) => "unknown_action",
            ActionError::Downstream(_) => "downstream_error",
            ActionError::Internal(_) => "internal_error",
        }
    }

    /// Whether the caller's input caused the failure (HTTP 400 vs 500)
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            ActionError::Validation(_)
                | ActionError::UnsupportedOperator(_)
                | ActionError::UnknownAction(_)
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "code": self.code(),
        })
    }
}

/// Every action the dispatcher knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Messaging,
    TaskCreation,
    RecordUpdate,
    ConditionalEvaluation,
    LinkIssuance,
    RemoteCommand,
    AiPrompt,
}

/// A field of an action's `nodeData`, exposed as a node input socket
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub socket_type: SocketType,
    pub required: bool,
}

impl FieldSpec {
    fn required(name: &'static str, socket_type: SocketType) -> Self {
        Self {
            name,
            socket_type,
            required: true,
        }
    }

    fn optional(name: &'static str, socket_type: SocketType) -> Self {
        Self {
            name,
            socket_type,
            required: false,
        }
    }
}

impl ActionKind {
    pub const ALL: [ActionKind; 7] = [
        ActionKind::Messaging,
        ActionKind::TaskCreation,
        ActionKind::RecordUpdate,
        ActionKind::ConditionalEvaluation,
        ActionKind::LinkIssuance,
        ActionKind::RemoteCommand,
        ActionKind::AiPrompt,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ActionKind::Messaging => "messaging",
            ActionKind::TaskCreation => "task-creation",
            ActionKind::RecordUpdate => "record-update",
            ActionKind::ConditionalEvaluation => "conditional-evaluation",
            ActionKind::LinkIssuance => "link-issuance",
            ActionKind::RemoteCommand => "remote-command",
            ActionKind::AiPrompt => "ai-prompt",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ActionKind::Messaging => "Send a message to a recipient",
            ActionKind::TaskCreation => "Create a tracked task",
            ActionKind::RecordUpdate => "Apply a partial update to a record (not committed yet)",
            ActionKind::ConditionalEvaluation => "Compare a record field against a literal",
            ActionKind::LinkIssuance => "Issue a shareable, expiring link",
            ActionKind::RemoteCommand => "Forward a command to a remote channel",
            ActionKind::AiPrompt => "Ask the AI service for a completion",
        }
    }

    /// Fields of the action's `nodeData`, in declaration order
    pub fn fields(&self) -> Vec<FieldSpec> {
        match self {
            ActionKind::Messaging => vec![
                FieldSpec::required("recipient", SocketType::STRING),
                FieldSpec::required("subject", SocketType::STRING),
                FieldSpec::required("body", SocketType::TEXT),
            ],
            ActionKind::TaskCreation => vec![
                FieldSpec::required("description", SocketType::TEXT),
                FieldSpec::optional("assignee", SocketType::STRING),
                FieldSpec::optional("dueDate", SocketType::STRING),
            ],
            ActionKind::RecordUpdate => vec![
                FieldSpec::required("entityId", SocketType::STRING),
                FieldSpec::required("updates", SocketType::JSON),
                FieldSpec::optional("entityType", SocketType::STRING),
            ],
            ActionKind::ConditionalEvaluation => vec![
                FieldSpec::required("dataSource", SocketType::STRING),
                FieldSpec::required("field", SocketType::STRING),
                FieldSpec::required("operator", SocketType::STRING),
                FieldSpec::optional("value", SocketType::JSON),
            ],
            ActionKind::LinkIssuance => vec![
                FieldSpec::required("linkType", SocketType::STRING),
                FieldSpec::required("title", SocketType::STRING),
                FieldSpec::optional("description", SocketType::TEXT),
                FieldSpec::optional("expiresInDays", SocketType::NUMBER),
                FieldSpec::optional("password", SocketType::STRING),
                FieldSpec::optional("resourceId", SocketType::STRING),
            ],
            ActionKind::RemoteCommand => vec![
                FieldSpec::required("command", SocketType::STRING),
                FieldSpec::required("type", SocketType::STRING),
                FieldSpec::optional("args", SocketType::JSON),
            ],
            ActionKind::AiPrompt => vec![
                FieldSpec::required("prompt", SocketType::TEXT),
                FieldSpec::optional("model", SocketType::STRING),
            ],
        }
    }

    /// Whether success means a new resource was created (HTTP 201)
    pub fn creates_resource(&self) -> bool {
        matches!(self, ActionKind::TaskCreation | ActionKind::LinkIssuance)
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| ActionError::UnknownAction(tag.to_string()))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Successful action result
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    pub created: bool,
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl ActionOutcome {
    fn new(kind: ActionKind, payload: serde_json::Value) -> Self {
        let payload = match payload {
            serde_json::Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("result".to_string(), other);
                map
            }
        };
        Self {
            kind,
            created: kind.creates_resource(),
            payload,
        }
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.payload.get(field)
    }

    /// `{success: true, ...payload}`
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert("success".to_string(), serde_json::Value::Bool(true));
        body.extend(self.payload.clone());
        serde_json::Value::Object(body)
    }
}

/// Typed `nodeData` of one action
pub(crate) trait ActionRequest: DeserializeOwned {
    fn validate(&self) -> Result<(), ActionError>;
}

/// Routes type tags to action handlers
#[derive(Clone)]
pub struct ActionDispatcher {
    services: ActionServices,
}

impl ActionDispatcher {
    pub fn new(services: ActionServices) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &ActionServices {
        &self.services
    }

    pub async fn dispatch(&self, tag: &str, node_data: serde_json::Value) -> NodeResult {
        let kind: ActionKind = tag.parse()?;
        self.dispatch_kind(kind, node_data).await
    }

    pub async fn dispatch_kind(&self, kind: ActionKind, node_data: serde_json::Value) -> NodeResult {
        tracing::info!("Dispatching action {}", kind);

        let services = &self.services;
        let result = match kind {
            ActionKind::Messaging => messaging::handle(services, parse(node_data)?).await,
            ActionKind::TaskCreation => task::handle(services, parse(node_data)?).await,
            ActionKind::RecordUpdate => record::handle(parse(node_data)?).await,
            ActionKind::ConditionalEvaluation => {
                condition::handle(services, parse(node_data)?).await
            }
            ActionKind::LinkIssuance => link::handle(services, parse(node_data)?).await,
            ActionKind::RemoteCommand => remote::handle(parse(node_data)?).await,
            ActionKind::AiPrompt => ai::handle(services, parse(node_data)?).await,
        };

        match &result {
            Ok(_) => tracing::debug!("Action {} succeeded", kind),
            Err(e) if e.is_caller_fault() => tracing::warn!("Action {} rejected: {}", kind, e),
            Err(e) => tracing::error!("Action {} failed: {}", kind, e),
        }

        result.map(|payload| ActionOutcome::new(kind, payload))
    }
}

fn parse<T: ActionRequest>(node_data: serde_json::Value) -> Result<T, ActionError> {
    let node_data = match node_data {
        serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
        obj @ serde_json::Value::Object(_) => obj,
        _ => return Err(ActionError::Validation("nodeData must be an object".to_string())),
    };
    let request: T = serde_json::from_value(node_data)
        .map_err(|e| ActionError::Validation(format!("Invalid nodeData: {}", e)))?;
    request.validate()?;
    Ok(request)
}

/// Non-blank value of a required text field
pub(crate) fn require<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ActionError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ActionError::Validation(format!("Missing required field: {}", field)))
}

/// Text fields may arrive as JSON numbers (record ids); accept both.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
