//! Built-in node types

mod action;
mod condition;
mod data;
mod debug;
mod transform;
mod trigger;

pub use action::{ActionNode, ActionNodeFactory};
pub use condition::{ConditionNode, ConditionNodeFactory};
pub use data::{ConstantNode, ConstantNodeFactory};
pub use debug::{DebugNode, DebugNodeFactory};
pub use transform::{JsonParseNode, JsonParseNodeFactory, TemplateNode, TemplateNodeFactory};
pub use trigger::{ManualTriggerNode, ManualTriggerNodeFactory};

use crate::actions::FieldSpec;
use autocore::{NodeContext, Value};

/// Plain JSON for a socket value. Whole numbers stay integers so ids
/// read back as `5`, not `5.0`.
pub(crate) fn plain_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            serde_json::Value::from(*n as i64)
        }
        other => other.to_json(),
    }
}

/// Build an action's `nodeData`: authored config, overridden by wired
/// inputs that carry a value.
pub(crate) fn node_data(ctx: &NodeContext, fields: &[FieldSpec]) -> serde_json::Value {
    let mut data: serde_json::Map<String, serde_json::Value> = ctx
        .config
        .iter()
        .map(|(k, v)| (k.clone(), plain_json(v)))
        .collect();

    for field in fields {
        if let Some(value) = ctx.inputs.get(field.name).filter(|v| !v.is_null()) {
            data.insert(field.name.to_string(), plain_json(value));
        }
    }

    serde_json::Value::Object(data)
}
