//! Standard node library and the node action dispatcher
//!
//! Built-in nodes for triggers, data, transforms and debugging, plus one
//! `action.<tag>` node per dispatcher action.

pub mod actions;
pub mod http;
pub mod memory;
mod nodes;
pub mod services;

pub use actions::{ActionDispatcher, ActionError, ActionKind, ActionOutcome};
pub use nodes::*;
pub use services::ActionServices;

use autoruntime::NodeRegistry;
use std::sync::Arc;

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry, dispatcher: Arc<ActionDispatcher>) {
    registry.register(Arc::new(ManualTriggerNodeFactory));
    registry.register(Arc::new(ConstantNodeFactory));
    registry.register(Arc::new(JsonParseNodeFactory));
    registry.register(Arc::new(TemplateNodeFactory));
    registry.register(Arc::new(DebugNodeFactory));
    registry.register(Arc::new(ConditionNodeFactory::new(dispatcher.clone())));

    for kind in ActionKind::ALL {
        if kind == ActionKind::ConditionalEvaluation {
            continue;
        }
        registry.register(Arc::new(ActionNodeFactory::new(kind, dispatcher.clone())));
    }
}
