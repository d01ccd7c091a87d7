//! HTTP boundary of the automation engine

pub mod config;
pub mod error;
pub mod routes;

pub use config::ServerConfig;
pub use error::ApiError;

use actix_web::{error::InternalError, web, HttpResponse};
use autonodes::http::{HttpAiService, UnconfiguredAiService, WebhookMessageSender};
use autonodes::memory::LoggingMessageSender;
use autonodes::services::{AiService, MessageSender};
use autonodes::{ActionDispatcher, ActionServices};
use autoruntime::{FlowRuntime, NodeRegistry, RuntimeConfig};
use std::sync::Arc;

/// Application state shared across handlers
pub struct AppState {
    pub runtime: Arc<FlowRuntime>,
    pub dispatcher: Arc<ActionDispatcher>,
}

impl AppState {
    /// Wire collaborators from config; anything unconfigured stays in memory.
    pub fn from_config(config: &ServerConfig) -> Self {
        let messages: Arc<dyn MessageSender> = match &config.message_webhook_url {
            Some(url) => Arc::new(WebhookMessageSender::new(url.clone())),
            None => Arc::new(LoggingMessageSender::new()),
        };
        let ai: Arc<dyn AiService> = match &config.ai_endpoint {
            Some(endpoint) => Arc::new(HttpAiService::new(endpoint.clone(), config.ai_model.clone())),
            None => Arc::new(UnconfiguredAiService),
        };

        let services = ActionServices {
            messages,
            ai,
            link_settings: config.link_settings(),
            ..ActionServices::in_memory()
        };

        Self::new(
            services,
            RuntimeConfig {
                event_buffer_size: config.event_buffer_size,
            },
        )
    }

    pub fn new(services: ActionServices, runtime_config: RuntimeConfig) -> Self {
        let dispatcher = Arc::new(ActionDispatcher::new(services));

        let mut registry = NodeRegistry::new();
        autonodes::register_all(&mut registry, dispatcher.clone());

        Self {
            runtime: Arc::new(FlowRuntime::with_registry(Arc::new(registry), runtime_config)),
            dispatcher,
        }
    }
}

/// JSON extractor config: malformed bodies get the same error shape as
/// every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let body = serde_json::json!({
            "success": false,
            "error": format!("Invalid request body: {}", err),
            "code": "bad_request",
        });
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

/// Register every route plus the JSON error handler
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());
    routes::configure(cfg);
}
