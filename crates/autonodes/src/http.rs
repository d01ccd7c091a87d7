//! HTTP-backed collaborators
use crate::services::{
    AiRequest, AiService, MessageReceipt, MessageSender, OutgoingMessage, ServiceError,
};
use async_trait::async_trait;

/// Delivers messages by POSTing them as JSON to a webhook
pub struct WebhookMessageSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookMessageSender {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl MessageSender for WebhookMessageSender {
    async fn send(&self, message: &OutgoingMessage) -> Result<MessageReceipt, ServiceError> {
        tracing::info!("POST {} (message to {})", self.url, message.recipient);

        let response = self.client.post(&self.url).json(message).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Rejected(format!(
                "webhook returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message_id = body
            .get("id")
            .or_else(|| body.get("messageId"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(MessageReceipt { message_id })
    }
}

/// Forwards prompts to a completion endpoint; the response shape is opaque
/// apart from a `text` field.
pub struct HttpAiService {
    client: reqwest::Client,
    endpoint: String,
    default_model: Option<String>,
}

impl HttpAiService {
    pub fn new(endpoint: impl Into<String>, default_model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            default_model,
        }
    }
}

#[async_trait]
impl AiService for HttpAiService {
    async fn complete(&self, request: &AiRequest) -> Result<String, ServiceError> {
        let body = serde_json::json!({
            "prompt": request.prompt,
            "model": request.model.as_ref().or(self.default_model.as_ref()),
        });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Rejected(format!(
                "AI endpoint returned {}",
                status.as_u16()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        body.get("text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ServiceError::Rejected("AI response has no text".to_string()))
    }
}

/// Stand-in used when no AI endpoint is configured
pub struct UnconfiguredAiService;

#[async_trait]
impl AiService for UnconfiguredAiService {
    async fn complete(&self, _request: &AiRequest) -> Result<String, ServiceError> {
        Err(ServiceError::Unavailable(
            "no AI endpoint configured".to_string(),
        ))
    }
}
