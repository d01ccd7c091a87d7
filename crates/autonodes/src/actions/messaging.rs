use super::{require, ActionError, ActionRequest};
use crate::services::{ActionServices, OutgoingMessage};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct MessagingRequest {
    recipient: Option<String>,
    subject: Option<String>,
    body: Option<String>,
}

impl ActionRequest for MessagingRequest {
    fn validate(&self) -> Result<(), ActionError> {
        require(&self.recipient, "recipient")?;
        require(&self.subject, "subject")?;
        require(&self.body, "body")?;
        Ok(())
    }
}

/// Send once; a delivery failure is returned as-is, never retried.
pub(crate) async fn handle(
    services: &ActionServices,
    request: MessagingRequest,
) -> Result<serde_json::Value, ActionError> {
    let message = OutgoingMessage {
        recipient: require(&request.recipient, "recipient")?.to_string(),
        subject: require(&request.subject, "subject")?.to_string(),
        body: request.body.unwrap_or_default(),
    };

    let receipt = services.messages.send(&message).await?;

    Ok(json!({
        "messageId": receipt.message_id,
        "recipient": message.recipient,
    }))
}
