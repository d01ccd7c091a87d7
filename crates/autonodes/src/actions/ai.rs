use super::{require, ActionError, ActionRequest};
use crate::services::{ActionServices, AiRequest};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct AiPromptRequest {
    prompt: Option<String>,
    model: Option<String>,
}

impl ActionRequest for AiPromptRequest {
    fn validate(&self) -> Result<(), ActionError> {
        require(&self.prompt, "prompt")?;
        Ok(())
    }
}

pub(crate) async fn handle(
    services: &ActionServices,
    request: AiPromptRequest,
) -> Result<serde_json::Value, ActionError> {
    let ai_request = AiRequest {
        prompt: require(&request.prompt, "prompt")?.to_string(),
        model: request.model,
    };

    let text = services.ai.complete(&ai_request).await?;

    Ok(json!({
        "text": text,
        "model": ai_request.model,
    }))
}
