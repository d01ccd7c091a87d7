use super::{require, ActionError, ActionRequest};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct RemoteCommandRequest {
    command: Option<String>,
    #[serde(rename = "type")]
    channel: Option<String>,
    args: Option<serde_json::Value>,
}

impl ActionRequest for RemoteCommandRequest {
    fn validate(&self) -> Result<(), ActionError> {
        require(&self.command, "command")?;
        require(&self.channel, "type")?;
        Ok(())
    }
}

/// Pass-through: logs the command and reports it completed. No channel
/// client is wired in yet, so nothing reaches a remote agent.
pub(crate) async fn handle(request: RemoteCommandRequest) -> Result<serde_json::Value, ActionError> {
    let command = require(&request.command, "command")?;
    let channel = require(&request.channel, "type")?;

    tracing::info!("Remote command '{}' on channel '{}'", command, channel);

    Ok(json!({
        "command": command,
        "type": channel,
        "args": request.args,
        "status": "completed",
    }))
}
