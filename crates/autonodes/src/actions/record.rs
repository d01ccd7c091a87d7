use super::{require, string_or_number, ActionError, ActionRequest};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecordUpdateRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    entity_id: Option<String>,
    entity_type: Option<String>,
    updates: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ActionRequest for RecordUpdateRequest {
    fn validate(&self) -> Result<(), ActionError> {
        require(&self.entity_id, "entityId")?;
        match &self.updates {
            Some(updates) if !updates.is_empty() => Ok(()),
            Some(_) => Err(ActionError::Validation("updates must not be empty".to_string())),
            None => Err(ActionError::Validation(
                "Missing required field: updates".to_string(),
            )),
        }
    }
}

/// Logs the intended update. Nothing is written to the record store yet.
pub(crate) async fn handle(request: RecordUpdateRequest) -> Result<serde_json::Value, ActionError> {
    let entity_id = require(&request.entity_id, "entityId")?;
    let fields: Vec<&String> = request
        .updates
        .as_ref()
        .map(|u| u.keys().collect())
        .unwrap_or_default();

    tracing::warn!(
        "Record update for {} {} not committed (fields: {:?})",
        request.entity_type.as_deref().unwrap_or("record"),
        entity_id,
        fields
    );

    Ok(json!({
        "entityId": entity_id,
        "entityType": request.entity_type,
        "fields": fields,
        "committed": false,
    }))
}
