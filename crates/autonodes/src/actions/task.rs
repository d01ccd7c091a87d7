use super::{require, ActionError, ActionRequest};
use crate::services::{ActionServices, NewTask};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskRequest {
    description: Option<String>,
    assignee: Option<String>,
    due_date: Option<String>,
}

impl ActionRequest for TaskRequest {
    fn validate(&self) -> Result<(), ActionError> {
        require(&self.description, "description")?;
        Ok(())
    }
}

pub(crate) async fn handle(
    services: &ActionServices,
    request: TaskRequest,
) -> Result<serde_json::Value, ActionError> {
    let task = NewTask {
        description: require(&request.description, "description")?.to_string(),
        assignee: request.assignee,
        due_date: request.due_date,
    };

    let record = services.tasks.create_task(&task).await?;
    tracing::info!("Created task {} ({})", record.id, record.status);

    Ok(json!({
        "taskId": record.id,
        "status": record.status,
    }))
}
