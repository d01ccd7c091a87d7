use async_trait::async_trait;
use autonodes::memory::{InMemoryRecordStore, InMemoryTaskTracker, LoggingMessageSender};
use autonodes::services::{
    LinkSettings, LinkStore, MessageReceipt, MessageSender, OutgoingMessage, ServiceError,
};
use autonodes::{ActionDispatcher, ActionError, ActionKind, ActionServices};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;

async fn dispatcher_with_jobs(records: Vec<serde_json::Value>) -> ActionDispatcher {
    let store = Arc::new(InMemoryRecordStore::new());
    for record in records {
        store.insert("jobs", record).await;
    }
    ActionDispatcher::new(ActionServices {
        records: store,
        ..ActionServices::in_memory()
    })
}

struct DownMessageSender;

#[async_trait]
impl MessageSender for DownMessageSender {
    async fn send(&self, _message: &OutgoingMessage) -> Result<MessageReceipt, ServiceError> {
        Err(ServiceError::Unavailable("mail relay down".to_string()))
    }
}

#[tokio::test]
async fn test_condition_compares_first_record() {
    let dispatcher = dispatcher_with_jobs(vec![json!({"priority": 5}), json!({"priority": 1})]).await;

    let gt = dispatcher
        .dispatch(
            "conditional-evaluation",
            json!({"dataSource": "jobs", "field": "priority", "operator": ">", "value": 3}),
        )
        .await
        .unwrap();
    assert_eq!(gt.get("result"), Some(&json!(true)));
    assert!(!gt.created);

    let lt = dispatcher
        .dispatch(
            "conditional-evaluation",
            json!({"dataSource": "jobs", "field": "priority", "operator": "<", "value": 3}),
        )
        .await
        .unwrap();
    assert_eq!(lt.get("result"), Some(&json!(false)));
}

#[tokio::test]
async fn test_condition_on_empty_collection_is_false() {
    let dispatcher = dispatcher_with_jobs(vec![]).await;
    let outcome = dispatcher
        .dispatch(
            "conditional-evaluation",
            json!({"dataSource": "jobs", "field": "priority", "operator": "is not null"}),
        )
        .await
        .unwrap();
    assert_eq!(outcome.get("result"), Some(&json!(false)));
    assert_eq!(outcome.get("recordFound"), Some(&json!(false)));
}

#[tokio::test]
async fn test_unsupported_operator_is_caller_fault() {
    let dispatcher = dispatcher_with_jobs(vec![json!({"priority": 5})]).await;
    let err = dispatcher
        .dispatch(
            "conditional-evaluation",
            json!({"dataSource": "jobs", "field": "priority", "operator": "LIKE", "value": "5%"}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::UnsupportedOperator(_)));
    assert!(err.is_caller_fault());
    assert_eq!(err.to_json()["success"], false);
}

#[tokio::test]
async fn test_link_defaults_to_fourteen_days() {
    let dispatcher = ActionDispatcher::new(ActionServices::in_memory());
    let before = Utc::now();
    let outcome = dispatcher
        .dispatch(
            "link-issuance",
            json!({"linkType": "quote", "title": "Heat pump quote", "resourceId": 812}),
        )
        .await
        .unwrap();

    assert!(outcome.created);
    let token = outcome.get("token").and_then(|v| v.as_str()).unwrap();
    assert_eq!(outcome.get("path"), Some(&json!(format!("/share/{}", token))));
    assert!(outcome.get("url").is_none());
    assert_eq!(outcome.get("passwordProtected"), Some(&json!(false)));

    let expires_at = outcome
        .get("expiresAt")
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .unwrap();
    let delta = expires_at.with_timezone(&Utc) - before;
    assert!(delta >= Duration::days(14) && delta < Duration::days(14) + Duration::minutes(1));

    let link = dispatcher
        .services()
        .links
        .find(token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.resource_id.as_deref(), Some("812"));
}

#[tokio::test]
async fn test_link_url_uses_public_base_and_hashes_password() {
    let dispatcher = ActionDispatcher::new(ActionServices {
        link_settings: LinkSettings {
            base_url: Some("https://crm.example.com/".to_string()),
            default_expiry_days: 14,
        },
        ..ActionServices::in_memory()
    });

    let outcome = dispatcher
        .dispatch(
            "link-issuance",
            json!({"linkType": "invoice", "title": "March invoice", "expiresInDays": 3, "password": "pw"}),
        )
        .await
        .unwrap();

    let token = outcome.get("token").and_then(|v| v.as_str()).unwrap();
    assert_eq!(
        outcome.get("url"),
        Some(&json!(format!("https://crm.example.com/share/{}", token)))
    );
    assert_eq!(outcome.get("expiresInDays"), Some(&json!(3)));

    let link = dispatcher.services().links.find(token).await.unwrap().unwrap();
    assert_ne!(link.password_hash.as_deref(), Some("pw"));
    assert!(autonodes::actions::verify_password(&link, "pw"));
}

#[tokio::test]
async fn test_link_rejects_zero_day_expiry() {
    let dispatcher = ActionDispatcher::new(ActionServices::in_memory());
    let err = dispatcher
        .dispatch(
            "link-issuance",
            json!({"linkType": "quote", "title": "Quote", "expiresInDays": 0}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Validation(_)));
}

#[tokio::test]
async fn test_link_rejects_oversized_expiry() {
    let dispatcher = ActionDispatcher::new(ActionServices::in_memory());
    let err = dispatcher
        .dispatch(
            "link-issuance",
            json!({"linkType": "offer", "title": "X", "expiresInDays": 1000000000}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Validation(_)));
    assert!(err.is_caller_fault());

    let longest = dispatcher
        .dispatch(
            "link-issuance",
            json!({"linkType": "offer", "title": "X", "expiresInDays": 3650}),
        )
        .await
        .unwrap();
    assert_eq!(longest.get("expiresInDays"), Some(&json!(3650)));
}

#[tokio::test]
async fn test_condition_compares_against_explicit_null() {
    let dispatcher =
        dispatcher_with_jobs(vec![json!({"priority": 2, "closedAt": null})]).await;

    let eq_null = dispatcher
        .dispatch(
            "conditional-evaluation",
            json!({"dataSource": "jobs", "field": "closedAt", "operator": "=", "value": null}),
        )
        .await
        .unwrap();
    assert_eq!(eq_null.get("result"), Some(&json!(true)));

    let ne_null = dispatcher
        .dispatch(
            "conditional-evaluation",
            json!({"dataSource": "jobs", "field": "priority", "operator": "!=", "value": null}),
        )
        .await
        .unwrap();
    assert_eq!(ne_null.get("result"), Some(&json!(true)));
}

#[tokio::test]
async fn test_missing_fields_are_validation_errors() {
    let dispatcher = ActionDispatcher::new(ActionServices::in_memory());

    let err = dispatcher
        .dispatch("messaging", json!({"recipient": "jane@example.com", "subject": "Visit"}))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing required field: body");
    assert_eq!(err.code(), "validation_error");

    let err = dispatcher
        .dispatch("task-creation", json!({"description": "   "}))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing required field: description");

    let err = dispatcher.dispatch("messaging", json!("hello")).await.unwrap_err();
    assert!(err.is_caller_fault());
}

#[tokio::test]
async fn test_messaging_and_task_creation_reach_collaborators() {
    let messages = Arc::new(LoggingMessageSender::new());
    let tasks = Arc::new(InMemoryTaskTracker::new());
    let dispatcher = ActionDispatcher::new(ActionServices {
        messages: messages.clone(),
        tasks: tasks.clone(),
        ..ActionServices::in_memory()
    });

    let sent = dispatcher
        .dispatch_kind(
            ActionKind::Messaging,
            json!({"recipient": "jane@example.com", "subject": "Visit", "body": "Tomorrow 9:00"}),
        )
        .await
        .unwrap();
    assert!(sent.get("messageId").is_some());
    assert_eq!(messages.sent().await[0].body, "Tomorrow 9:00");

    let task = dispatcher
        .dispatch(
            "task-creation",
            json!({"description": "Order filter", "assignee": "tech-3"}),
        )
        .await
        .unwrap();
    assert!(task.created);
    assert_eq!(task.get("status"), Some(&json!("open")));
    assert_eq!(tasks.len().await, 1);
}

#[tokio::test]
async fn test_downstream_failure_is_not_caller_fault() {
    let dispatcher = ActionDispatcher::new(ActionServices {
        messages: Arc::new(DownMessageSender),
        ..ActionServices::in_memory()
    });

    let err = dispatcher
        .dispatch(
            "messaging",
            json!({"recipient": "jane@example.com", "subject": "Visit", "body": "Hi"}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Downstream(_)));
    assert!(!err.is_caller_fault());
    assert_eq!(err.code(), "downstream_error");
}

#[tokio::test]
async fn test_unknown_action_and_unconfigured_ai() {
    let dispatcher = ActionDispatcher::new(ActionServices::in_memory());

    let err = dispatcher.dispatch("send-fax", json!({})).await.unwrap_err();
    assert!(matches!(err, ActionError::UnknownAction(_)));

    let err = dispatcher
        .dispatch("ai-prompt", json!({"prompt": "Summarize the visit"}))
        .await
        .unwrap_err();
    assert!(!err.is_caller_fault());
}

#[tokio::test]
async fn test_stub_actions_echo_their_input() {
    let dispatcher = ActionDispatcher::new(ActionServices::in_memory());

    let update = dispatcher
        .dispatch(
            "record-update",
            json!({"entityId": 17, "updates": {"status": "scheduled"}}),
        )
        .await
        .unwrap();
    assert_eq!(update.get("entityId"), Some(&json!("17")));
    assert_eq!(update.get("committed"), Some(&json!(false)));

    let command = dispatcher
        .dispatch("remote-command", json!({"command": "restart", "type": "thermostat"}))
        .await
        .unwrap();
    assert_eq!(command.get("status"), Some(&json!("completed")));
}
