use actix_web::{http::StatusCode, test, web, App};
use autocore::{NodeSpec, Workflow};
use autonodes::memory::InMemoryRecordStore;
use autonodes::services::LinkSettings;
use autonodes::ActionServices;
use autoruntime::RuntimeConfig;
use autoserver::{configure, AppState};
use serde_json::{json, Value};
use std::sync::Arc;

async fn state() -> web::Data<AppState> {
    let records = Arc::new(InMemoryRecordStore::new());
    records.insert("equipment", json!({"ageYears": 12})).await;

    web::Data::new(AppState::new(
        ActionServices {
            records,
            link_settings: LinkSettings {
                base_url: Some("https://crm.example.com".to_string()),
                default_expiry_days: 14,
            },
            ..ActionServices::in_memory()
        },
        RuntimeConfig::default(),
    ))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().app_data($state.clone()).configure(configure)).await
    };
}

#[actix_web::test]
async fn test_health() {
    let state = state().await;
    let app = app!(state);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_node_palette_lists_sockets() {
    let state = state().await;
    let app = app!(state);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/nodes").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let nodes: Vec<Value> = test::read_body_json(resp).await;
    let messaging = nodes
        .iter()
        .find(|n| n["node_type"] == "action.messaging")
        .unwrap();
    assert_eq!(messaging["runnable"], true);
    assert_eq!(messaging["inputs"][0]["socket_type"], "exec");
    assert_eq!(messaging["inputs"][1]["name"], "recipient");
}

#[actix_web::test]
async fn test_condition_action_returns_200() {
    let state = state().await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/actions")
        .set_json(json!({
            "nodeId": "conditional-evaluation",
            "nodeData": {"dataSource": "equipment", "field": "ageYears", "operator": ">=", "value": 10}
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["result"], true);
}

#[actix_web::test]
async fn test_link_issuance_returns_201_and_resolves() {
    let state = state().await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/actions")
        .set_json(json!({
            "nodeId": "link-issuance",
            "nodeData": {"linkType": "quote", "title": "Furnace quote", "password": "winter"}
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(
        body["url"],
        json!(format!("https://crm.example.com/share/{}", token))
    );

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/links/{}", token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/links/{}?password=winter", token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["title"], "Furnace quote");
}

#[actix_web::test]
async fn test_missing_field_is_400_with_error_shape() {
    let state = state().await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/actions")
        .set_json(json!({
            "nodeId": "messaging",
            "nodeData": {"recipient": "jane@example.com", "body": "Hello"}
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing required field: subject");
    assert_eq!(body["code"], "validation_error");
}

#[actix_web::test]
async fn test_unknown_action_and_malformed_json_are_400() {
    let state = state().await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/actions")
        .set_json(json!({"nodeId": "send-fax", "nodeData": {}}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/actions")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"nodeId\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "bad_request");
}

#[actix_web::test]
async fn test_unconfigured_ai_is_500() {
    let state = state().await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/actions")
        .set_json(json!({"nodeId": "ai-prompt", "nodeData": {"prompt": "Draft a follow-up"}}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn test_workflow_lifecycle() {
    let state = state().await;
    let app = app!(state);

    let mut workflow = Workflow::new("Old equipment follow-up");
    let trigger = workflow.add_trigger(NodeSpec::new("trigger.manual"));
    let task = workflow.add_node(
        NodeSpec::new("action.task-creation").with_config("description", "Offer replacement"),
    );
    workflow.connect(trigger, "out", task, "in");
    let id = workflow.id;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/workflows")
            .set_json(&workflow)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/workflows/{}/execute", id))
            .set_json(json!({"inputs": {"customer": "Novak"}}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let report: Value = test::read_body_json(resp).await;
    assert_eq!(report["state"], "completed");
    assert_eq!(report["statuses"][task.to_string()]["status"], "Completed");

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/workflows/{}", id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/workflows/{}", id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_invalid_workflow_is_rejected() {
    let state = state().await;
    let app = app!(state);

    let mut workflow = Workflow::new("Mismatched");
    workflow.add_trigger(NodeSpec::new("trigger.manual"));
    let constant = workflow.add_node(NodeSpec::new("data.constant").with_config("value", 3.0));
    let log = workflow.add_node(NodeSpec::new("debug.log"));
    workflow.connect(constant, "value", log, "message");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/workflows")
            .set_json(&workflow)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_workflow");
}
