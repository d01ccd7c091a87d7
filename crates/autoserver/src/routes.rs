use crate::error::ApiError;
use crate::AppState;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse, Responder};
use actix_ws::Message;
use autocore::{NodeId, Value, Workflow};
use autonodes::actions::verify_password;
use autonodes::services::LinkStore;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{error, info};
use uuid::Uuid;

/// Body of `POST /api/actions`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBody {
    /// Node-type tag, e.g. `messaging`
    node_id: Option<String>,
    #[serde(default)]
    node_data: serde_json::Value,
}

/// Body of `POST /api/workflows/{id}/execute`
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    trigger: Option<NodeId>,
    #[serde(default)]
    inputs: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    password: Option<String>,
}

#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "automation-engine"
    }))
}

/// Run one node action
#[post("/api/actions")]
async fn dispatch_action(
    data: web::Data<AppState>,
    body: web::Json<ActionBody>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let tag = body
        .node_id
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required field: nodeId".to_string()))?;

    let outcome = data.dispatcher.dispatch(tag, body.node_data).await?;

    let mut response = if outcome.created {
        HttpResponse::Created()
    } else {
        HttpResponse::Ok()
    };
    Ok(response.json(outcome.to_json()))
}

/// Resolve a shareable link
#[get("/api/links/{token}")]
async fn resolve_link(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<LinkQuery>,
) -> Result<HttpResponse, ApiError> {
    let token = path.into_inner();
    let link = data
        .dispatcher
        .services()
        .links
        .find(&token)
        .await
        .map_err(autonodes::ActionError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("Link {} not found", token)))?;

    if link.is_expired(Utc::now()) {
        return Err(ApiError::Gone(format!("Link {} has expired", token)));
    }
    if !verify_password(&link, query.password.as_deref().unwrap_or_default()) {
        return Err(ApiError::Unauthorized("Invalid password".to_string()));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "token": link.token,
        "linkType": link.link_type,
        "resourceId": link.resource_id,
        "title": link.title,
        "description": link.description,
        "expiresAt": link.expires_at.to_rfc3339(),
    })))
}

#[get("/api/workflows")]
async fn list_workflows(data: web::Data<AppState>) -> impl Responder {
    let workflow_list: Vec<_> = data
        .runtime
        .list_workflows()
        .await
        .iter()
        .map(|w| {
            json!({
                "id": w.id,
                "name": w.name,
                "description": w.description,
                "nodes": w.nodes.len(),
                "connections": w.connections.len(),
            })
        })
        .collect();

    HttpResponse::Ok().json(workflow_list)
}

/// Store a workflow; graphs that do not compile are rejected
#[post("/api/workflows")]
async fn create_workflow(
    data: web::Data<AppState>,
    workflow: web::Json<Workflow>,
) -> Result<HttpResponse, ApiError> {
    let workflow = workflow.into_inner();
    info!("Creating workflow: {} ({})", workflow.name, workflow.id);

    let workflow_id = data.runtime.register_workflow(workflow).await?;

    Ok(HttpResponse::Created().json(json!({
        "id": workflow_id,
        "message": "Workflow created successfully",
    })))
}

#[get("/api/workflows/{id}")]
async fn get_workflow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let workflow_id = path.into_inner();
    match data.runtime.get_workflow(workflow_id).await {
        Some(workflow) => Ok(HttpResponse::Ok().json(workflow)),
        None => Err(ApiError::NotFound(format!("Workflow {} not found", workflow_id))),
    }
}

#[delete("/api/workflows/{id}")]
async fn delete_workflow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let workflow_id = path.into_inner();
    match data.runtime.remove_workflow(workflow_id).await {
        Some(_) => {
            info!("Deleted workflow: {}", workflow_id);
            Ok(HttpResponse::Ok().json(json!({
                "message": "Workflow deleted successfully"
            })))
        }
        None => Err(ApiError::NotFound(format!("Workflow {} not found", workflow_id))),
    }
}

#[post("/api/workflows/{id}/execute")]
async fn execute_workflow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ExecuteRequest>,
) -> Result<HttpResponse, ApiError> {
    let workflow_id = path.into_inner();
    let req = req.into_inner();

    info!("Executing workflow: {}", workflow_id);

    let inputs: HashMap<String, Value> = req
        .inputs
        .into_iter()
        .map(|(k, v)| (k, Value::from_json(v)))
        .collect();

    let report = data
        .runtime
        .execute_workflow(workflow_id, req.trigger, inputs)
        .await
        .inspect_err(|e| error!("Workflow {} execution failed: {}", workflow_id, e))?;

    info!(
        "Workflow {} finished in {}ms ({} steps, {} failed nodes)",
        workflow_id,
        report.duration_ms,
        report.steps,
        report.failed_nodes().len()
    );

    Ok(HttpResponse::Ok().json(report))
}

/// Stream execution events over a websocket
#[get("/api/events")]
async fn websocket_events(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    let mut events = data.runtime.subscribe_events();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("WebSocket client lagged, {} events dropped", skipped);
                        }
                        Err(_) => break,
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

/// List available node types with their sockets
#[get("/api/nodes")]
async fn list_node_types(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.runtime.registry().describe_all())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(dispatch_action)
        .service(resolve_link)
        .service(list_workflows)
        .service(create_workflow)
        .service(get_workflow)
        .service(delete_workflow)
        .service(execute_workflow)
        .service(websocket_events)
        .service(list_node_types);
}
