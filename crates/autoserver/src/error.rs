use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use autocore::{FlowError, WorkflowError};
use autonodes::ActionError;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the HTTP handlers. Every variant renders as
/// `{success: false, error, code}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Gone(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Action(e) => e.code(),
            ApiError::Flow(FlowError::Graph(_)) => "invalid_workflow",
            ApiError::Flow(FlowError::Run(_)) => "run_error",
            ApiError::Flow(FlowError::Workflow(WorkflowError::NotFound(_))) => "not_found",
            ApiError::Flow(FlowError::Workflow(_)) => "invalid_workflow",
            ApiError::Flow(_) => "internal_error",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Gone(_) => "expired",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Action(e) if e.is_caller_fault() => StatusCode::BAD_REQUEST,
            ApiError::Action(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Flow(FlowError::Graph(_) | FlowError::Run(_)) => StatusCode::BAD_REQUEST,
            ApiError::Flow(FlowError::Workflow(WorkflowError::NotFound(_))) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Flow(FlowError::Workflow(_)) => StatusCode::BAD_REQUEST,
            ApiError::Flow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Gone(_) => StatusCode::GONE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.to_string(),
            "code": self.code(),
        }))
    }
}
