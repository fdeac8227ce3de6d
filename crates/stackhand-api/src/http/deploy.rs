//! Deploy webhook handler.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use stackhand_deploy::DeployError;

use crate::auth::RequireToken;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub stack: String,
    pub tag: String,
}

/// POST /deploy
pub async fn deploy(
    _auth: RequireToken,
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeployRequest>,
) -> Response {
    let stack = request.stack.trim();
    let tag = request.tag.trim();
    if stack.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "stack is required"}))).into_response();
    }

    info!(stack = %stack, tag = %tag, "Deploy requested");
    let deployment = state.deployment(stack);

    match state.runner.deploy(stack, &deployment, tag).await {
        Ok(result) => (StatusCode::OK, Json(json!(result))).into_response(),
        Err(e) if e.is_client_error() => {
            (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response()
        }
        Err(DeployError::Failed(failure)) => {
            error!(stack = %stack, cause = %failure.cause, "Deployment failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": failure.message,
                    "cause": failure.cause,
                    "stdout": failure.stdout,
                    "stderr": failure.stderr,
                    "rollback": failure.rollback,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(stack = %stack, error = %e, "Deployment failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}
