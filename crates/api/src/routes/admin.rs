//! Operator Routes

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::ApiError;
use crate::SharedState;

/// Delete the detection log. Disabled unless `server.enable_admin` is set.
pub async fn clear_logs(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    if !state.settings.server.enable_admin {
        return Err(ApiError::Forbidden("Admin endpoints are disabled".to_string()));
    }

    state
        .detection_logger
        .clear_logs()
        .map_err(|e| ApiError::Internal(format!("failed to clear logs: {}", e)))?;

    warn!("Detection log cleared via admin endpoint");
    Ok(Json(json!({ "status": "success", "message": "Detection log cleared" })))
}
