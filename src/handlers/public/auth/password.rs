// handlers/public/auth/password.rs - POST /auth/password/forgot, POST /auth/password/reset

use axum::extract::State;
use chrono::Utc;
use serde_json::{json, Value};

use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::auth_service::{ForgotPasswordRequest, ResetPasswordRequest};
use crate::state::AppState;

/// Always 202 for a well-formed request so callers cannot tell which accounts exist
pub async fn forgot_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Value> {
    state.auth().request_password_reset(body, Utc::now()).await?;
    Ok(ApiResponse::accepted(json!({
        "message": "If the account exists, a reset link has been sent"
    })))
}

pub async fn reset_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Value> {
    state.auth().reset_password(body, Utc::now()).await?;
    Ok(ApiResponse::success(json!({ "message": "Password updated" })))
}
