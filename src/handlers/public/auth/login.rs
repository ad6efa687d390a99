// handlers/public/auth/login.rs - POST /auth/login

use axum::extract::State;

use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::auth_service::{AuthSession, LoginRequest};
use crate::state::AppState;

/// Exchanges email and password for a bearer token.
///
/// Output: `{"success": true, "data": {"token": "...", "token_type": "Bearer", "expires_in": 86400, "user": {...}}}`
pub async fn login_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<AuthSession> {
    let session = state.auth().login(body).await?;
    Ok(ApiResponse::success(session))
}
