// handlers/public/auth/register.rs - POST /auth/register

use axum::extract::State;

use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::user::RegisterRequest;
use crate::services::auth_service::AuthSession;
use crate::state::AppState;

/// Creates a tenant account and returns a session for it.
///
/// Input: `{"name": "...", "email": "...", "password": "..."}`
pub async fn register_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<AuthSession> {
    let session = state.auth().register(body).await?;
    Ok(ApiResponse::created(session))
}
