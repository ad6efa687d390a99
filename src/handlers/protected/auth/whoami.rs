// handlers/protected/auth/whoami.rs - GET /api/auth/whoami

use axum::extract::{Extension, State};

use crate::auth::AuthUser;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::User;
use crate::state::AppState;

pub async fn whoami_get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<User> {
    let user = state.auth().whoami(auth.id).await?;
    Ok(ApiResponse::success(user))
}
