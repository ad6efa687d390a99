use axum::extract::{Extension, Path, State};

use crate::auth::AuthUser;
use crate::handlers::{parse_id, today};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::lease::TransitionRequest;
use crate::models::Lease;
use crate::services::RefreshReport;
use crate::state::AppState;

/// POST /api/leases/:id/transition
///
/// Input: `{"action": "activate" | "cancel" | "renew", "end_date": "YYYY-MM-DD"}`.
/// `end_date` (and optionally `start_date`) only apply to renewals.
pub async fn lease_transition_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TransitionRequest>,
) -> ApiResult<Lease> {
    let id = parse_id("Lease", &id)?;
    Ok(ApiResponse::success(state.leases().transition(&auth, id, body, today()).await?))
}

/// POST /api/leases/refresh - applies the calendar to every lease now
pub async fn leases_refresh_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<RefreshReport> {
    auth.require_admin()?;
    Ok(ApiResponse::success(state.leases().refresh(today()).await?))
}
