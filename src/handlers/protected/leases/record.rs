use axum::extract::{Extension, Path, State};

use crate::auth::AuthUser;
use crate::handlers::{parse_id, today};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::lease::LeaseChanges;
use crate::models::Lease;
use crate::state::AppState;

/// GET /api/leases/:id
pub async fn lease_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Lease> {
    let id = parse_id("Lease", &id)?;
    Ok(ApiResponse::success(state.leases().get(&auth, id, today()).await?))
}

/// PATCH /api/leases/:id (pending leases only)
pub async fn lease_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<LeaseChanges>,
) -> ApiResult<Lease> {
    let id = parse_id("Lease", &id)?;
    Ok(ApiResponse::success(state.leases().update(&auth, id, body, today()).await?))
}

/// DELETE /api/leases/:id
pub async fn lease_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id("Lease", &id)?;
    state.leases().delete(&auth, id, today()).await?;
    Ok(ApiResponse::no_content())
}
