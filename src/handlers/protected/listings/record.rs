use axum::extract::{Extension, Path, State};

use crate::auth::AuthUser;
use crate::handlers::parse_id;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::listing::ListingChanges;
use crate::models::Listing;
use crate::state::AppState;

/// GET /api/listings/:id
pub async fn listing_get(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Listing> {
    let id = parse_id("Listing", &id)?;
    Ok(ApiResponse::success(state.listings().get(id).await?))
}

/// PATCH /api/listings/:id
pub async fn listing_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ListingChanges>,
) -> ApiResult<Listing> {
    let id = parse_id("Listing", &id)?;
    Ok(ApiResponse::success(state.listings().update(&auth, id, body).await?))
}

/// DELETE /api/listings/:id
pub async fn listing_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id("Listing", &id)?;
    state.listings().delete(&auth, id).await?;
    Ok(ApiResponse::no_content())
}
