use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::handlers::parse_param;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::listing::NewListing;
use crate::models::{Listing, ListingStatus};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub status: Option<String>,
}

/// GET /api/listings?status=available
pub async fn listings_get(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
    Query(query): Query<ListingQuery>,
) -> ApiResult<Vec<Listing>> {
    let status = parse_param::<ListingStatus>("status", query.status.as_deref())?;
    Ok(ApiResponse::success(state.listings().list(status).await?))
}

/// POST /api/listings
pub async fn listings_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<NewListing>,
) -> ApiResult<Listing> {
    let listing = state.listings().create(&auth, body).await?;
    Ok(ApiResponse::created(listing))
}
