use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::database::LeaseFilter;
use crate::error::ApiError;
use crate::handlers::{parse_param, today};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::lease::NewLease;
use crate::models::{Lease, LeaseStatus};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LeaseQuery {
    pub status: Option<String>,
    pub listing_id: Option<String>,
    pub tenant_id: Option<String>,
}

impl LeaseQuery {
    fn into_filter(self) -> Result<LeaseFilter, ApiError> {
        Ok(LeaseFilter {
            status: parse_param::<LeaseStatus>("status", self.status.as_deref())?,
            listing_id: parse_param("listing_id", self.listing_id.as_deref())?,
            tenant_id: parse_param("tenant_id", self.tenant_id.as_deref())?,
        })
    }
}

/// GET /api/leases?status=expiring_soon
pub async fn leases_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<LeaseQuery>,
) -> ApiResult<Vec<Lease>> {
    let filter = query.into_filter()?;
    Ok(ApiResponse::success(state.leases().list(&auth, filter, today()).await?))
}

/// POST /api/leases with `{"booking_id": "..."}`
pub async fn leases_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<NewLease>,
) -> ApiResult<Lease> {
    let lease = state.leases().create(&auth, body.booking_id).await?;
    Ok(ApiResponse::created(lease))
}
