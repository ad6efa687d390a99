use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::database::BookingFilter;
use crate::handlers::parse_param;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::booking::NewBooking;
use crate::models::{Booking, BookingStatus};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BookingQuery {
    pub status: Option<String>,
    pub listing_id: Option<String>,
    pub tenant_id: Option<String>,
}

impl BookingQuery {
    fn into_filter(self) -> Result<BookingFilter, crate::error::ApiError> {
        Ok(BookingFilter {
            status: parse_param::<BookingStatus>("status", self.status.as_deref())?,
            listing_id: parse_param("listing_id", self.listing_id.as_deref())?,
            tenant_id: parse_param("tenant_id", self.tenant_id.as_deref())?,
        })
    }
}

/// GET /api/bookings?status=&listing_id=&tenant_id=
pub async fn bookings_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<BookingQuery>,
) -> ApiResult<Vec<Booking>> {
    let filter = query.into_filter()?;
    Ok(ApiResponse::success(state.bookings().list(&auth, filter).await?))
}

/// POST /api/bookings
pub async fn bookings_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<NewBooking>,
) -> ApiResult<Booking> {
    let booking = state.bookings().create(&auth, body).await?;
    Ok(ApiResponse::created(booking))
}
