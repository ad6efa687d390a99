use axum::extract::{Extension, Path, State};

use crate::auth::AuthUser;
use crate::handlers::parse_id;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::booking::BookingChanges;
use crate::models::Booking;
use crate::state::AppState;

/// GET /api/bookings/:id
pub async fn booking_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    let id = parse_id("Booking", &id)?;
    Ok(ApiResponse::success(state.bookings().get(&auth, id).await?))
}

/// PATCH /api/bookings/:id
pub async fn booking_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<BookingChanges>,
) -> ApiResult<Booking> {
    let id = parse_id("Booking", &id)?;
    Ok(ApiResponse::success(state.bookings().update(&auth, id, body).await?))
}

/// DELETE /api/bookings/:id
pub async fn booking_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id("Booking", &id)?;
    state.bookings().delete(&auth, id).await?;
    Ok(ApiResponse::no_content())
}
