use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use covers_shared::errors::{AppError, AppResult};
use covers_shared::middleware::StaffUser;
use covers_shared::types::api::ApiResponse;
use covers_shared::types::pagination::{Paginated, PaginationParams};

use crate::booking::machine;
use crate::models::BookingStatusHistory;
use crate::AppState;

/// GET /bookings/:id/history
/// The append-only status audit trail, oldest first.
pub async fn booking_history(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    Path(booking_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<BookingStatusHistory>>>> {
    let booking = machine::load_booking(&state.db, booking_id)?;
    if !staff.can_manage_restaurant(booking.restaurant_id) {
        return Err(AppError::forbidden("not authorized for this restaurant"));
    }

    let (offset, limit) = params.window();
    let (items, total) = machine::booking_history(&state.db, booking_id, limit, offset)?;
    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}
