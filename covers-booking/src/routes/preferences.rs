use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use covers_shared::errors::{AppError, AppResult};
use covers_shared::middleware::StaffUser;
use covers_shared::types::api::ApiResponse;

use crate::models::NotificationPreference;
use crate::registry::preferences::{self, PreferencesUpdate};
use crate::AppState;

/// GET /restaurants/:id/notification-preferences
pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    Path(restaurant_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<NotificationPreference>>> {
    require_restaurant_access(&staff, restaurant_id)?;
    let prefs = preferences::preferences_for(&state.db, restaurant_id)?;
    Ok(Json(ApiResponse::ok(prefs)))
}

/// PUT /restaurants/:id/notification-preferences
pub async fn put_preferences(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    Path(restaurant_id): Path<Uuid>,
    Json(update): Json<PreferencesUpdate>,
) -> AppResult<Json<ApiResponse<NotificationPreference>>> {
    require_restaurant_access(&staff, restaurant_id)?;
    let prefs = preferences::upsert(&state.db, restaurant_id, &update)?;
    Ok(Json(ApiResponse::ok(prefs)))
}

fn require_restaurant_access(
    staff: &covers_shared::types::auth::AuthUser,
    restaurant_id: Uuid,
) -> AppResult<()> {
    if !staff.can_manage_restaurant(restaurant_id) {
        return Err(AppError::forbidden("not authorized for this restaurant"));
    }
    Ok(())
}
