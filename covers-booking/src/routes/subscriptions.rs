use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use covers_shared::errors::{AppError, AppResult};
use covers_shared::types::api::ApiResponse;
use covers_shared::types::auth::AuthUser;
use covers_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{NewPushSubscription, PushSubscription};
use crate::registry::subscriptions;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
    #[serde(default)]
    pub restaurant_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// POST /push/subscriptions
/// Register the caller's device. Upsert by endpoint: re-registering
/// updates and reactivates, never duplicates.
pub async fn register(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Json(request): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<PushSubscription>>> {
    if request.endpoint.trim().is_empty() {
        return Err(AppError::Validation("endpoint is required".into()));
    }
    if request.keys.p256dh.trim().is_empty() || request.keys.auth.trim().is_empty() {
        return Err(AppError::Validation("subscription keys are required".into()));
    }

    let subscription = subscriptions::register(
        &state.db,
        NewPushSubscription {
            endpoint: request.endpoint,
            p256dh: request.keys.p256dh,
            auth: request.keys.auth,
            user_id: auth_user.id,
            restaurant_id: request.restaurant_id,
            device_name: request.device_name,
            user_agent: request.user_agent,
        },
    )?;

    Ok(Json(ApiResponse::ok(subscription)))
}

#[derive(Debug, Deserialize)]
pub struct DeactivateRequest {
    pub endpoint: String,
}

/// POST /push/subscriptions/deactivate
/// Soft-deactivate one of the caller's own devices.
pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Json(request): Json<DeactivateRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    subscriptions::deactivate(&state.db, &request.endpoint, auth_user.id)?;
    Ok(Json(ApiResponse::ok(serde_json::json!({}))))
}

/// GET /push/subscriptions
/// The caller's registered devices, paginated.
pub async fn list_own(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<PushSubscription>>>> {
    let (offset, limit) = params.window();
    let (items, total) = subscriptions::list_for_user(&state.db, auth_user.id, limit, offset)?;
    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}
