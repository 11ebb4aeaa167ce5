use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use covers_shared::errors::AppResult;
use covers_shared::middleware::AdminUser;

use crate::outbox::broadcast::{self, BroadcastReport, BroadcastRequest};
use crate::AppState;

/// Broadcast responses carry their counts at the top level next to
/// `success`, not nested under a data key.
#[derive(Debug, Serialize)]
pub struct BroadcastResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: BroadcastReport,
}

/// POST /notifications/broadcast
/// Admin-only fan-out send. The response carries aggregate counts so
/// partial chunk failures are visible without record-level detail.
pub async fn send_broadcast(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(request): Json<BroadcastRequest>,
) -> AppResult<Json<BroadcastResponse>> {
    tracing::info!(admin_id = %admin.0.id, "broadcast requested");
    let report = broadcast::send_broadcast(&state.db, &request)?;
    Ok(Json(BroadcastResponse { success: true, report }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_counts_serialize_at_the_top_level() {
        let response = BroadcastResponse {
            success: true,
            report: BroadcastReport {
                recipients: 3,
                notifications: 6,
                queue_items: 6,
                scheduled: false,
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["recipients"], 3);
        assert_eq!(json["notifications"], 6);
        assert_eq!(json["queue_items"], 6);
        assert_eq!(json["scheduled"], false);
        assert!(json.get("data").is_none());
    }
}
