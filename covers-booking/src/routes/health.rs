use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use covers_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let db_check = match state.db.get() {
        Ok(_) => HealthCheck {
            name: "database".into(),
            status: HealthStatus::Healthy,
            message: None,
        },
        Err(e) => HealthCheck {
            name: "database".into(),
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
        },
    };

    let response = HealthResponse::healthy("covers-booking", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![db_check]);
    Json(response)
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}
