use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;

use covers_shared::errors::{AppError, AppResult, ErrorCode};
use covers_shared::types::api::ApiResponse;

use crate::dispatch::{handlers, payloads::DomainEvent, signature};
use crate::AppState;

/// POST /events
/// Signed domain-event ingestion. The signature covers the raw body, so
/// verification happens before anything is parsed.
pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let provided = header_value(&headers, signature::SIGNATURE_HEADER)?;
    let timestamp: i64 = header_value(&headers, signature::TIMESTAMP_HEADER)?
        .parse()
        .map_err(|_| AppError::new(ErrorCode::SignatureInvalid, "malformed timestamp header"))?;

    if !signature::timestamp_within_tolerance(
        timestamp,
        Utc::now().timestamp(),
        state.config.signature_tolerance_secs,
    ) {
        return Err(AppError::new(
            ErrorCode::StaleEventTimestamp,
            "event timestamp outside the replay window",
        ));
    }

    if !signature::verify_signature(&state.config.webhook_secret, timestamp, &body, &provided) {
        return Err(AppError::new(ErrorCode::SignatureInvalid, "signature mismatch"));
    }

    let event: DomainEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed event body: {e}")))?;

    tracing::info!(event = %event.event, "domain event received");
    handlers::handle(&state, event).await?;

    Ok(Json(ApiResponse::ok(serde_json::json!({}))))
}

fn header_value(headers: &HeaderMap, name: &str) -> AppResult<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .ok_or_else(|| {
            AppError::new(ErrorCode::SignatureInvalid, format!("missing {name} header"))
        })
}
