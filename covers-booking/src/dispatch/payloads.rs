use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use covers_shared::errors::{AppError, AppResult};

/// Wire shape of an inbound domain event.
#[derive(Debug, Deserialize)]
pub struct DomainEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Decode the `data` object of one event into its typed payload.
/// Missing or mistyped fields surface as a validation error.
pub fn parse_data<T: DeserializeOwned>(event_name: &str, data: serde_json::Value) -> AppResult<T> {
    serde_json::from_value(data)
        .map_err(|e| AppError::Validation(format!("invalid {event_name} data: {e}")))
}

#[derive(Debug, Deserialize)]
pub struct BookingCreatedData {
    pub booking_id: Uuid,
    pub restaurant_id: Uuid,
    pub party_size: i32,
}

#[derive(Debug, Deserialize)]
pub struct BookingConfirmedData {
    pub booking_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelledBy {
    User,
    Restaurant,
}

#[derive(Debug, Deserialize)]
pub struct BookingCancelledData {
    pub booking_id: Uuid,
    pub restaurant_id: Uuid,
    pub user_id: Uuid,
    pub cancelled_by: CancelledBy,
}

#[derive(Debug, Deserialize)]
pub struct BookingCompletedData {
    pub booking_id: Uuid,
    pub restaurant_id: Uuid,
    pub user_id: Uuid,
    pub party_size: i32,
    pub booking_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct BookingNoShowData {
    pub booking_id: Uuid,
    pub restaurant_id: Uuid,
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cancelled_payload_parses_both_parties() {
        let data = json!({
            "booking_id": Uuid::new_v4(),
            "restaurant_id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "cancelled_by": "restaurant"
        });
        let parsed: BookingCancelledData = parse_data("booking.cancelled", data).unwrap();
        assert_eq!(parsed.cancelled_by, CancelledBy::Restaurant);

        let data = json!({
            "booking_id": Uuid::new_v4(),
            "restaurant_id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "cancelled_by": "waiter"
        });
        let err = parse_data::<BookingCancelledData>("booking.cancelled", data).unwrap_err();
        assert!(err.to_string().contains("booking.cancelled"));
    }

    #[test]
    fn missing_required_field_is_a_validation_error() {
        let data = json!({ "booking_id": Uuid::new_v4() });
        let err = parse_data::<BookingCreatedData>("booking.created", data).unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("restaurant_id")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn completed_payload_parses_booking_time() {
        let data = json!({
            "booking_id": Uuid::new_v4(),
            "restaurant_id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "party_size": 4,
            "booking_time": "2025-06-06T19:30:00Z"
        });
        let parsed: BookingCompletedData = parse_data("booking.completed", data).unwrap();
        assert_eq!(parsed.party_size, 4);
        assert_eq!(parsed.booking_time.to_rfc3339(), "2025-06-06T19:30:00+00:00");
    }
}
