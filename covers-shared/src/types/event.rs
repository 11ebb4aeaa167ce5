use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all platform events.
///
/// Routing key format: `covers.{domain}.{entity}.{action}`
/// Example: `covers.booking.status.changed`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Booking lifecycle events
    pub const BOOKING_CREATED: &str = "covers.booking.created";
    pub const BOOKING_STATUS_CHANGED: &str = "covers.booking.status.changed";
    pub const BOOKING_TABLES_RELEASE_REQUESTED: &str = "covers.booking.tables.release_requested";

    // Offer events
    pub const OFFER_REDEMPTION_REVERSED: &str = "covers.offer.redemption.reversed";

    // Loyalty events
    pub const LOYALTY_POINTS_AWARDED: &str = "covers.loyalty.points.awarded";

    // Guest standing events
    pub const GUEST_FLAGGED: &str = "covers.guest.flagged";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BookingCreated {
        pub booking_id: Uuid,
        pub restaurant_id: Uuid,
        pub user_id: Option<Uuid>,
        pub party_size: i32,
        pub booking_time: chrono::DateTime<chrono::Utc>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BookingStatusChanged {
        pub booking_id: Uuid,
        pub restaurant_id: Uuid,
        pub user_id: Option<Uuid>,
        pub old_status: String,
        pub new_status: String,
        pub actor_id: Option<Uuid>,
        pub reason: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TableReleaseRequested {
        pub booking_id: Uuid,
        pub restaurant_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct OfferRedemptionReversed {
        pub offer_id: Uuid,
        pub booking_id: Uuid,
        pub restaurant_id: Uuid,
        pub user_id: Option<Uuid>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LoyaltyPointsAwarded {
        pub user_id: Uuid,
        pub restaurant_id: Uuid,
        pub booking_id: Uuid,
        pub points: i32,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct GuestFlagged {
        pub user_id: Uuid,
        pub restaurant_id: Uuid,
        pub strike_count: i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serialises_with_context() {
        let user = Uuid::new_v4();
        let event = Event::new(
            "covers-booking",
            routing_keys::GUEST_FLAGGED,
            payloads::GuestFlagged {
                user_id: user,
                restaurant_id: Uuid::new_v4(),
                strike_count: 3,
            },
        )
        .with_user(user);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["source"], "covers-booking");
        assert_eq!(json["event_type"], "covers.guest.flagged");
        assert_eq!(json["user_id"], serde_json::json!(user));
        assert_eq!(json["data"]["strike_count"], 3);
    }
}
