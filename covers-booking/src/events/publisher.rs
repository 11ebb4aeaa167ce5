//! Outbound platform events for out-of-scope collaborators (floor plan,
//! offers, dashboards). Best-effort: a publish failure is logged and
//! never propagated.

use uuid::Uuid;

use covers_shared::clients::rabbitmq::RabbitMQClient;
use covers_shared::types::event::{payloads, routing_keys, Event};

use crate::booking::Transition;
use crate::models::Booking;

const SOURCE: &str = "covers-booking";

pub async fn publish_booking_created(rabbitmq: &RabbitMQClient, booking: &Booking) {
    let event = Event::new(
        SOURCE,
        routing_keys::BOOKING_CREATED,
        payloads::BookingCreated {
            booking_id: booking.id,
            restaurant_id: booking.restaurant_id,
            user_id: booking.user_id,
            party_size: booking.party_size,
            booking_time: booking.booking_time,
        },
    );

    if let Err(e) = rabbitmq.publish(routing_keys::BOOKING_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish booking.created event");
    }
}

pub async fn publish_status_changed(
    rabbitmq: &RabbitMQClient,
    transition: &Transition,
    actor_id: Option<Uuid>,
    reason: Option<String>,
) {
    let booking = &transition.booking;
    let mut event = Event::new(
        SOURCE,
        routing_keys::BOOKING_STATUS_CHANGED,
        payloads::BookingStatusChanged {
            booking_id: booking.id,
            restaurant_id: booking.restaurant_id,
            user_id: booking.user_id,
            old_status: transition.old_status.as_str().to_string(),
            new_status: transition.new_status.as_str().to_string(),
            actor_id,
            reason,
        },
    );
    if let Some(user_id) = booking.user_id {
        event = event.with_user(user_id);
    }

    if let Err(e) = rabbitmq.publish(routing_keys::BOOKING_STATUS_CHANGED, &event).await {
        tracing::error!(error = %e, "failed to publish booking.status.changed event");
    }
}

pub async fn publish_table_release_requested(rabbitmq: &RabbitMQClient, booking: &Booking) {
    let event = Event::new(
        SOURCE,
        routing_keys::BOOKING_TABLES_RELEASE_REQUESTED,
        payloads::TableReleaseRequested {
            booking_id: booking.id,
            restaurant_id: booking.restaurant_id,
        },
    );

    if let Err(e) = rabbitmq
        .publish(routing_keys::BOOKING_TABLES_RELEASE_REQUESTED, &event)
        .await
    {
        tracing::error!(error = %e, "failed to publish table release event");
    }
}

pub async fn publish_offer_redemption_reversed(
    rabbitmq: &RabbitMQClient,
    offer_id: Uuid,
    booking: &Booking,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::OFFER_REDEMPTION_REVERSED,
        payloads::OfferRedemptionReversed {
            offer_id,
            booking_id: booking.id,
            restaurant_id: booking.restaurant_id,
            user_id: booking.user_id,
        },
    );

    if let Err(e) = rabbitmq.publish(routing_keys::OFFER_REDEMPTION_REVERSED, &event).await {
        tracing::error!(error = %e, "failed to publish offer redemption reversal");
    }
}

pub async fn publish_points_awarded(
    rabbitmq: &RabbitMQClient,
    user_id: Uuid,
    restaurant_id: Uuid,
    booking_id: Uuid,
    points: i32,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::LOYALTY_POINTS_AWARDED,
        payloads::LoyaltyPointsAwarded { user_id, restaurant_id, booking_id, points },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::LOYALTY_POINTS_AWARDED, &event).await {
        tracing::error!(error = %e, "failed to publish loyalty points event");
    }
}

pub async fn publish_guest_flagged(
    rabbitmq: &RabbitMQClient,
    user_id: Uuid,
    restaurant_id: Uuid,
    strike_count: i32,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::GUEST_FLAGGED,
        payloads::GuestFlagged { user_id, restaurant_id, strike_count },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::GUEST_FLAGGED, &event).await {
        tracing::error!(error = %e, "failed to publish guest flagged event");
    }
}
