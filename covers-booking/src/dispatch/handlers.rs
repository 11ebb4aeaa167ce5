//! Side-effect handlers for inbound domain events.
//!
//! A committed state transition is never rolled back by a failing side
//! effect; each follow-up command is attempted on its own and logged.
//! Notification enqueue always comes last, so an abandoned request loses
//! at most a notification, never duplicates one.

use chrono::{Duration, Utc};

use covers_shared::errors::{AppError, AppResult, ErrorCode};

use crate::booking::{machine, BookingStatus};
use crate::dispatch::payloads::{
    parse_data, BookingCancelledData, BookingCompletedData, BookingConfirmedData,
    BookingCreatedData, BookingNoShowData, CancelledBy, DomainEvent,
};
use crate::events::publisher;
use crate::loyalty::{self, ledger};
use crate::models::NewOutboxEntry;
use crate::outbox::{entries, Category};
use crate::{guests, tasks, AppState};

/// The inbound events this service accepts. Anything else is the
/// sender's mistake: rejected with 400, never queued for retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl EventKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "booking.created" => Some(Self::Created),
            "booking.confirmed" => Some(Self::Confirmed),
            "booking.cancelled" => Some(Self::Cancelled),
            "booking.completed" => Some(Self::Completed),
            "booking.no_show" => Some(Self::NoShow),
            _ => None,
        }
    }
}

pub async fn handle(state: &AppState, event: DomainEvent) -> AppResult<()> {
    let kind = EventKind::from_name(&event.event).ok_or_else(|| {
        AppError::new(
            ErrorCode::UnknownEventType,
            format!("unknown event type: {}", event.event),
        )
    })?;

    match kind {
        EventKind::Created => handle_created(state, parse_data(&event.event, event.data)?).await,
        EventKind::Confirmed => {
            handle_confirmed(state, parse_data(&event.event, event.data)?).await
        }
        EventKind::Cancelled => {
            handle_cancelled(state, parse_data(&event.event, event.data)?).await
        }
        EventKind::Completed => {
            handle_completed(state, parse_data(&event.event, event.data)?).await
        }
        EventKind::NoShow => handle_no_show(state, parse_data(&event.event, event.data)?).await,
    }
}

fn log_side_effect<T>(name: &str, result: AppResult<T>) {
    if let Err(e) = result {
        tracing::error!(side_effect = name, error = %e, "side effect failed, continuing");
    }
}

async fn handle_created(state: &AppState, data: BookingCreatedData) -> AppResult<()> {
    let written = machine::record_creation(&state.db, data.booking_id)?;
    if !written {
        tracing::debug!(booking_id = %data.booking_id, "creation already recorded, no-op");
        return Ok(());
    }

    let booking = machine::load_booking(&state.db, data.booking_id)?;
    publisher::publish_booking_created(&state.rabbitmq, &booking).await;

    log_side_effect(
        "new booking staff notification",
        entries::enqueue(
            &state.db,
            NewOutboxEntry::for_staff(
                booking.restaurant_id,
                Category::NewBooking,
                "New booking request",
                format!(
                    "Party of {} on {} ({})",
                    data.party_size,
                    booking.booking_time.format("%Y-%m-%d %H:%M"),
                    booking.confirmation_code
                ),
                Some(serde_json::json!({ "booking_id": booking.id })),
            ),
        ),
    );

    Ok(())
}

async fn handle_confirmed(state: &AppState, data: BookingConfirmedData) -> AppResult<()> {
    let transition = machine::transition(
        &state.db,
        data.booking_id,
        BookingStatus::Confirmed,
        None,
        None,
    )?;
    publisher::publish_status_changed(&state.rabbitmq, &transition, None, None).await;

    log_side_effect(
        "confirmation notification",
        entries::enqueue(
            &state.db,
            NewOutboxEntry::for_user(
                data.user_id,
                transition.booking.restaurant_id,
                Category::Modification,
                "Booking confirmed",
                format!(
                    "Your booking {} is confirmed",
                    transition.booking.confirmation_code
                ),
                Some(serde_json::json!({ "booking_id": data.booking_id })),
            ),
        ),
    );

    Ok(())
}

async fn handle_cancelled(state: &AppState, data: BookingCancelledData) -> AppResult<()> {
    let (new_status, actor_id) = match data.cancelled_by {
        CancelledBy::User => (BookingStatus::CancelledByUser, Some(data.user_id)),
        CancelledBy::Restaurant => (BookingStatus::CancelledByRestaurant, None),
    };

    let transition = machine::transition(
        &state.db,
        data.booking_id,
        new_status,
        actor_id,
        Some(format!("cancelled by {}", match data.cancelled_by {
            CancelledBy::User => "user",
            CancelledBy::Restaurant => "restaurant",
        })),
    )?;
    let booking = &transition.booking;

    publisher::publish_status_changed(&state.rabbitmq, &transition, actor_id, None).await;
    publisher::publish_table_release_requested(&state.rabbitmq, booking).await;

    if let Some(offer_id) = booking.applied_offer_id {
        publisher::publish_offer_redemption_reversed(&state.rabbitmq, offer_id, booking).await;
    }

    // Notify the party that did not cancel.
    let notification = match data.cancelled_by {
        CancelledBy::User => NewOutboxEntry::for_staff(
            data.restaurant_id,
            Category::Cancellation,
            "Booking cancelled",
            format!("Booking {} was cancelled by the guest", booking.confirmation_code),
            Some(serde_json::json!({ "booking_id": booking.id })),
        ),
        CancelledBy::Restaurant => NewOutboxEntry::for_user(
            data.user_id,
            data.restaurant_id,
            Category::Cancellation,
            "Booking cancelled",
            format!(
                "Your booking {} was cancelled by the restaurant",
                booking.confirmation_code
            ),
            Some(serde_json::json!({ "booking_id": booking.id })),
        ),
    };
    log_side_effect("cancellation notification", entries::enqueue(&state.db, notification));

    Ok(())
}

async fn handle_completed(state: &AppState, data: BookingCompletedData) -> AppResult<()> {
    let transition =
        machine::transition(&state.db, data.booking_id, BookingStatus::Completed, None, None)?;
    publisher::publish_status_changed(&state.rabbitmq, &transition, None, None).await;

    award_loyalty(state, &data).await;

    log_side_effect(
        "review request scheduling",
        tasks::schedule_review_request(
            &state.db,
            data.booking_id,
            data.user_id,
            data.restaurant_id,
            Utc::now() + Duration::hours(state.config.review_request_delay_hours),
        ),
    );

    Ok(())
}

async fn award_loyalty(state: &AppState, data: &BookingCompletedData) {
    let rules = match ledger::active_rules_for(&state.db, data.restaurant_id) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!(error = %e, "failed to load loyalty rules, skipping award");
            return;
        }
    };

    let ctx = loyalty::RuleContext::for_booking(data.booking_time, data.party_size, Utc::now());
    let points = loyalty::compute_points(&rules, &ctx);
    if points == 0 {
        tracing::debug!(booking_id = %data.booking_id, "no loyalty rules matched");
        return;
    }

    match ledger::award_points(
        &state.db,
        data.user_id,
        data.restaurant_id,
        data.booking_id,
        points,
        "Completed booking",
    ) {
        Ok(true) => {
            publisher::publish_points_awarded(
                &state.rabbitmq,
                data.user_id,
                data.restaurant_id,
                data.booking_id,
                points,
            )
            .await;
        }
        Ok(false) => {}
        Err(e) => tracing::error!(error = %e, "failed to record loyalty transaction"),
    }
}

async fn handle_no_show(state: &AppState, data: BookingNoShowData) -> AppResult<()> {
    let transition =
        machine::transition(&state.db, data.booking_id, BookingStatus::NoShow, None, None)?;
    publisher::publish_status_changed(&state.rabbitmq, &transition, None, None).await;

    match guests::record_no_show(&state.db, data.user_id, data.restaurant_id, Utc::now()) {
        Ok(outcome) if outcome.newly_flagged => {
            publisher::publish_guest_flagged(
                &state.rabbitmq,
                data.user_id,
                data.restaurant_id,
                outcome.strike_count,
            )
            .await;
        }
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "failed to record no-show strike"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_events_route_to_a_handler() {
        assert_eq!(EventKind::from_name("booking.created"), Some(EventKind::Created));
        assert_eq!(EventKind::from_name("booking.confirmed"), Some(EventKind::Confirmed));
        assert_eq!(EventKind::from_name("booking.cancelled"), Some(EventKind::Cancelled));
        assert_eq!(EventKind::from_name("booking.completed"), Some(EventKind::Completed));
        assert_eq!(EventKind::from_name("booking.no_show"), Some(EventKind::NoShow));
    }

    #[test]
    fn unknown_events_do_not_route() {
        assert_eq!(EventKind::from_name("booking.seated"), None);
        assert_eq!(EventKind::from_name("table.ready"), None);
        assert_eq!(EventKind::from_name(""), None);
    }
}
