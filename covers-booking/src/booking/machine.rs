use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use covers_shared::clients::db::DbPool;
use covers_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Booking, NewStatusHistory};
use crate::schema::{booking_status_history, bookings};

use super::status::BookingStatus;

/// Optimistic concurrency: a lost compare-and-swap is re-read and
/// re-validated this many times before surfacing a conflict.
const MAX_CAS_ATTEMPTS: u32 = 3;

/// A successfully applied status transition.
#[derive(Debug, Clone)]
pub struct Transition {
    pub booking: Booking,
    pub old_status: BookingStatus,
    pub new_status: BookingStatus,
}

pub fn load_booking(pool: &DbPool, booking_id: Uuid) -> AppResult<Booking> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    bookings::table
        .find(booking_id)
        .get_result::<Booking>(&mut conn)
        .map_err(|e| match e {
            diesel::result::Error::NotFound => {
                AppError::new(ErrorCode::BookingNotFound, "booking not found")
            }
            other => AppError::Database(other),
        })
}

fn parse_status(raw: &str) -> AppResult<BookingStatus> {
    raw.parse::<BookingStatus>().map_err(|e| {
        tracing::error!(status = %raw, "booking row carries unknown status");
        AppError::internal(e)
    })
}

/// Move a booking along one lifecycle edge.
///
/// The status update and its history row are written in one transaction,
/// guarded by `WHERE status = <expected>`. Zero rows affected means a
/// concurrent writer got there first; the booking is re-read and the edge
/// re-validated against its new status before retrying.
pub fn transition(
    pool: &DbPool,
    booking_id: Uuid,
    new_status: BookingStatus,
    actor_id: Option<Uuid>,
    reason: Option<String>,
) -> AppResult<Transition> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    for attempt in 1..=MAX_CAS_ATTEMPTS {
        let booking = bookings::table
            .find(booking_id)
            .get_result::<Booking>(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => {
                    AppError::new(ErrorCode::BookingNotFound, "booking not found")
                }
                other => AppError::Database(other),
            })?;

        let current = parse_status(&booking.status)?;
        if !current.can_transition_to(new_status) {
            return Err(AppError::invalid_transition(current.as_str(), new_status.as_str()));
        }

        let history = NewStatusHistory {
            booking_id,
            old_status: Some(current.as_str().to_string()),
            new_status: new_status.as_str().to_string(),
            actor_id,
            reason: reason.clone(),
            metadata: None,
        };

        let updated = conn.transaction::<Option<Booking>, diesel::result::Error, _>(|conn| {
            let rows = diesel::update(
                bookings::table
                    .filter(bookings::id.eq(booking_id))
                    .filter(bookings::status.eq(current.as_str())),
            )
            .set((
                bookings::status.eq(new_status.as_str()),
                bookings::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;

            if rows == 0 {
                return Ok(None);
            }

            diesel::insert_into(booking_status_history::table)
                .values(&history)
                .execute(conn)?;

            bookings::table.find(booking_id).get_result::<Booking>(conn).map(Some)
        })?;

        match updated {
            Some(booking) => {
                tracing::info!(
                    booking_id = %booking_id,
                    old_status = %current,
                    new_status = %new_status,
                    "booking status changed"
                );
                return Ok(Transition {
                    booking,
                    old_status: current,
                    new_status,
                });
            }
            None => {
                tracing::debug!(
                    booking_id = %booking_id,
                    attempt,
                    "concurrent status update, retrying"
                );
            }
        }
    }

    Err(AppError::concurrent_update(
        "booking was modified concurrently, please retry",
    ))
}

/// Append the creation row (old_status null) for a booking, once.
///
/// The booking row is locked while the check-and-insert runs so duplicate
/// `booking.created` events cannot race a second row in. Returns whether a
/// row was written.
pub fn record_creation(pool: &DbPool, booking_id: Uuid) -> AppResult<bool> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let inserted = conn.transaction::<bool, diesel::result::Error, _>(|conn| {
        let booking = bookings::table
            .find(booking_id)
            .for_update()
            .get_result::<Booking>(conn)?;

        let existing: i64 = booking_status_history::table
            .filter(booking_status_history::booking_id.eq(booking_id))
            .filter(booking_status_history::old_status.is_null())
            .count()
            .get_result(conn)?;

        if existing > 0 {
            return Ok(false);
        }

        diesel::insert_into(booking_status_history::table)
            .values(&NewStatusHistory {
                booking_id,
                old_status: None,
                new_status: booking.status.clone(),
                actor_id: None,
                reason: None,
                metadata: None,
            })
            .execute(conn)?;

        Ok(true)
    })
    .map_err(|e| match e {
        diesel::result::Error::NotFound => {
            AppError::new(ErrorCode::BookingNotFound, "booking not found")
        }
        other => AppError::Database(other),
    })?;

    Ok(inserted)
}

/// Status audit trail for one booking, oldest first.
pub fn booking_history(
    pool: &DbPool,
    booking_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<crate::models::BookingStatusHistory>, i64)> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let total: i64 = booking_status_history::table
        .filter(booking_status_history::booking_id.eq(booking_id))
        .count()
        .get_result(&mut conn)?;

    let items = booking_status_history::table
        .filter(booking_status_history::booking_id.eq(booking_id))
        .order(booking_status_history::created_at.asc())
        .limit(limit)
        .offset(offset)
        .load::<crate::models::BookingStatusHistory>(&mut conn)?;

    Ok((items, total))
}
