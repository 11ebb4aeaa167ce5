//! Time-driven work: the scheduled-task queue and request expiry.
//!
//! Processing is at-least-once; the unique idempotency key at insert time
//! keeps replays from scheduling the same work twice.

use std::time::Duration;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use covers_shared::clients::db::DbPool;
use covers_shared::errors::{AppError, AppResult};

use crate::booking::{machine, BookingStatus};
use crate::models::{NewOutboxEntry, NewScheduledTask, ScheduledTask};
use crate::outbox::entries;
use crate::schema::{bookings, scheduled_tasks};

pub const TASK_REVIEW_REQUEST: &str = "review_request";

const SWEEP_LIMIT: i64 = 100;

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewRequestPayload {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
}

/// Queue a deferred review request for a completed booking. Replayed
/// completion events hit the idempotency key and are no-ops.
pub fn schedule_review_request(
    pool: &DbPool,
    booking_id: Uuid,
    user_id: Uuid,
    restaurant_id: Uuid,
    due_at: DateTime<Utc>,
) -> AppResult<bool> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let payload = serde_json::to_value(ReviewRequestPayload { user_id, restaurant_id })
        .map_err(|e| AppError::internal(format!("unserialisable task payload: {e}")))?;

    let inserted = diesel::insert_into(scheduled_tasks::table)
        .values(&NewScheduledTask {
            task_type: TASK_REVIEW_REQUEST.to_string(),
            booking_id: Some(booking_id),
            payload: Some(payload),
            idempotency_key: format!("{TASK_REVIEW_REQUEST}:{booking_id}"),
            due_at,
        })
        .on_conflict(scheduled_tasks::idempotency_key)
        .do_nothing()
        .execute(&mut conn)?;

    Ok(inserted > 0)
}

/// Background consumer for the scheduled-task queue. The same sweep also
/// expires stale pending booking requests.
pub struct TaskWorker {
    pool: DbPool,
    poll_interval: Duration,
}

impl TaskWorker {
    pub fn new(pool: DbPool, poll_interval: Duration) -> Self {
        Self { pool, poll_interval }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep_tasks() {
                tracing::error!(error = %e, "scheduled task sweep failed");
            }
            if let Err(e) = self.expire_stale_requests() {
                tracing::error!(error = %e, "request expiry sweep failed");
            }
        }
    }

    fn sweep_tasks(&self) -> AppResult<()> {
        let mut conn = self.pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get db connection");
            AppError::internal("database connection error")
        })?;

        let due = scheduled_tasks::table
            .filter(scheduled_tasks::status.eq("pending"))
            .filter(scheduled_tasks::due_at.le(Utc::now()))
            .order(scheduled_tasks::due_at.asc())
            .limit(SWEEP_LIMIT)
            .load::<ScheduledTask>(&mut conn)?;

        for task in due {
            let task_id = task.id;
            let result = self.process_task(&task);
            let status = match &result {
                Ok(()) => "done",
                Err(e) => {
                    tracing::error!(task_id = %task_id, task_type = %task.task_type, error = %e, "task failed");
                    "failed"
                }
            };

            diesel::update(scheduled_tasks::table.find(task_id))
                .set((
                    scheduled_tasks::status.eq(status),
                    scheduled_tasks::attempts.eq(task.attempts + 1),
                    scheduled_tasks::processed_at.eq(Some(Utc::now())),
                ))
                .execute(&mut conn)?;
        }

        Ok(())
    }

    fn process_task(&self, task: &ScheduledTask) -> AppResult<()> {
        match task.task_type.as_str() {
            TASK_REVIEW_REQUEST => {
                let payload: ReviewRequestPayload = task
                    .payload
                    .clone()
                    .ok_or_else(|| AppError::internal("review_request task missing payload"))
                    .and_then(|raw| {
                        serde_json::from_value(raw)
                            .map_err(|e| AppError::internal(format!("bad task payload: {e}")))
                    })?;

                entries::enqueue(
                    &self.pool,
                    NewOutboxEntry {
                        user_id: Some(payload.user_id),
                        restaurant_id: Some(payload.restaurant_id),
                        channel: crate::outbox::Channel::Push.as_str().to_string(),
                        category: None,
                        title: "How was your visit?".to_string(),
                        body: "Leave a review for your recent booking".to_string(),
                        payload: task.booking_id.map(|id| serde_json::json!({ "booking_id": id })),
                        priority: crate::outbox::Priority::Low.as_str().to_string(),
                        scheduled_for: Utc::now(),
                    },
                )?;
                Ok(())
            }
            other => Err(AppError::internal(format!("unknown task type: {other}"))),
        }
    }

    /// Pending requests past their expiry are declined through the
    /// ordinary state machine, system actor.
    fn expire_stale_requests(&self) -> AppResult<()> {
        let mut conn = self.pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get db connection");
            AppError::internal("database connection error")
        })?;

        let stale: Vec<Uuid> = bookings::table
            .filter(bookings::status.eq(BookingStatus::Pending.as_str()))
            .filter(bookings::request_expires_at.le(Utc::now()))
            .select(bookings::id)
            .limit(SWEEP_LIMIT)
            .load(&mut conn)?;
        drop(conn);

        for booking_id in stale {
            match machine::transition(
                &self.pool,
                booking_id,
                BookingStatus::DeclinedByRestaurant,
                None,
                Some("request expired".to_string()),
            ) {
                Ok(_) => tracing::info!(booking_id = %booking_id, "expired stale booking request"),
                // A concurrent confirm may have won the race; that is fine.
                Err(e) => tracing::debug!(booking_id = %booking_id, error = %e, "expiry skipped"),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_payload_round_trips() {
        let payload = ReviewRequestPayload {
            user_id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
        };
        let raw = serde_json::to_value(&payload).unwrap();
        let back: ReviewRequestPayload = serde_json::from_value(raw).unwrap();
        assert_eq!(back.user_id, payload.user_id);
        assert_eq!(back.restaurant_id, payload.restaurant_id);
    }

    #[test]
    fn idempotency_key_is_stable_per_booking() {
        let booking_id = Uuid::new_v4();
        let key = format!("{TASK_REVIEW_REQUEST}:{booking_id}");
        assert_eq!(key, format!("review_request:{booking_id}"));
    }
}
