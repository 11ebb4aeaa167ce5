use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use covers_shared::clients::db::DbPool;
use covers_shared::errors::{AppError, AppResult};

use crate::models::{NewNotificationHistory, NewOutboxEntry, OutboxEntry};
use crate::outbox::types::{Category, Channel, OutboxStatus, Priority};
use crate::schema::{notification_history, notification_outbox};

impl NewOutboxEntry {
    /// Entry addressed to one diner, ready to send.
    pub fn for_user(
        user_id: Uuid,
        restaurant_id: Uuid,
        category: Category,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            restaurant_id: Some(restaurant_id),
            channel: Channel::Push.as_str().to_string(),
            category: Some(category.as_str().to_string()),
            title: title.into(),
            body: body.into(),
            payload,
            priority: Priority::Normal.as_str().to_string(),
            scheduled_for: Utc::now(),
        }
    }

    /// Entry addressed to a restaurant's staff devices (no user target).
    pub fn for_staff(
        restaurant_id: Uuid,
        category: Category,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            user_id: None,
            restaurant_id: Some(restaurant_id),
            channel: Channel::Push.as_str().to_string(),
            category: Some(category.as_str().to_string()),
            title: title.into(),
            body: body.into(),
            payload,
            priority: Priority::Normal.as_str().to_string(),
            scheduled_for: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority.as_str().to_string();
        self
    }
}

/// Write one ready-to-send entry. The last side effect a handler attempts:
/// a missed notification is a tolerable loss, a duplicated one is not.
pub fn enqueue(pool: &DbPool, entry: NewOutboxEntry) -> AppResult<OutboxEntry> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let entry = diesel::insert_into(notification_outbox::table)
        .values(&entry)
        .get_result::<OutboxEntry>(&mut conn)?;

    tracing::debug!(
        entry_id = %entry.id,
        channel = %entry.channel,
        "outbox entry queued"
    );

    Ok(entry)
}

/// Due entries for one worker sweep: queued and scheduled at or before now.
pub fn due_entries(pool: &DbPool, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<OutboxEntry>> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let entries = notification_outbox::table
        .filter(notification_outbox::status.eq(OutboxStatus::Queued.as_str()))
        .filter(notification_outbox::scheduled_for.le(now))
        .order(notification_outbox::scheduled_for.asc())
        .limit(limit)
        .load::<OutboxEntry>(&mut conn)?;

    Ok(entries)
}

/// Close out an entry. Status is monotonic; a finalised entry is never
/// re-queued, so the update is guarded on `status = 'queued'`.
pub fn finalize(
    pool: &DbPool,
    entry_id: Uuid,
    status: OutboxStatus,
    attempts: i32,
    last_error: Option<String>,
) -> AppResult<()> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    diesel::update(
        notification_outbox::table
            .filter(notification_outbox::id.eq(entry_id))
            .filter(notification_outbox::status.eq(OutboxStatus::Queued.as_str())),
    )
    .set((
        notification_outbox::status.eq(status.as_str()),
        notification_outbox::attempts.eq(attempts),
        notification_outbox::last_error.eq(last_error),
        notification_outbox::processed_at.eq(Some(Utc::now())),
    ))
    .execute(&mut conn)?;

    Ok(())
}

/// One audit row per delivery attempt, success or failure. Write-once.
pub fn record_history(
    pool: &DbPool,
    entry_id: Uuid,
    subscription_id: Option<Uuid>,
    delivered: bool,
    error: Option<String>,
) -> AppResult<()> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    diesel::insert_into(notification_history::table)
        .values(&NewNotificationHistory {
            outbox_entry_id: entry_id,
            subscription_id,
            delivered,
            error,
        })
        .execute(&mut conn)?;

    Ok(())
}
