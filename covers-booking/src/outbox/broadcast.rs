//! Broadcast sends: resolve a target selector to a user set, expand to one
//! outbox entry per (user, channel) pair, insert in bounded chunks.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use covers_shared::clients::db::DbPool;
use covers_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::NewOutboxEntry;
use crate::outbox::types::{Channel, Priority};
use crate::schema::{bookings, notification_outbox, push_subscriptions};

/// Store rows fetched per page while resolving a target set.
const RESOLVE_PAGE_SIZE: i64 = 500;

/// Rows per outbox insert, capped to respect store payload limits.
pub const INSERT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub title: String,
    pub body: String,
    pub channels: Vec<Channel>,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    pub target: BroadcastTarget,
    #[serde(default)]
    pub scheduling: Option<Scheduling>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

fn default_priority() -> Priority {
    Priority::Normal
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastTarget {
    AllUsers,
    RestaurantUsers { restaurant_ids: Vec<Uuid> },
    SpecificUsers { user_ids: Vec<Uuid> },
}

#[derive(Debug, Deserialize)]
pub struct Scheduling {
    pub send_at: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Aggregate counts returned to the caller. `queue_items` can fall short
/// of `notifications` when an insert chunk fails; the remaining chunks
/// still go through.
#[derive(Debug, Serialize)]
pub struct BroadcastReport {
    pub recipients: usize,
    pub notifications: usize,
    pub queue_items: usize,
    pub scheduled: bool,
}

impl BroadcastRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".into()));
        }
        if self.body.trim().is_empty() {
            return Err(AppError::Validation("body is required".into()));
        }
        if self.channels.is_empty() {
            return Err(AppError::Validation("at least one channel is required".into()));
        }
        Ok(())
    }
}

/// Resolve `scheduling` to a send instant. RFC3339 stands alone; a naive
/// timestamp is interpreted in the given IANA timezone (UTC when absent).
pub fn resolve_send_at(scheduling: &Scheduling) -> AppResult<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(&scheduling.send_at) {
        return Ok(instant.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(&scheduling.send_at, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&scheduling.send_at, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("unparseable send_at: {}", scheduling.send_at)))?;

    let tz: chrono_tz::Tz = match &scheduling.timezone {
        Some(name) => name
            .parse()
            .map_err(|_| AppError::Validation(format!("unknown timezone: {name}")))?,
        None => chrono_tz::UTC,
    };

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AppError::Validation(format!("send_at does not exist in {tz}")))
}

/// One entry per (user, channel) pair. Deterministic order: users outer,
/// channels inner.
pub fn expand(
    user_ids: &[Uuid],
    channels: &[Channel],
    title: &str,
    body: &str,
    payload: Option<&serde_json::Value>,
    priority: Priority,
    scheduled_for: DateTime<Utc>,
) -> Vec<NewOutboxEntry> {
    let mut entries = Vec::with_capacity(user_ids.len() * channels.len());
    for user_id in user_ids {
        for channel in channels {
            entries.push(NewOutboxEntry {
                user_id: Some(*user_id),
                restaurant_id: None,
                channel: channel.as_str().to_string(),
                category: None,
                title: title.to_string(),
                body: body.to_string(),
                payload: payload.cloned(),
                priority: priority.as_str().to_string(),
                scheduled_for,
            });
        }
    }
    entries
}

/// Resolve the target selector to a deduplicated user-id set, paging the
/// store so a large audience never sits in memory all at once.
pub fn resolve_target(pool: &DbPool, target: &BroadcastTarget) -> AppResult<Vec<Uuid>> {
    match target {
        BroadcastTarget::AllUsers => all_subscription_owners(pool),
        BroadcastTarget::RestaurantUsers { restaurant_ids } => {
            restaurant_booking_holders(pool, restaurant_ids)
        }
        BroadcastTarget::SpecificUsers { user_ids } => {
            let mut ids = user_ids.clone();
            ids.sort_unstable();
            ids.dedup();
            Ok(ids)
        }
    }
}

/// Distinct owners of active push subscriptions, keyset-paged by user id.
fn all_subscription_owners(pool: &DbPool) -> AppResult<Vec<Uuid>> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let mut owners = Vec::new();
    let mut cursor: Option<Uuid> = None;

    loop {
        let mut query = push_subscriptions::table
            .filter(push_subscriptions::is_active.eq(true))
            .select(push_subscriptions::user_id)
            .distinct()
            .order(push_subscriptions::user_id.asc())
            .limit(RESOLVE_PAGE_SIZE)
            .into_boxed();

        if let Some(last) = cursor {
            query = query.filter(push_subscriptions::user_id.gt(last));
        }

        let page: Vec<Uuid> = query.load(&mut conn)?;
        let page_len = page.len();
        cursor = page.last().copied();
        owners.extend(page);

        if page_len < RESOLVE_PAGE_SIZE as usize {
            break;
        }
    }

    Ok(owners)
}

/// Distinct registered booking holders of the given restaurants.
fn restaurant_booking_holders(pool: &DbPool, restaurant_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let mut holders = Vec::new();
    let mut cursor: Option<Uuid> = None;

    loop {
        let mut query = bookings::table
            .filter(bookings::restaurant_id.eq_any(restaurant_ids))
            .filter(bookings::user_id.is_not_null())
            .select(bookings::user_id.assume_not_null())
            .distinct()
            .order(bookings::user_id.asc())
            .limit(RESOLVE_PAGE_SIZE)
            .into_boxed();

        if let Some(last) = cursor {
            query = query.filter(bookings::user_id.gt(last));
        }

        let page: Vec<Uuid> = query.load(&mut conn)?;
        let page_len = page.len();
        cursor = page.last().copied();
        holders.extend(page);

        if page_len < RESOLVE_PAGE_SIZE as usize {
            break;
        }
    }

    Ok(holders)
}

/// Insert entries chunk by chunk, sequentially. A failed chunk is logged
/// and dropped from the count; the remaining chunks still run.
pub fn insert_chunked(pool: &DbPool, entries: &[NewOutboxEntry]) -> AppResult<usize> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let mut inserted = 0usize;
    for chunk in entries.chunks(INSERT_CHUNK_SIZE) {
        match diesel::insert_into(notification_outbox::table)
            .values(chunk)
            .execute(&mut conn)
        {
            Ok(rows) => inserted += rows,
            Err(e) => {
                tracing::error!(error = %e, chunk_size = chunk.len(), "outbox chunk insert failed");
            }
        }
    }

    Ok(inserted)
}

/// Full broadcast path: validate, resolve, expand, insert.
pub fn send_broadcast(pool: &DbPool, request: &BroadcastRequest) -> AppResult<BroadcastReport> {
    request.validate()?;

    let user_ids = resolve_target(pool, &request.target)?;
    if user_ids.is_empty() {
        return Err(AppError::new(
            ErrorCode::EmptyBroadcastTarget,
            "broadcast target resolved to no users",
        ));
    }

    let (scheduled_for, scheduled) = match &request.scheduling {
        Some(scheduling) => (resolve_send_at(scheduling)?, true),
        None => (Utc::now(), false),
    };

    let entries = expand(
        &user_ids,
        &request.channels,
        &request.title,
        &request.body,
        request.payload.as_ref(),
        request.priority,
        scheduled_for,
    );

    let queue_items = insert_chunked(pool, &entries)?;

    tracing::info!(
        recipients = user_ids.len(),
        notifications = entries.len(),
        queue_items,
        scheduled,
        "broadcast queued"
    );

    Ok(BroadcastReport {
        recipients: user_ids.len(),
        notifications: entries.len(),
        queue_items,
        scheduled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expansion_is_users_times_channels() {
        let users: Vec<Uuid> = (0..7).map(|_| Uuid::new_v4()).collect();
        let channels = [Channel::Push, Channel::Email, Channel::Sms];
        let entries = expand(
            &users,
            &channels,
            "Title",
            "Body",
            None,
            Priority::Normal,
            Utc::now(),
        );

        assert_eq!(entries.len(), 21);
        // Every (user, channel) pair appears exactly once.
        for user in &users {
            for channel in &channels {
                let count = entries
                    .iter()
                    .filter(|e| e.user_id == Some(*user) && e.channel == channel.as_str())
                    .count();
                assert_eq!(count, 1);
            }
        }
    }

    #[test]
    fn expansion_chunks_stay_under_the_insert_cap() {
        let users: Vec<Uuid> = (0..1200).map(|_| Uuid::new_v4()).collect();
        let entries = expand(
            &users,
            &[Channel::Push, Channel::Email],
            "Title",
            "Body",
            None,
            Priority::Low,
            Utc::now(),
        );

        assert_eq!(entries.len(), 2400);
        let chunks: Vec<_> = entries.chunks(INSERT_CHUNK_SIZE).collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= INSERT_CHUNK_SIZE));
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 2400);
    }

    #[test]
    fn validation_rejects_missing_fields() {
        let request: BroadcastRequest = serde_json::from_value(json!({
            "title": " ",
            "body": "b",
            "channels": ["push"],
            "target": {"type": "all_users"}
        }))
        .unwrap();
        assert!(request.validate().is_err());

        let request: BroadcastRequest = serde_json::from_value(json!({
            "title": "t",
            "body": "b",
            "channels": [],
            "target": {"type": "all_users"}
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn target_selector_parses_all_variants() {
        let all: BroadcastTarget = serde_json::from_value(json!({"type": "all_users"})).unwrap();
        assert!(matches!(all, BroadcastTarget::AllUsers));

        let specific: BroadcastTarget = serde_json::from_value(json!({
            "type": "specific_users",
            "user_ids": [Uuid::new_v4()]
        }))
        .unwrap();
        assert!(matches!(specific, BroadcastTarget::SpecificUsers { .. }));

        let restaurant: BroadcastTarget = serde_json::from_value(json!({
            "type": "restaurant_users",
            "restaurant_ids": [Uuid::new_v4(), Uuid::new_v4()]
        }))
        .unwrap();
        assert!(matches!(restaurant, BroadcastTarget::RestaurantUsers { .. }));
    }

    #[test]
    fn send_at_accepts_rfc3339() {
        let scheduling = Scheduling {
            send_at: "2025-07-01T18:00:00+02:00".into(),
            timezone: None,
        };
        let instant = resolve_send_at(&scheduling).unwrap();
        assert_eq!(instant.to_rfc3339(), "2025-07-01T16:00:00+00:00");
    }

    #[test]
    fn naive_send_at_resolves_in_the_given_timezone() {
        let scheduling = Scheduling {
            send_at: "2025-07-01T18:00:00".into(),
            timezone: Some("Europe/Paris".into()),
        };
        let instant = resolve_send_at(&scheduling).unwrap();
        // Paris is UTC+2 in July.
        assert_eq!(instant.to_rfc3339(), "2025-07-01T16:00:00+00:00");

        let bad = Scheduling {
            send_at: "2025-07-01T18:00:00".into(),
            timezone: Some("Mars/Olympus".into()),
        };
        assert!(resolve_send_at(&bad).is_err());
    }
}
