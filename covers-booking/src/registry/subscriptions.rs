use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use covers_shared::clients::db::DbPool;
use covers_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewPushSubscription, PushSubscription};
use crate::schema::push_subscriptions;

/// Changeset applied when an endpoint registers again. Keys and ownership
/// are refreshed from the incoming payload and `is_active` is forced back
/// on, so an endpoint deactivated after a dead delivery comes back to life.
#[derive(AsChangeset)]
#[diesel(table_name = push_subscriptions, treat_none_as_null = true)]
struct ReRegistration<'a> {
    p256dh: &'a str,
    auth: &'a str,
    user_id: Uuid,
    restaurant_id: Option<Uuid>,
    device_name: Option<&'a str>,
    user_agent: Option<&'a str>,
    is_active: bool,
    last_used_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn re_registration(subscription: &NewPushSubscription, now: DateTime<Utc>) -> ReRegistration<'_> {
    ReRegistration {
        p256dh: &subscription.p256dh,
        auth: &subscription.auth,
        user_id: subscription.user_id,
        restaurant_id: subscription.restaurant_id,
        device_name: subscription.device_name.as_deref(),
        user_agent: subscription.user_agent.as_deref(),
        is_active: true,
        last_used_at: now,
        updated_at: now,
    }
}

/// Upsert keyed by endpoint. Re-registering an existing endpoint updates
/// it in place and reactivates it; there is never a duplicate row.
pub fn register(pool: &DbPool, subscription: NewPushSubscription) -> AppResult<PushSubscription> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let subscription = diesel::insert_into(push_subscriptions::table)
        .values(&subscription)
        .on_conflict(push_subscriptions::endpoint)
        .do_update()
        .set(re_registration(&subscription, Utc::now()))
        .get_result::<PushSubscription>(&mut conn)?;

    tracing::debug!(
        subscription_id = %subscription.id,
        user_id = %subscription.user_id,
        "push subscription registered"
    );

    Ok(subscription)
}

/// Soft-deactivate one of the caller's own devices. The row stays for the
/// delivery audit trail.
pub fn deactivate(pool: &DbPool, endpoint: &str, user_id: Uuid) -> AppResult<()> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let updated = diesel::update(
        push_subscriptions::table
            .filter(push_subscriptions::endpoint.eq(endpoint))
            .filter(push_subscriptions::user_id.eq(user_id)),
    )
    .set((
        push_subscriptions::is_active.eq(false),
        push_subscriptions::updated_at.eq(Utc::now()),
    ))
    .execute(&mut conn)?;

    if updated == 0 {
        return Err(AppError::new(
            ErrorCode::SubscriptionNotFound,
            "subscription not found",
        ));
    }

    Ok(())
}

/// Deactivation on a permanent delivery failure, by id.
pub fn deactivate_by_id(pool: &DbPool, subscription_id: Uuid) -> AppResult<()> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    diesel::update(push_subscriptions::table.find(subscription_id))
        .set((
            push_subscriptions::is_active.eq(false),
            push_subscriptions::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    Ok(())
}

/// Active devices of the given users.
pub fn active_subscriptions_for(
    pool: &DbPool,
    user_ids: &[Uuid],
) -> AppResult<Vec<PushSubscription>> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let subs = push_subscriptions::table
        .filter(push_subscriptions::user_id.eq_any(user_ids))
        .filter(push_subscriptions::is_active.eq(true))
        .load::<PushSubscription>(&mut conn)?;

    Ok(subs)
}

/// Active staff devices bound to a restaurant.
pub fn staff_devices_for(pool: &DbPool, restaurant_id: Uuid) -> AppResult<Vec<PushSubscription>> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let subs = push_subscriptions::table
        .filter(push_subscriptions::restaurant_id.eq(restaurant_id))
        .filter(push_subscriptions::is_active.eq(true))
        .load::<PushSubscription>(&mut conn)?;

    Ok(subs)
}

/// A user's own devices, paginated, newest first.
pub fn list_for_user(
    pool: &DbPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<PushSubscription>, i64)> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let total: i64 = push_subscriptions::table
        .filter(push_subscriptions::user_id.eq(user_id))
        .count()
        .get_result(&mut conn)?;

    let items = push_subscriptions::table
        .filter(push_subscriptions::user_id.eq(user_id))
        .order(push_subscriptions::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load::<PushSubscription>(&mut conn)?;

    Ok((items, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_registration_reactivates_and_refreshes_the_row() {
        let incoming = NewPushSubscription {
            endpoint: "https://push.example/device".into(),
            p256dh: "fresh-p256dh".into(),
            auth: "fresh-auth".into(),
            user_id: Uuid::new_v4(),
            restaurant_id: None,
            device_name: Some("kitchen tablet".into()),
            user_agent: None,
        };
        let now = Utc::now();

        let changes = re_registration(&incoming, now);

        // A previously deactivated endpoint must come back active.
        assert!(changes.is_active);
        assert_eq!(changes.p256dh, "fresh-p256dh");
        assert_eq!(changes.auth, "fresh-auth");
        assert_eq!(changes.user_id, incoming.user_id);
        assert_eq!(changes.device_name, Some("kitchen tablet"));
        assert_eq!(changes.last_used_at, now);
        assert_eq!(changes.updated_at, now);
    }
}
