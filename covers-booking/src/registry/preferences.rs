use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use covers_shared::clients::db::DbPool;
use covers_shared::errors::{AppError, AppResult};

use crate::models::{NewNotificationPreference, NotificationPreference};
use crate::schema::notification_preferences;

/// A restaurant's preferences, or the defaults when it never saved any:
/// every category on, no quiet hours.
pub fn preferences_for(pool: &DbPool, restaurant_id: Uuid) -> AppResult<NotificationPreference> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let existing = notification_preferences::table
        .filter(notification_preferences::restaurant_id.eq(restaurant_id))
        .first::<NotificationPreference>(&mut conn)
        .optional()?;

    Ok(existing.unwrap_or_else(|| defaults(restaurant_id)))
}

fn defaults(restaurant_id: Uuid) -> NotificationPreference {
    NotificationPreference {
        id: Uuid::nil(),
        restaurant_id,
        quiet_hours_start: None,
        quiet_hours_end: None,
        notify_new_booking: true,
        notify_cancellation: true,
        notify_modification: true,
        notify_waitlist: true,
        notify_table_ready: true,
        notify_order_update: true,
        updated_at: Utc::now(),
    }
}

#[derive(Debug, Deserialize)]
pub struct PreferencesUpdate {
    pub quiet_hours_start: Option<i32>,
    pub quiet_hours_end: Option<i32>,
    #[serde(default = "default_on")]
    pub notify_new_booking: bool,
    #[serde(default = "default_on")]
    pub notify_cancellation: bool,
    #[serde(default = "default_on")]
    pub notify_modification: bool,
    #[serde(default = "default_on")]
    pub notify_waitlist: bool,
    #[serde(default = "default_on")]
    pub notify_table_ready: bool,
    #[serde(default = "default_on")]
    pub notify_order_update: bool,
}

fn default_on() -> bool {
    true
}

impl PreferencesUpdate {
    pub fn validate(&self) -> AppResult<()> {
        for (name, minute) in [
            ("quiet_hours_start", self.quiet_hours_start),
            ("quiet_hours_end", self.quiet_hours_end),
        ] {
            if let Some(m) = minute {
                if !(0..1440).contains(&m) {
                    return Err(AppError::Validation(format!(
                        "{name} must be a minute of the day (0-1439), got {m}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Save a restaurant's preferences, creating the row on first write.
pub fn upsert(
    pool: &DbPool,
    restaurant_id: Uuid,
    update: &PreferencesUpdate,
) -> AppResult<NotificationPreference> {
    update.validate()?;

    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let prefs = diesel::insert_into(notification_preferences::table)
        .values(&NewNotificationPreference {
            restaurant_id,
            quiet_hours_start: update.quiet_hours_start,
            quiet_hours_end: update.quiet_hours_end,
            notify_new_booking: update.notify_new_booking,
            notify_cancellation: update.notify_cancellation,
            notify_modification: update.notify_modification,
            notify_waitlist: update.notify_waitlist,
            notify_table_ready: update.notify_table_ready,
            notify_order_update: update.notify_order_update,
        })
        .on_conflict(notification_preferences::restaurant_id)
        .do_update()
        .set((
            notification_preferences::quiet_hours_start.eq(update.quiet_hours_start),
            notification_preferences::quiet_hours_end.eq(update.quiet_hours_end),
            notification_preferences::notify_new_booking.eq(update.notify_new_booking),
            notification_preferences::notify_cancellation.eq(update.notify_cancellation),
            notification_preferences::notify_modification.eq(update.notify_modification),
            notification_preferences::notify_waitlist.eq(update.notify_waitlist),
            notification_preferences::notify_table_ready.eq(update.notify_table_ready),
            notification_preferences::notify_order_update.eq(update.notify_order_update),
            notification_preferences::updated_at.eq(Utc::now()),
        ))
        .get_result::<NotificationPreference>(&mut conn)?;

    tracing::debug!(restaurant_id = %restaurant_id, "notification preferences saved");
    Ok(prefs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_rejects_out_of_range_minutes() {
        let update = PreferencesUpdate {
            quiet_hours_start: Some(1440),
            quiet_hours_end: Some(480),
            notify_new_booking: true,
            notify_cancellation: true,
            notify_modification: true,
            notify_waitlist: true,
            notify_table_ready: true,
            notify_order_update: true,
        };
        assert!(update.validate().is_err());

        let update = PreferencesUpdate { quiet_hours_start: Some(1439), ..update };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn defaults_leave_everything_on() {
        let prefs = defaults(Uuid::new_v4());
        assert!(prefs.notify_new_booking && prefs.notify_order_update);
        assert!(prefs.quiet_hours_start.is_none() && prefs.quiet_hours_end.is_none());
    }
}
