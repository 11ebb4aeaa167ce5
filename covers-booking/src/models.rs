use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{
    booking_status_history, bookings, flagged_guests, loyalty_rules, loyalty_transactions,
    no_show_strikes, notification_history, notification_outbox, notification_preferences,
    push_subscriptions, scheduled_tasks,
};

// --- Booking ---

// Bookings are created by the reservation CRUD surface; this service only
// reads them and moves their status through the lifecycle.
#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = bookings)]
pub struct Booking {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub user_id: Option<Uuid>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub party_size: i32,
    pub booking_time: DateTime<Utc>,
    pub turn_time_minutes: i32,
    pub status: String,
    pub confirmation_code: String,
    pub applied_offer_id: Option<Uuid>,
    pub request_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- BookingStatusHistory ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = booking_status_history)]
pub struct BookingStatusHistory {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub old_status: Option<String>,
    pub new_status: String,
    pub actor_id: Option<Uuid>,
    pub reason: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = booking_status_history)]
pub struct NewStatusHistory {
    pub booking_id: Uuid,
    pub old_status: Option<String>,
    pub new_status: String,
    pub actor_id: Option<Uuid>,
    pub reason: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

// --- LoyaltyRule ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = loyalty_rules)]
pub struct LoyaltyRule {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub applicable_days: Vec<i32>,
    pub min_party_size: i32,
    pub max_party_size: Option<i32>,
    pub start_minute: Option<i32>,
    pub end_minute: Option<i32>,
    pub points: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- LoyaltyTransaction ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = loyalty_transactions)]
pub struct LoyaltyTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub booking_id: Uuid,
    pub points: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = loyalty_transactions)]
pub struct NewLoyaltyTransaction {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub booking_id: Uuid,
    pub points: i32,
    pub description: String,
}

// --- PushSubscription ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = push_subscriptions)]
pub struct PushSubscription {
    pub id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_id: Uuid,
    pub restaurant_id: Option<Uuid>,
    pub device_name: Option<String>,
    pub user_agent: Option<String>,
    pub is_active: bool,
    pub last_used_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = push_subscriptions)]
pub struct NewPushSubscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_id: Uuid,
    pub restaurant_id: Option<Uuid>,
    pub device_name: Option<String>,
    pub user_agent: Option<String>,
}

// --- NotificationPreference ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = notification_preferences)]
pub struct NotificationPreference {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub quiet_hours_start: Option<i32>,
    pub quiet_hours_end: Option<i32>,
    pub notify_new_booking: bool,
    pub notify_cancellation: bool,
    pub notify_modification: bool,
    pub notify_waitlist: bool,
    pub notify_table_ready: bool,
    pub notify_order_update: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notification_preferences)]
pub struct NewNotificationPreference {
    pub restaurant_id: Uuid,
    pub quiet_hours_start: Option<i32>,
    pub quiet_hours_end: Option<i32>,
    pub notify_new_booking: bool,
    pub notify_cancellation: bool,
    pub notify_modification: bool,
    pub notify_waitlist: bool,
    pub notify_table_ready: bool,
    pub notify_order_update: bool,
}

// --- OutboxEntry ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = notification_outbox)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub restaurant_id: Option<Uuid>,
    pub channel: String,
    pub category: Option<String>,
    pub title: String,
    pub body: String,
    pub payload: Option<serde_json::Value>,
    pub priority: String,
    pub status: String,
    pub scheduled_for: DateTime<Utc>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = notification_outbox)]
pub struct NewOutboxEntry {
    pub user_id: Option<Uuid>,
    pub restaurant_id: Option<Uuid>,
    pub channel: String,
    pub category: Option<String>,
    pub title: String,
    pub body: String,
    pub payload: Option<serde_json::Value>,
    pub priority: String,
    pub scheduled_for: DateTime<Utc>,
}

// --- NotificationHistory ---

#[derive(Debug, Insertable)]
#[diesel(table_name = notification_history)]
pub struct NewNotificationHistory {
    pub outbox_entry_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub delivered: bool,
    pub error: Option<String>,
}

// --- NoShowStrike ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = no_show_strikes)]
pub struct NoShowStrike {
    pub id: Uuid,
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub strike_count: i32,
    pub last_no_show_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = no_show_strikes)]
pub struct NewNoShowStrike {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub strike_count: i32,
    pub last_no_show_at: DateTime<Utc>,
}

// --- FlaggedGuest ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = flagged_guests)]
pub struct FlaggedGuest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub flag_count: i32,
    pub flagged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = flagged_guests)]
pub struct NewFlaggedGuest {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub flag_count: i32,
    pub flagged_at: DateTime<Utc>,
}

// --- ScheduledTask ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = scheduled_tasks)]
pub struct ScheduledTask {
    pub id: Uuid,
    pub task_type: String,
    pub booking_id: Option<Uuid>,
    pub payload: Option<serde_json::Value>,
    pub idempotency_key: String,
    pub due_at: DateTime<Utc>,
    pub status: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = scheduled_tasks)]
pub struct NewScheduledTask {
    pub task_type: String,
    pub booking_id: Option<Uuid>,
    pub payload: Option<serde_json::Value>,
    pub idempotency_key: String,
    pub due_at: DateTime<Utc>,
}
