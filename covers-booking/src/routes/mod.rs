pub mod bookings;
pub mod events;
pub mod health;
pub mod notifications;
pub mod preferences;
pub mod subscriptions;
