pub mod preferences;
pub mod subscriptions;
