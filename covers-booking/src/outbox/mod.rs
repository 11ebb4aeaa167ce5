pub mod broadcast;
pub mod channels;
pub mod entries;
pub mod suppression;
pub mod types;
pub mod worker;

pub use types::{Category, Channel, DeliveryOutcome, OutboxStatus, Priority};
