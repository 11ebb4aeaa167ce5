pub mod machine;
pub mod status;

pub use machine::{transition, Transition};
pub use status::BookingStatus;
