pub mod engine;
pub mod ledger;

pub use engine::{compute_points, RuleContext};
