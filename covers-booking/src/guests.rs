//! No-show strike tracking and guest flagging.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use covers_shared::clients::db::DbPool;
use covers_shared::errors::{AppError, AppResult};

use crate::models::{NewFlaggedGuest, NewNoShowStrike};
use crate::schema::{flagged_guests, no_show_strikes};

/// Strikes before a guest is flagged for staff review.
pub const FLAG_THRESHOLD: i32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct StrikeOutcome {
    pub strike_count: i32,
    /// True exactly once, on the strike that creates the flag record.
    pub newly_flagged: bool,
}

/// Map a post-increment strike count to its outcome. `newly_flagged`
/// fires only on the strike that hits the threshold.
fn assess(strike_count: i32) -> StrikeOutcome {
    StrikeOutcome {
        strike_count,
        newly_flagged: strike_count == FLAG_THRESHOLD,
    }
}

/// A flag record exists from the threshold strike onward; its count is
/// kept in step with the strikes.
fn needs_flag_record(strike_count: i32) -> bool {
    strike_count >= FLAG_THRESHOLD
}

/// Increment the (user, restaurant) strike counter and maintain the flag
/// record. Runs in one transaction so a replayed event cannot double-count
/// against the flag.
pub fn record_no_show(
    pool: &DbPool,
    user_id: Uuid,
    restaurant_id: Uuid,
    occurred_at: DateTime<Utc>,
) -> AppResult<StrikeOutcome> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let outcome = conn.transaction::<StrikeOutcome, diesel::result::Error, _>(|conn| {
        let strike_count: i32 = diesel::insert_into(no_show_strikes::table)
            .values(&NewNoShowStrike {
                user_id,
                restaurant_id,
                strike_count: 1,
                last_no_show_at: occurred_at,
            })
            .on_conflict((no_show_strikes::user_id, no_show_strikes::restaurant_id))
            .do_update()
            .set((
                no_show_strikes::strike_count.eq(no_show_strikes::strike_count + 1),
                no_show_strikes::last_no_show_at.eq(occurred_at),
            ))
            .returning(no_show_strikes::strike_count)
            .get_result(conn)?;

        if needs_flag_record(strike_count) {
            diesel::insert_into(flagged_guests::table)
                .values(&NewFlaggedGuest {
                    user_id,
                    restaurant_id,
                    flag_count: strike_count,
                    flagged_at: occurred_at,
                })
                .on_conflict((flagged_guests::user_id, flagged_guests::restaurant_id))
                .do_update()
                .set(flagged_guests::flag_count.eq(strike_count))
                .execute(conn)?;
        }

        Ok(assess(strike_count))
    })?;

    if outcome.newly_flagged {
        tracing::warn!(
            user_id = %user_id,
            restaurant_id = %restaurant_id,
            strikes = outcome.strike_count,
            "guest flagged for repeated no-shows"
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_two_strikes_do_not_flag() {
        assert!(!assess(1).newly_flagged);
        assert!(!assess(2).newly_flagged);
        assert!(!needs_flag_record(1));
        assert!(!needs_flag_record(2));
    }

    #[test]
    fn third_strike_creates_the_flag_exactly_once() {
        let third = assess(3);
        assert!(third.newly_flagged);
        assert_eq!(third.strike_count, 3);
        assert!(needs_flag_record(3));
    }

    #[test]
    fn later_strikes_maintain_the_flag_without_reannouncing() {
        for count in 4..=6 {
            assert!(needs_flag_record(count));
            assert!(!assess(count).newly_flagged);
        }
    }
}
