use diesel::prelude::*;
use uuid::Uuid;

use covers_shared::clients::db::DbPool;
use covers_shared::errors::{AppError, AppResult};

use crate::models::{LoyaltyRule, NewLoyaltyTransaction};
use crate::schema::{loyalty_rules, loyalty_transactions};

/// Active rules for a restaurant. Validity-window and matching checks
/// happen in the engine, not here.
pub fn active_rules_for(pool: &DbPool, restaurant_id: Uuid) -> AppResult<Vec<LoyaltyRule>> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let rules = loyalty_rules::table
        .filter(loyalty_rules::restaurant_id.eq(restaurant_id))
        .filter(loyalty_rules::is_active.eq(true))
        .load::<LoyaltyRule>(&mut conn)?;

    Ok(rules)
}

/// Record a loyalty award for a completed booking.
///
/// One award per booking: the unique booking_id constraint absorbs
/// replayed completion events. Returns whether a row was written.
pub fn award_points(
    pool: &DbPool,
    user_id: Uuid,
    restaurant_id: Uuid,
    booking_id: Uuid,
    points: i32,
    description: &str,
) -> AppResult<bool> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })?;

    let inserted = diesel::insert_into(loyalty_transactions::table)
        .values(&NewLoyaltyTransaction {
            user_id,
            restaurant_id,
            booking_id,
            points,
            description: description.to_string(),
        })
        .on_conflict(loyalty_transactions::booking_id)
        .do_nothing()
        .execute(&mut conn)?;

    if inserted > 0 {
        tracing::info!(
            user_id = %user_id,
            booking_id = %booking_id,
            points,
            "loyalty points awarded"
        );
    } else {
        tracing::debug!(booking_id = %booking_id, "loyalty award already recorded, skipping");
    }

    Ok(inserted > 0)
}
