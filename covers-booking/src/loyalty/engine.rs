use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::models::LoyaltyRule;

/// Booking facts a rule is evaluated against.
#[derive(Debug, Clone)]
pub struct RuleContext {
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: i32,
    pub party_size: i32,
    pub minutes_since_midnight: i32,
    /// Evaluation instant, checked against the rule validity window.
    pub now: DateTime<Utc>,
}

impl RuleContext {
    pub fn for_booking(booking_time: DateTime<Utc>, party_size: i32, now: DateTime<Utc>) -> Self {
        Self {
            day_of_week: booking_time.weekday().num_days_from_sunday() as i32,
            party_size,
            minutes_since_midnight: (booking_time.hour() * 60 + booking_time.minute()) as i32,
            now,
        }
    }
}

/// Sum of points over every matching rule. Rules accumulate; there is no
/// best-match selection. No matches is an ordinary zero.
pub fn compute_points(rules: &[LoyaltyRule], ctx: &RuleContext) -> i32 {
    rules
        .iter()
        .filter(|rule| rule_matches(rule, ctx))
        .map(|rule| rule.points)
        .sum()
}

/// All boundaries are inclusive. Null bounds are unbounded on that side.
fn rule_matches(rule: &LoyaltyRule, ctx: &RuleContext) -> bool {
    if !rule.is_active {
        return false;
    }
    if ctx.now < rule.valid_from {
        return false;
    }
    if rule.valid_until.is_some_and(|until| ctx.now > until) {
        return false;
    }
    if !rule.applicable_days.contains(&ctx.day_of_week) {
        return false;
    }
    if ctx.party_size < rule.min_party_size {
        return false;
    }
    if rule.max_party_size.is_some_and(|max| ctx.party_size > max) {
        return false;
    }
    if rule.start_minute.is_some_and(|start| ctx.minutes_since_midnight < start) {
        return false;
    }
    if rule.end_minute.is_some_and(|end| ctx.minutes_since_midnight > end) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn rule(points: i32) -> LoyaltyRule {
        LoyaltyRule {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            name: "test rule".into(),
            valid_from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            valid_until: None,
            applicable_days: vec![0, 1, 2, 3, 4, 5, 6],
            min_party_size: 1,
            max_party_size: None,
            start_minute: None,
            end_minute: None,
            points,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ctx(day: i32, party: i32, minutes: i32) -> RuleContext {
        RuleContext {
            day_of_week: day,
            party_size: party,
            minutes_since_midnight: minutes,
            now: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn friday_evening_party_of_four_collects_both_rules() {
        // Weekday dinner rule: 20 points, any party, 18:00-22:00.
        let mut dinner = rule(20);
        dinner.applicable_days = vec![1, 2, 3, 4, 5];
        dinner.start_minute = Some(18 * 60);
        dinner.end_minute = Some(22 * 60);

        // Group rule: 30 points for parties of 4+, any time.
        let mut group = rule(30);
        group.min_party_size = 4;

        // Friday 19:30, party of 4.
        let ctx = ctx(5, 4, 19 * 60 + 30);
        assert_eq!(compute_points(&[dinner, group], &ctx), 50);
    }

    #[test]
    fn points_accumulate_over_all_matches() {
        let rules = vec![rule(10), rule(15), rule(25)];
        assert_eq!(compute_points(&rules, &ctx(3, 2, 600)), 50);
    }

    #[test]
    fn no_matching_rules_is_zero() {
        let mut r = rule(40);
        r.applicable_days = vec![6];
        assert_eq!(compute_points(&[r], &ctx(2, 2, 600)), 0);
        assert_eq!(compute_points(&[], &ctx(2, 2, 600)), 0);
    }

    #[test]
    fn inactive_rules_never_match() {
        let mut r = rule(40);
        r.is_active = false;
        assert_eq!(compute_points(&[r], &ctx(2, 2, 600)), 0);
    }

    #[test]
    fn validity_window_is_checked_against_now() {
        let mut expired = rule(40);
        expired.valid_until = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

        let mut upcoming = rule(40);
        upcoming.valid_from = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let mut open_ended = rule(40);
        open_ended.valid_until = None;

        let ctx = ctx(2, 2, 600);
        assert_eq!(compute_points(&[expired], &ctx), 0);
        assert_eq!(compute_points(&[upcoming], &ctx), 0);
        assert_eq!(compute_points(&[open_ended], &ctx), 40);
    }

    #[test]
    fn party_size_bounds_are_inclusive() {
        let mut r = rule(10);
        r.min_party_size = 4;
        r.max_party_size = Some(6);

        assert_eq!(compute_points(std::slice::from_ref(&r), &ctx(2, 3, 600)), 0);
        assert_eq!(compute_points(std::slice::from_ref(&r), &ctx(2, 4, 600)), 10);
        assert_eq!(compute_points(std::slice::from_ref(&r), &ctx(2, 6, 600)), 10);
        assert_eq!(compute_points(std::slice::from_ref(&r), &ctx(2, 7, 600)), 0);
    }

    #[test]
    fn null_max_party_size_is_unbounded() {
        let mut r = rule(10);
        r.min_party_size = 2;
        r.max_party_size = None;
        assert_eq!(compute_points(&[r], &ctx(2, 40, 600)), 10);
    }

    #[test]
    fn time_window_boundaries_are_inclusive() {
        let mut r = rule(10);
        r.start_minute = Some(18 * 60);
        r.end_minute = Some(22 * 60);

        assert_eq!(compute_points(std::slice::from_ref(&r), &ctx(2, 2, 18 * 60 - 1)), 0);
        assert_eq!(compute_points(std::slice::from_ref(&r), &ctx(2, 2, 18 * 60)), 10);
        assert_eq!(compute_points(std::slice::from_ref(&r), &ctx(2, 2, 22 * 60)), 10);
        assert_eq!(compute_points(std::slice::from_ref(&r), &ctx(2, 2, 22 * 60 + 1)), 0);
    }

    #[test]
    fn context_derives_day_and_minutes_from_booking_time() {
        // 2025-06-06 is a Friday.
        let booking_time = Utc.with_ymd_and_hms(2025, 6, 6, 19, 30, 0).unwrap();
        let ctx = RuleContext::for_booking(booking_time, 4, Utc::now());
        assert_eq!(ctx.day_of_week, 5);
        assert_eq!(ctx.minutes_since_midnight, 19 * 60 + 30);
        assert_eq!(ctx.party_size, 4);
    }
}
