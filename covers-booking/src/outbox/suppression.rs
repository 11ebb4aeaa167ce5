//! Preference filtering applied before any delivery attempt.
//!
//! A suppressed entry is finalised `sent` with zero attempts; suppression
//! is a normal outcome, not an error.

use crate::models::NotificationPreference;
use crate::outbox::types::{Category, Priority};

/// Why an entry was suppressed instead of delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    CategoryDisabled,
    QuietHours,
}

/// Decide whether an entry may be delivered under the restaurant's
/// preferences at the given send minute. High priority bypasses quiet
/// hours but not category toggles.
pub fn check(
    prefs: &NotificationPreference,
    category: Option<Category>,
    priority: Priority,
    minute_of_day: i32,
) -> Option<Suppression> {
    if let Some(category) = category {
        if !category_enabled(prefs, category) {
            return Some(Suppression::CategoryDisabled);
        }
    }

    if priority != Priority::High
        && within_quiet_hours(prefs.quiet_hours_start, prefs.quiet_hours_end, minute_of_day)
    {
        return Some(Suppression::QuietHours);
    }

    None
}

pub fn category_enabled(prefs: &NotificationPreference, category: Category) -> bool {
    match category {
        Category::NewBooking => prefs.notify_new_booking,
        Category::Cancellation => prefs.notify_cancellation,
        Category::Modification => prefs.notify_modification,
        Category::Waitlist => prefs.notify_waitlist,
        Category::TableReady => prefs.notify_table_ready,
        Category::OrderUpdate => prefs.notify_order_update,
    }
}

/// Quiet-hours window test, minutes since midnight.
///
/// Same-day window (start < end): suppressed when start <= t < end.
/// Overnight window (start > end): suppressed when t >= start or t < end.
/// A half-configured or equal window suppresses nothing.
pub fn within_quiet_hours(start: Option<i32>, end: Option<i32>, minute_of_day: i32) -> bool {
    let (Some(start), Some(end)) = (start, end) else {
        return false;
    };

    match start.cmp(&end) {
        std::cmp::Ordering::Less => minute_of_day >= start && minute_of_day < end,
        std::cmp::Ordering::Greater => minute_of_day >= start || minute_of_day < end,
        std::cmp::Ordering::Equal => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn prefs() -> NotificationPreference {
        NotificationPreference {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
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

    #[test]
    fn same_day_window() {
        // 14:00 - 16:00
        let (start, end) = (Some(14 * 60), Some(16 * 60));
        assert!(!within_quiet_hours(start, end, 13 * 60 + 59));
        assert!(within_quiet_hours(start, end, 14 * 60));
        assert!(within_quiet_hours(start, end, 15 * 60));
        assert!(!within_quiet_hours(start, end, 16 * 60));
        assert!(!within_quiet_hours(start, end, 20 * 60));
    }

    #[test]
    fn overnight_window_wraps_midnight() {
        // 22:00 - 08:00
        let (start, end) = (Some(22 * 60), Some(8 * 60));
        assert!(within_quiet_hours(start, end, 23 * 60));
        assert!(within_quiet_hours(start, end, 0));
        assert!(within_quiet_hours(start, end, 7 * 60 + 59));
        assert!(!within_quiet_hours(start, end, 8 * 60));
        assert!(!within_quiet_hours(start, end, 12 * 60));
        assert!(within_quiet_hours(start, end, 22 * 60));
    }

    #[test]
    fn unset_window_never_suppresses() {
        assert!(!within_quiet_hours(None, None, 0));
        assert!(!within_quiet_hours(Some(600), None, 600));
        assert!(!within_quiet_hours(None, Some(600), 300));
        assert!(!within_quiet_hours(Some(600), Some(600), 600));
    }

    #[test]
    fn disabled_category_is_suppressed() {
        let mut p = prefs();
        p.notify_cancellation = false;
        assert_eq!(
            check(&p, Some(Category::Cancellation), Priority::Normal, 600),
            Some(Suppression::CategoryDisabled)
        );
        assert_eq!(check(&p, Some(Category::NewBooking), Priority::Normal, 600), None);
        assert_eq!(check(&p, None, Priority::Normal, 600), None);
    }

    #[test]
    fn quiet_hours_suppress_normal_but_not_high_priority() {
        let mut p = prefs();
        p.quiet_hours_start = Some(22 * 60);
        p.quiet_hours_end = Some(8 * 60);

        assert_eq!(
            check(&p, Some(Category::NewBooking), Priority::Normal, 23 * 60),
            Some(Suppression::QuietHours)
        );
        assert_eq!(check(&p, Some(Category::NewBooking), Priority::High, 23 * 60), None);
        assert_eq!(check(&p, Some(Category::NewBooking), Priority::Normal, 12 * 60), None);
    }

    #[test]
    fn category_toggle_wins_over_priority() {
        let mut p = prefs();
        p.notify_table_ready = false;
        assert_eq!(
            check(&p, Some(Category::TableReady), Priority::High, 600),
            Some(Suppression::CategoryDisabled)
        );
    }
}
