use serde::{Deserialize, Serialize};

/// Lifecycle status of a booking. Stored as varchar, parsed at the
/// domain boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Seated,
    Ordered,
    Appetizers,
    MainCourse,
    Dessert,
    Completed,
    DeclinedByRestaurant,
    CancelledByUser,
    CancelledByRestaurant,
    NoShow,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 12] = [
        Self::Pending,
        Self::Confirmed,
        Self::Seated,
        Self::Ordered,
        Self::Appetizers,
        Self::MainCourse,
        Self::Dessert,
        Self::Completed,
        Self::DeclinedByRestaurant,
        Self::CancelledByUser,
        Self::CancelledByRestaurant,
        Self::NoShow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Seated => "seated",
            Self::Ordered => "ordered",
            Self::Appetizers => "appetizers",
            Self::MainCourse => "main_course",
            Self::Dessert => "dessert",
            Self::Completed => "completed",
            Self::DeclinedByRestaurant => "declined_by_restaurant",
            Self::CancelledByUser => "cancelled_by_user",
            Self::CancelledByRestaurant => "cancelled_by_restaurant",
            Self::NoShow => "no_show",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::DeclinedByRestaurant
                | Self::CancelledByUser
                | Self::CancelledByRestaurant
                | Self::NoShow
        )
    }

    pub fn is_cancellation(self) -> bool {
        matches!(self, Self::CancelledByUser | Self::CancelledByRestaurant)
    }

    /// Whether the edge `self -> next` exists in the lifecycle graph.
    ///
    /// The dining progression is forward-only with course skips allowed.
    /// Declining is only possible while the request is pending; a no-show
    /// can only be recorded against a confirmed booking. Cancellation is
    /// allowed from every non-terminal state.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        match self {
            Pending => matches!(
                next,
                Confirmed | DeclinedByRestaurant | CancelledByUser | CancelledByRestaurant
            ),
            Confirmed => matches!(
                next,
                Seated | Completed | NoShow | CancelledByUser | CancelledByRestaurant
            ),
            Seated => matches!(
                next,
                Ordered | Appetizers | MainCourse | Dessert | Completed
                    | CancelledByUser | CancelledByRestaurant
            ),
            Ordered => matches!(
                next,
                Appetizers | MainCourse | Dessert | Completed
                    | CancelledByUser | CancelledByRestaurant
            ),
            Appetizers => matches!(
                next,
                MainCourse | Dessert | Completed | CancelledByUser | CancelledByRestaurant
            ),
            MainCourse => matches!(
                next,
                Dessert | Completed | CancelledByUser | CancelledByRestaurant
            ),
            Dessert => matches!(next, Completed | CancelledByUser | CancelledByRestaurant),
            Completed | DeclinedByRestaurant | CancelledByUser | CancelledByRestaurant
            | NoShow => false,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "seated" => Ok(Self::Seated),
            "ordered" => Ok(Self::Ordered),
            "appetizers" => Ok(Self::Appetizers),
            "main_course" => Ok(Self::MainCourse),
            "dessert" => Ok(Self::Dessert),
            "completed" => Ok(Self::Completed),
            "declined_by_restaurant" => Ok(Self::DeclinedByRestaurant),
            "cancelled_by_user" => Ok(Self::CancelledByUser),
            "cancelled_by_restaurant" => Ok(Self::CancelledByRestaurant),
            "no_show" => Ok(Self::NoShow),
            _ => Err(format!("unknown booking status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    fn allowed(from: BookingStatus) -> Vec<BookingStatus> {
        BookingStatus::ALL
            .into_iter()
            .filter(|next| from.can_transition_to(*next))
            .collect()
    }

    #[test]
    fn pending_edges() {
        assert_eq!(
            allowed(Pending),
            vec![Confirmed, DeclinedByRestaurant, CancelledByUser, CancelledByRestaurant]
        );
    }

    #[test]
    fn confirmed_edges() {
        assert_eq!(
            allowed(Confirmed),
            vec![Seated, Completed, CancelledByUser, CancelledByRestaurant, NoShow]
        );
    }

    #[test]
    fn dining_progression_is_forward_only() {
        assert!(Seated.can_transition_to(Ordered));
        assert!(Seated.can_transition_to(Dessert));
        assert!(Ordered.can_transition_to(MainCourse));
        assert!(Appetizers.can_transition_to(Completed));
        assert!(MainCourse.can_transition_to(Dessert));

        assert!(!Ordered.can_transition_to(Seated));
        assert!(!Dessert.can_transition_to(MainCourse));
        assert!(!MainCourse.can_transition_to(Appetizers));
        assert!(!Completed.can_transition_to(Seated));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in BookingStatus::ALL {
            if from.is_terminal() {
                assert!(allowed(from).is_empty(), "{from} should have no exits");
            }
        }
    }

    #[test]
    fn decline_only_from_pending() {
        for from in BookingStatus::ALL {
            let can = from.can_transition_to(DeclinedByRestaurant);
            assert_eq!(can, from == Pending, "decline from {from}");
        }
    }

    #[test]
    fn no_show_only_from_confirmed() {
        for from in BookingStatus::ALL {
            let can = from.can_transition_to(NoShow);
            assert_eq!(can, from == Confirmed, "no_show from {from}");
        }
    }

    #[test]
    fn cancellation_from_every_non_terminal() {
        for from in BookingStatus::ALL {
            let expected = !from.is_terminal();
            assert_eq!(from.can_transition_to(CancelledByUser), expected);
            assert_eq!(from.can_transition_to(CancelledByRestaurant), expected);
        }
    }

    #[test]
    fn no_self_loops() {
        for status in BookingStatus::ALL {
            assert!(!status.can_transition_to(status), "{status} -> {status}");
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in BookingStatus::ALL {
            let parsed: BookingStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("brunch".parse::<BookingStatus>().is_err());
    }
}
