use serde::{Deserialize, Serialize};

/// Delivery channel of an outbox entry. Stored as varchar; batching code
/// dispatches through the `ChannelSender` trait, never by matching here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Push,
    Email,
    Sms,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(Self::Push),
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            _ => Err(format!("unknown channel: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            _ => Err(format!("unknown priority: {s}")),
        }
    }
}

/// Notification category, gated by the restaurant's per-category toggles.
/// Entries without a category bypass the toggle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    NewBooking,
    Cancellation,
    Modification,
    Waitlist,
    TableReady,
    OrderUpdate,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewBooking => "new_booking",
            Self::Cancellation => "cancellation",
            Self::Modification => "modification",
            Self::Waitlist => "waitlist",
            Self::TableReady => "table_ready",
            Self::OrderUpdate => "order_update",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_booking" => Ok(Self::NewBooking),
            "cancellation" => Ok(Self::Cancellation),
            "modification" => Ok(Self::Modification),
            "waitlist" => Ok(Self::Waitlist),
            "table_ready" => Ok(Self::TableReady),
            "order_update" => Ok(Self::OrderUpdate),
            _ => Err(format!("unknown notification category: {s}")),
        }
    }
}

/// Outbox entry status. Monotonic: queued -> sent | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Queued,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

/// Outcome of one delivery attempt to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Endpoint unreachable, gateway error, or timeout. Recorded, not retried.
    Transient(String),
    /// Endpoint gone for good (404/410). The subscription is deactivated.
    Permanent(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Delivered => None,
            Self::Transient(e) | Self::Permanent(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_round_trips_through_str() {
        for channel in [Channel::Push, Channel::Email, Channel::Sms] {
            let parsed: Channel = channel.as_str().parse().unwrap();
            assert_eq!(parsed, channel);
        }
        assert!("fax".parse::<Channel>().is_err());
    }

    #[test]
    fn category_round_trips_through_str() {
        for category in [
            Category::NewBooking,
            Category::Cancellation,
            Category::Modification,
            Category::Waitlist,
            Category::TableReady,
            Category::OrderUpdate,
        ] {
            let parsed: Category = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn priority_parses_from_request_strings() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
