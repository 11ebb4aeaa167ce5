//! One sender per channel behind a uniform contract, so the delivery
//! worker never branches on channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::async_trait;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::dispatch::signature;
use crate::models::{OutboxEntry, PushSubscription};
use crate::outbox::types::{Channel, DeliveryOutcome};

/// Where one delivery attempt goes: a registered device, or the
/// per-channel gateway that resolves the user's contact details itself.
#[derive(Debug, Clone)]
pub enum DeliveryTarget {
    Device(PushSubscription),
    Gateway { user_id: Uuid },
}

impl DeliveryTarget {
    pub fn subscription_id(&self) -> Option<Uuid> {
        match self {
            Self::Device(sub) => Some(sub.id),
            Self::Gateway { .. } => None,
        }
    }
}

#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, entry: &OutboxEntry, target: &DeliveryTarget) -> DeliveryOutcome;
}

/// Per-channel sender registry handed to the delivery worker.
#[derive(Clone)]
pub struct Senders {
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
}

impl Senders {
    pub fn new() -> Self {
        Self { senders: HashMap::new() }
    }

    pub fn with(mut self, channel: Channel, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(channel, sender);
        self
    }

    pub fn get(&self, channel: Channel) -> Option<Arc<dyn ChannelSender>> {
        self.senders.get(&channel).cloned()
    }
}

impl Default for Senders {
    fn default() -> Self {
        Self::new()
    }
}

fn outcome_from_status(status: reqwest::StatusCode) -> DeliveryOutcome {
    if status.is_success() {
        DeliveryOutcome::Delivered
    } else if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
        DeliveryOutcome::Permanent(format!("endpoint gone: {status}"))
    } else {
        DeliveryOutcome::Transient(format!("delivery failed: {status}"))
    }
}

/// Push sender: signed JSON POST straight to the device endpoint.
pub struct PushSender {
    http: reqwest::Client,
    webhook_secret: String,
    timeout: Duration,
}

impl PushSender {
    pub fn new(http: reqwest::Client, webhook_secret: String, timeout: Duration) -> Self {
        Self { http, webhook_secret, timeout }
    }
}

#[async_trait]
impl ChannelSender for PushSender {
    async fn send(&self, entry: &OutboxEntry, target: &DeliveryTarget) -> DeliveryOutcome {
        let DeliveryTarget::Device(subscription) = target else {
            return DeliveryOutcome::Permanent("push requires a device target".into());
        };

        let body = json!({
            "title": entry.title,
            "body": entry.body,
            "payload": entry.payload,
            "priority": entry.priority,
            "keys": { "p256dh": subscription.p256dh, "auth": subscription.auth },
        });
        let raw = match serde_json::to_vec(&body) {
            Ok(raw) => raw,
            Err(e) => return DeliveryOutcome::Permanent(format!("unserialisable payload: {e}")),
        };

        let timestamp = Utc::now().timestamp();
        let sig = signature::sign_payload(&self.webhook_secret, timestamp, &raw);

        let response = self
            .http
            .post(&subscription.endpoint)
            .header("Content-Type", "application/json")
            .header(signature::SIGNATURE_HEADER, sig)
            .header(signature::TIMESTAMP_HEADER, timestamp.to_string())
            .body(raw)
            .timeout(self.timeout)
            .send()
            .await;

        match response {
            Ok(resp) => outcome_from_status(resp.status()),
            Err(e) if e.is_timeout() => DeliveryOutcome::Transient("delivery timed out".into()),
            Err(e) => DeliveryOutcome::Transient(format!("request error: {e}")),
        }
    }
}

/// Gateway sender shared by email and sms: the gateway owns contact
/// resolution, we hand it the user and the content.
pub struct GatewaySender {
    http: reqwest::Client,
    gateway_url: String,
    channel: Channel,
    timeout: Duration,
}

impl GatewaySender {
    pub fn new(http: reqwest::Client, gateway_url: String, channel: Channel, timeout: Duration) -> Self {
        Self { http, gateway_url, channel, timeout }
    }
}

#[async_trait]
impl ChannelSender for GatewaySender {
    async fn send(&self, entry: &OutboxEntry, target: &DeliveryTarget) -> DeliveryOutcome {
        let DeliveryTarget::Gateway { user_id } = target else {
            return DeliveryOutcome::Permanent(format!(
                "{} delivery requires a gateway target",
                self.channel
            ));
        };

        let response = self
            .http
            .post(&self.gateway_url)
            .json(&json!({
                "user_id": user_id,
                "channel": self.channel.as_str(),
                "title": entry.title,
                "body": entry.body,
                "priority": entry.priority,
            }))
            .timeout(self.timeout)
            .send()
            .await;

        match response {
            Ok(resp) => outcome_from_status(resp.status()),
            Err(e) if e.is_timeout() => DeliveryOutcome::Transient("gateway timed out".into()),
            Err(e) => DeliveryOutcome::Transient(format!("gateway error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gone_endpoints_are_permanent_failures() {
        assert!(matches!(
            outcome_from_status(reqwest::StatusCode::GONE),
            DeliveryOutcome::Permanent(_)
        ));
        assert!(matches!(
            outcome_from_status(reqwest::StatusCode::NOT_FOUND),
            DeliveryOutcome::Permanent(_)
        ));
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(matches!(
            outcome_from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
            DeliveryOutcome::Transient(_)
        ));
        assert!(matches!(
            outcome_from_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
            DeliveryOutcome::Transient(_)
        ));
    }

    #[test]
    fn success_is_delivered() {
        assert_eq!(outcome_from_status(reqwest::StatusCode::OK), DeliveryOutcome::Delivered);
        assert_eq!(
            outcome_from_status(reqwest::StatusCode::CREATED),
            DeliveryOutcome::Delivered
        );
    }
}
