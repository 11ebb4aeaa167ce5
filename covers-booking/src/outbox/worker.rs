//! Delivery worker: drains due outbox entries and fans each one out to
//! its resolved targets.
//!
//! Attempts are isolated. The batch joins on every outcome before the
//! entry is finalised; a dead endpoint costs one history row, nothing
//! more.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use covers_shared::clients::db::DbPool;
use covers_shared::errors::AppResult;

use crate::models::OutboxEntry;
use crate::outbox::channels::{ChannelSender, DeliveryTarget, Senders};
use crate::outbox::types::{Category, Channel, DeliveryOutcome, OutboxStatus, Priority};
use crate::outbox::{entries, suppression};
use crate::registry;

pub struct DeliveryWorker {
    pool: DbPool,
    senders: Senders,
    poll_interval: Duration,
    batch_size: i64,
    concurrency: usize,
}

impl DeliveryWorker {
    pub fn new(
        pool: DbPool,
        senders: Senders,
        poll_interval: Duration,
        batch_size: i64,
        concurrency: usize,
    ) -> Self {
        Self { pool, senders, poll_interval, batch_size, concurrency }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.sweep().await {
                Ok(0) => {}
                Ok(processed) => tracing::info!(processed, "outbox sweep finished"),
                Err(e) => tracing::error!(error = %e, "outbox sweep failed"),
            }
        }
    }

    async fn sweep(&self) -> AppResult<usize> {
        let due = entries::due_entries(&self.pool, Utc::now(), self.batch_size)?;
        let count = due.len();

        for entry in due {
            let entry_id = entry.id;
            if let Err(e) = self.process_entry(entry).await {
                tracing::error!(entry_id = %entry_id, error = %e, "entry processing failed");
                if let Err(finalize_err) = entries::finalize(
                    &self.pool,
                    entry_id,
                    OutboxStatus::Failed,
                    0,
                    Some(e.to_string()),
                ) {
                    tracing::error!(
                        entry_id = %entry_id,
                        error = %finalize_err,
                        "could not mark entry failed, it stays queued for the next sweep"
                    );
                }
            }
        }

        Ok(count)
    }

    async fn process_entry(&self, entry: OutboxEntry) -> AppResult<()> {
        let priority = entry.priority.parse::<Priority>().unwrap_or(Priority::Normal);
        let category = entry.category.as_deref().and_then(|raw| match raw.parse::<Category>() {
            Ok(category) => Some(category),
            Err(_) => {
                tracing::warn!(entry_id = %entry.id, category = raw, "unknown category, not gated");
                None
            }
        });

        if let Some(restaurant_id) = entry.restaurant_id {
            let prefs = registry::preferences::preferences_for(&self.pool, restaurant_id)?;
            let now = Utc::now();
            let minute_of_day = (now.hour() * 60 + now.minute()) as i32;
            if let Some(reason) = suppression::check(&prefs, category, priority, minute_of_day) {
                tracing::debug!(entry_id = %entry.id, ?reason, "entry suppressed by preferences");
                return entries::finalize(&self.pool, entry.id, OutboxStatus::Sent, 0, None);
            }
        }

        let Ok(channel) = entry.channel.parse::<Channel>() else {
            return entries::finalize(
                &self.pool,
                entry.id,
                OutboxStatus::Failed,
                0,
                Some(format!("unknown channel: {}", entry.channel)),
            );
        };

        let targets = self.resolve_targets(&entry, channel)?;
        if targets.is_empty() {
            tracing::debug!(entry_id = %entry.id, %channel, "no active targets, nothing to send");
            return entries::finalize(&self.pool, entry.id, OutboxStatus::Sent, 0, None);
        }

        let Some(sender) = self.senders.get(channel) else {
            return entries::finalize(
                &self.pool,
                entry.id,
                OutboxStatus::Failed,
                0,
                Some(format!("no sender configured for channel: {channel}")),
            );
        };

        let outcomes = fan_out(sender, &entry, targets, self.concurrency).await;

        let delivered = outcomes.iter().filter(|(_, o)| o.is_delivered()).count();
        metrics::counter!("notification_deliveries_total", "channel" => channel.as_str())
            .increment(delivered as u64);
        metrics::counter!("notification_delivery_failures_total", "channel" => channel.as_str())
            .increment((outcomes.len() - delivered) as u64);

        // Bookkeeping is best-effort per target: the entry's status comes
        // from the delivery outcomes alone, never from a failed audit row.
        for (target, outcome) in &outcomes {
            log_discarded(
                entry.id,
                "history",
                entries::record_history(
                    &self.pool,
                    entry.id,
                    target.subscription_id(),
                    outcome.is_delivered(),
                    outcome.error().map(String::from),
                ),
            );

            if let (DeliveryTarget::Device(sub), DeliveryOutcome::Permanent(reason)) =
                (target, outcome)
            {
                tracing::warn!(
                    subscription_id = %sub.id,
                    reason,
                    "deactivating dead push subscription"
                );
                log_discarded(
                    entry.id,
                    "deactivate",
                    registry::subscriptions::deactivate_by_id(&self.pool, sub.id),
                );
            }
        }

        let (status, last_error) =
            settle(&outcomes.iter().map(|(_, o)| o.clone()).collect::<Vec<_>>());
        entries::finalize(&self.pool, entry.id, status, outcomes.len() as i32, last_error)
    }

    fn resolve_targets(
        &self,
        entry: &OutboxEntry,
        channel: Channel,
    ) -> AppResult<Vec<DeliveryTarget>> {
        match channel {
            Channel::Push => {
                let subs = match (entry.user_id, entry.restaurant_id) {
                    (Some(user_id), _) => {
                        registry::subscriptions::active_subscriptions_for(&self.pool, &[user_id])?
                    }
                    (None, Some(restaurant_id)) => {
                        registry::subscriptions::staff_devices_for(&self.pool, restaurant_id)?
                    }
                    (None, None) => Vec::new(),
                };
                Ok(subs.into_iter().map(DeliveryTarget::Device).collect())
            }
            Channel::Email | Channel::Sms => Ok(entry
                .user_id
                .map(|user_id| DeliveryTarget::Gateway { user_id })
                .into_iter()
                .collect()),
        }
    }
}

/// Absorb a failed bookkeeping step. Audit rows and deactivations run
/// after the deliveries; an error here is logged and dropped so the
/// remaining targets still get their rows.
fn log_discarded(entry_id: Uuid, step: &'static str, result: AppResult<()>) {
    if let Err(e) = result {
        tracing::warn!(entry_id = %entry_id, step, error = %e, "bookkeeping step failed");
    }
}

/// Dispatch up to `concurrency` attempts at once and collect every
/// outcome. All-settled: a failure never short-circuits its siblings.
pub async fn fan_out(
    sender: Arc<dyn ChannelSender>,
    entry: &OutboxEntry,
    targets: Vec<DeliveryTarget>,
    concurrency: usize,
) -> Vec<(DeliveryTarget, DeliveryOutcome)> {
    stream::iter(targets)
        .map(|target| {
            let sender = sender.clone();
            async move {
                let outcome = sender.send(entry, &target).await;
                (target, outcome)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}

/// Fold attempt outcomes into the entry's final status. One delivered
/// target is enough to call the entry sent; all-failed keeps the last
/// error for the audit trail.
pub fn settle(outcomes: &[DeliveryOutcome]) -> (OutboxStatus, Option<String>) {
    if outcomes.iter().any(DeliveryOutcome::is_delivered) {
        (OutboxStatus::Sent, None)
    } else {
        let last_error = outcomes
            .iter()
            .rev()
            .find_map(|o| o.error())
            .map(String::from);
        (OutboxStatus::Failed, last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    use crate::models::PushSubscription;

    fn entry() -> OutboxEntry {
        OutboxEntry {
            id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            restaurant_id: None,
            channel: "push".into(),
            category: None,
            title: "Table ready".into(),
            body: "Your table is ready".into(),
            payload: None,
            priority: "normal".into(),
            status: "queued".into(),
            scheduled_for: Utc::now(),
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    fn device(endpoint: &str) -> DeliveryTarget {
        DeliveryTarget::Device(PushSubscription {
            id: Uuid::new_v4(),
            endpoint: endpoint.into(),
            p256dh: "key".into(),
            auth: "auth".into(),
            user_id: Uuid::new_v4(),
            restaurant_id: None,
            device_name: None,
            user_agent: None,
            is_active: true,
            last_used_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    /// Sender scripted per endpoint: "fail" endpoints fail transiently,
    /// "gone" endpoints fail permanently, "slow" endpoints sleep first.
    struct ScriptedSender {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChannelSender for ScriptedSender {
        async fn send(&self, _entry: &OutboxEntry, target: &DeliveryTarget) -> DeliveryOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let DeliveryTarget::Device(sub) = target else {
                return DeliveryOutcome::Delivered;
            };
            if sub.endpoint.contains("slow") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if sub.endpoint.contains("gone") {
                DeliveryOutcome::Permanent("endpoint gone: 410".into())
            } else if sub.endpoint.contains("fail") {
                DeliveryOutcome::Transient("delivery failed: 503".into())
            } else {
                DeliveryOutcome::Delivered
            }
        }
    }

    #[tokio::test]
    async fn fan_out_settles_every_target() {
        let sender = Arc::new(ScriptedSender { calls: AtomicUsize::new(0) });
        let targets = vec![
            device("https://push.example/a"),
            device("https://push.example/fail"),
            device("https://push.example/slow"),
            device("https://push.example/gone"),
        ];

        let outcomes = fan_out(sender.clone(), &entry(), targets, 8).await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 4);
        assert_eq!(outcomes.iter().filter(|(_, o)| o.is_delivered()).count(), 2);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let sender = Arc::new(ScriptedSender { calls: AtomicUsize::new(0) });
        let targets: Vec<_> = (0..20)
            .map(|i| {
                if i == 3 {
                    device("https://push.example/fail")
                } else {
                    device(&format!("https://push.example/{i}"))
                }
            })
            .collect();

        let outcomes = fan_out(sender, &entry(), targets, 4).await;
        assert_eq!(outcomes.len(), 20);
        assert_eq!(outcomes.iter().filter(|(_, o)| o.is_delivered()).count(), 19);
    }

    #[tokio::test]
    async fn concurrency_of_one_still_delivers_everything() {
        let sender = Arc::new(ScriptedSender { calls: AtomicUsize::new(0) });
        let targets = vec![device("https://push.example/a"), device("https://push.example/b")];
        let outcomes = fan_out(sender, &entry(), targets, 1).await;
        assert_eq!(outcomes.len(), 2);
    }

    #[test]
    fn any_delivery_settles_the_entry_as_sent() {
        let (status, err) = settle(&[
            DeliveryOutcome::Transient("delivery failed: 503".into()),
            DeliveryOutcome::Delivered,
            DeliveryOutcome::Permanent("endpoint gone: 410".into()),
        ]);
        assert_eq!(status, OutboxStatus::Sent);
        assert!(err.is_none());
    }

    #[test]
    fn bookkeeping_failures_are_absorbed() {
        use covers_shared::errors::AppError;

        // Must not propagate or panic; a failed audit row cannot change
        // the entry's settled status.
        log_discarded(Uuid::new_v4(), "history", Err(AppError::internal("audit insert failed")));
        log_discarded(Uuid::new_v4(), "deactivate", Ok(()));

        let (status, err) = settle(&[
            DeliveryOutcome::Delivered,
            DeliveryOutcome::Permanent("endpoint gone: 410".into()),
        ]);
        assert_eq!(status, OutboxStatus::Sent);
        assert!(err.is_none());
    }

    #[test]
    fn all_failed_keeps_the_last_error() {
        let (status, err) = settle(&[
            DeliveryOutcome::Transient("delivery failed: 503".into()),
            DeliveryOutcome::Permanent("endpoint gone: 410".into()),
        ]);
        assert_eq!(status, OutboxStatus::Failed);
        assert_eq!(err.as_deref(), Some("endpoint gone: 410"));
    }
}
