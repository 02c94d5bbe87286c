//! Best-effort outbound publication of lifecycle events.
//!
//! Events go through a bounded queue drained by one background task, so
//! submission never blocks a lifecycle operation and events leave in the
//! order they were accepted. Nothing here ever reports an error to the
//! caller: a full queue or a failing bus only produces logs and counters.

use accounts_core::{
    Account, AccountEvent, AccountEventPayload, Clock, Event, EventBus, SerializedEvent, Timestamp,
};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum Outbound {
    Event(AccountEvent),
    Flush(oneshot::Sender<()>),
}

/// Handle for submitting lifecycle events.
///
/// Cloning is cheap; all clones feed the same queue. The drain task stops once
/// every handle has been dropped and the queue is empty.
#[derive(Clone)]
pub struct AccountEventPublisher {
    tx: mpsc::Sender<Outbound>,
    clock: Arc<dyn Clock>,
}

impl AccountEventPublisher {
    /// Start the drain task and return the submission handle.
    ///
    /// Must be called from within a Tokio runtime. A `capacity` of zero is
    /// treated as one.
    ///
    /// # Example
    ///
    /// ```
    /// use accounts_lifecycle::AccountEventPublisher;
    /// use accounts_testing::RecordingEventBus;
    /// use accounts_core::SystemClock;
    /// use std::sync::Arc;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let bus = RecordingEventBus::new();
    /// let (publisher, _drain) =
    ///     AccountEventPublisher::spawn(Arc::new(bus.clone()), "account-events", 16, Arc::new(SystemClock));
    ///
    /// publisher.publish_inactivated("acct-1", "policy violation");
    /// publisher.flush().await;
    /// assert_eq!(bus.event_types_for("acct-1"), vec!["AccountInactivated.v1"]);
    /// # }
    /// ```
    pub fn spawn(
        bus: Arc<dyn EventBus>,
        topic: impl Into<String>,
        capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> (Self, JoinHandle<()>) {
        let topic = topic.into();
        let (tx, rx) = mpsc::channel(capacity.max(1));

        tracing::info!(topic = %topic, capacity = capacity.max(1), "Account event publisher started");
        let drain = tokio::spawn(drain(bus, topic, rx));

        (Self { tx, clock }, drain)
    }

    /// Announce a newly created account.
    pub fn publish_created(&self, account: &Account) {
        self.submit(
            &account.account_id,
            AccountEventPayload::Created {
                name: account.name.clone(),
                description: account.description_or_empty().to_string(),
            },
        );
    }

    /// Announce a changed name or description.
    pub fn publish_updated(&self, account: &Account) {
        self.submit(
            &account.account_id,
            AccountEventPayload::Updated {
                name: account.name.clone(),
                description: account.description_or_empty().to_string(),
            },
        );
    }

    /// Announce a soft delete.
    pub fn publish_inactivated(&self, account_id: &str, reason: &str) {
        self.submit(
            account_id,
            AccountEventPayload::Inactivated {
                reason: reason.to_string(),
            },
        );
    }

    /// Announce a restored account.
    pub fn publish_reactivated(&self, account_id: &str, reason: &str) {
        self.submit(
            account_id,
            AccountEventPayload::Reactivated {
                reason: reason.to_string(),
            },
        );
    }

    /// Wait until every event submitted before this call has been handed to
    /// the bus.
    ///
    /// Returns immediately if the drain task is gone.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Outbound::Flush(ack)).await.is_err() {
            return;
        }
        done.await.ok();
    }

    fn submit(&self, account_id: &str, payload: AccountEventPayload) {
        let event = AccountEvent::new(
            uuid::Uuid::new_v4().to_string(),
            Timestamp::from(self.clock.now()),
            account_id.to_string(),
            payload,
        );

        if let Err(error) = self.tx.try_send(Outbound::Event(event)) {
            let (reason, message) = match error {
                TrySendError::Full(message) => ("queue full", message),
                TrySendError::Closed(message) => ("queue closed", message),
            };
            if let Outbound::Event(event) = message {
                tracing::warn!(
                    account_id = %event.account_id,
                    event_type = event.event_type(),
                    reason = reason,
                    "Dropping account event"
                );
                metrics::counter!("accounts_events_dropped_total", "event_type" => event.event_type())
                    .increment(1);
            }
        }
    }
}

async fn drain(bus: Arc<dyn EventBus>, topic: String, mut rx: mpsc::Receiver<Outbound>) {
    while let Some(message) = rx.recv().await {
        match message {
            Outbound::Event(event) => publish_one(bus.as_ref(), &topic, &event).await,
            Outbound::Flush(ack) => {
                ack.send(()).ok();
            },
        }
    }
    tracing::info!(topic = %topic, "Account event publisher stopped");
}

async fn publish_one(bus: &dyn EventBus, topic: &str, event: &AccountEvent) {
    let event_type = event.event_type();

    let serialized = match SerializedEvent::from_event(event) {
        Ok(serialized) => serialized,
        Err(error) => {
            tracing::error!(
                account_id = %event.account_id,
                event_type = event_type,
                error = %error,
                "Failed to serialize account event"
            );
            metrics::counter!("accounts_events_failed_total", "event_type" => event_type)
                .increment(1);
            return;
        },
    };

    match bus.publish(topic, &event.account_id, &serialized).await {
        Ok(()) => {
            tracing::debug!(
                account_id = %event.account_id,
                event_id = %event.event_id,
                event_type = event_type,
                "Published account event"
            );
            metrics::counter!("accounts_events_published_total", "event_type" => event_type)
                .increment(1);
        },
        Err(error) => {
            tracing::warn!(
                account_id = %event.account_id,
                event_id = %event.event_id,
                event_type = event_type,
                error = %error,
                "Failed to publish account event"
            );
            metrics::counter!("accounts_events_failed_total", "event_type" => event_type)
                .increment(1);
        },
    }
}
