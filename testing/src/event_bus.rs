//! Event bus doubles.

use accounts_core::{AccountEvent, Event, EventBus, EventBusError, SerializedEvent};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// One call to [`EventBus::publish`] captured by [`RecordingEventBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRecord {
    /// Destination topic.
    pub topic: String,
    /// Partition key.
    pub key: String,
    /// The published event.
    pub event: SerializedEvent,
}

impl PublishedRecord {
    /// Decode the payload back into an [`AccountEvent`].
    ///
    /// Returns `None` if the payload is not an account event.
    #[must_use]
    pub fn account_event(&self) -> Option<AccountEvent> {
        AccountEvent::from_bytes(&self.event.data).ok()
    }
}

/// Event bus that records every publish in order.
///
/// Clones share the same record list.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventBus {
    records: Arc<Mutex<Vec<PublishedRecord>>>,
}

impl RecordingEventBus {
    /// Create a new empty recording bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PublishedRecord>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Every record published so far.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedRecord> {
        self.lock().clone()
    }

    /// Decoded account events, in publish order.
    #[must_use]
    pub fn account_events(&self) -> Vec<AccountEvent> {
        self.lock()
            .iter()
            .filter_map(PublishedRecord::account_event)
            .collect()
    }

    /// Event types published under `key`, in publish order.
    #[must_use]
    pub fn event_types_for(&self, key: &str) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|r| r.key == key)
            .map(|r| r.event.event_type.clone())
            .collect()
    }

    /// Number of published records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget all records.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl EventBus for RecordingEventBus {
    fn publish(
        &self,
        topic: &str,
        key: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let record = PublishedRecord {
            topic: topic.to_string(),
            key: key.to_string(),
            event: event.clone(),
        };

        Box::pin(async move {
            self.lock().push(record);
            Ok(())
        })
    }
}

/// Event bus whose publishes always fail.
#[derive(Debug, Clone, Default)]
pub struct FailingEventBus {
    attempts: Arc<AtomicUsize>,
}

impl FailingEventBus {
    /// Create a new failing bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publish attempts seen.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl EventBus for FailingEventBus {
    fn publish(
        &self,
        topic: &str,
        _key: &str,
        _event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();

        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(EventBusError::PublishFailed {
                topic,
                reason: "broker unavailable".to_string(),
            })
        })
    }
}
