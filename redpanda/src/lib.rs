//! Redpanda event bus for account lifecycle events.
//!
//! This crate provides a Redpanda-based event bus that implements the
//! [`EventBus`] trait from `accounts-core`. It uses rdkafka, so any
//! Kafka-compatible broker works (Redpanda, Apache Kafka, AWS MSK, ...).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ Lifecycle op    │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  1. Postgres    │
//! │   (persist)     │◄─── Source of truth
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  2. Redpanda    │
//! │   (publish)     │◄─── Keyed by account_id
//! └─────────────────┘
//! ```
//!
//! # Delivery Semantics
//!
//! - Every record is keyed by `account_id`, so all events of one account land on
//!   the same partition and keep their order
//! - The record payload is the bincode-encoded [`SerializedEvent`]
//! - The event type is also carried in an `event_type` header for consumers that
//!   route without decoding the payload
//!
//! # Example
//!
//! ```no_run
//! use accounts_redpanda::RedpandaEventBus;
//! use accounts_core::{EventBus, SerializedEvent};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let event_bus = RedpandaEventBus::new("localhost:9092")?;
//!
//! let event = SerializedEvent::new("AccountCreated.v1".to_string(), vec![1, 2, 3]);
//! event_bus.publish("account-events", "acct-1", &event).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use accounts_core::{EventBus, EventBusError, SerializedEvent};
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Header carrying the event type name.
pub const EVENT_TYPE_HEADER: &str = "event_type";

const DEFAULT_ACKS: &str = "all";
const DEFAULT_COMPRESSION: &str = "none";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Redpanda event bus implementation.
///
/// # Configuration
///
/// - **Broker addresses**: Bootstrap servers (required)
/// - **Producer acks**: `"0"`, `"1"` or `"all"` (default: `"all"`)
/// - **Compression**: `"none"`, `"gzip"`, `"snappy"`, `"lz4"`, `"zstd"` (default: `"none"`)
/// - **Timeout**: Delivery timeout per record (default: 5s)
///
/// # Example
///
/// ```no_run
/// use accounts_redpanda::RedpandaEventBus;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let event_bus = RedpandaEventBus::builder()
///     .brokers("localhost:9092,localhost:9093")
///     .producer_acks("all")
///     .compression("lz4")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RedpandaEventBus {
    producer: FutureProducer,
    brokers: String,
    timeout: Duration,
}

impl RedpandaEventBus {
    /// Create a new Redpanda event bus with default configuration.
    ///
    /// # Parameters
    ///
    /// - `brokers`: Comma-separated list of broker addresses (e.g., "localhost:9092")
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if the producer cannot be created.
    pub fn new(brokers: &str) -> Result<Self, EventBusError> {
        Self::builder().brokers(brokers).build()
    }

    /// Create a new builder for configuring the event bus.
    #[must_use]
    pub fn builder() -> RedpandaEventBusBuilder {
        RedpandaEventBusBuilder::default()
    }

    /// The configured broker addresses.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }

    /// The per-record delivery timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Builder for [`RedpandaEventBus`].
#[derive(Default, Debug, Clone)]
pub struct RedpandaEventBusBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
}

impl RedpandaEventBusBuilder {
    /// Set the bootstrap broker addresses.
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the producer acknowledgement level.
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Set the compression codec.
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Set the per-record delivery timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the event bus.
    ///
    /// Creating the producer does not contact the brokers; an unreachable
    /// cluster surfaces later as [`EventBusError::PublishFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if no brokers were set or
    /// the producer configuration is rejected.
    pub fn build(self) -> Result<RedpandaEventBus, EventBusError> {
        let brokers = self
            .brokers
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| EventBusError::ConnectionFailed("Brokers not configured".to_string()))?;

        let acks = self.producer_acks.as_deref().unwrap_or(DEFAULT_ACKS);
        let compression = self.compression.as_deref().unwrap_or(DEFAULT_COMPRESSION);
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .set("acks", acks)
            .set("compression.type", compression)
            .create()
            .map_err(|e| {
                EventBusError::ConnectionFailed(format!("Failed to create producer: {e}"))
            })?;

        tracing::info!(
            brokers = %brokers,
            acks = acks,
            compression = compression,
            timeout_ms = timeout.as_millis(),
            "RedpandaEventBus created successfully"
        );

        Ok(RedpandaEventBus {
            producer,
            brokers,
            timeout,
        })
    }
}

impl EventBus for RedpandaEventBus {
    fn publish(
        &self,
        topic: &str,
        key: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        // Clone data before moving into async block
        let topic = topic.to_string();
        let key = key.to_string();
        let event = event.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let payload = encode_payload(&event)?;

            let headers = OwnedHeaders::new().insert(Header {
                key: EVENT_TYPE_HEADER,
                value: Some(event.event_type.as_str()),
            });

            let record = FutureRecord::to(&topic)
                .key(&key)
                .payload(&payload)
                .headers(headers);

            match self.producer.send(record, Timeout::After(timeout)).await {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        topic = %topic,
                        key = %key,
                        partition = partition,
                        offset = offset,
                        event_type = %event.event_type,
                        "Event published successfully"
                    );
                    Ok(())
                },
                Err((kafka_error, _)) => {
                    tracing::error!(
                        topic = %topic,
                        key = %key,
                        event_type = %event.event_type,
                        error = %kafka_error,
                        "Failed to publish event"
                    );
                    Err(EventBusError::PublishFailed {
                        topic,
                        reason: kafka_error.to_string(),
                    })
                },
            }
        })
    }
}

/// Encode a [`SerializedEvent`] as a record payload.
///
/// # Errors
///
/// Returns [`EventBusError::SerializationFailed`] if bincode rejects the event.
pub fn encode_payload(event: &SerializedEvent) -> Result<Vec<u8>, EventBusError> {
    bincode::serialize(event)
        .map_err(|e| EventBusError::SerializationFailed(format!("Failed to serialize event: {e}")))
}

/// Decode a record payload produced by [`encode_payload`].
///
/// # Errors
///
/// Returns [`EventBusError::SerializationFailed`] if the bytes are not a valid event.
pub fn decode_payload(payload: &[u8]) -> Result<SerializedEvent, EventBusError> {
    bincode::deserialize(payload)
        .map_err(|e| EventBusError::SerializationFailed(format!("Failed to deserialize event: {e}")))
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Test code uses expect for clear failure messages
mod tests {
    use super::*;

    #[test]
    fn redpanda_event_bus_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaEventBus>();
        assert_sync::<RedpandaEventBus>();
    }

    #[test]
    fn build_without_brokers_fails() {
        let result = RedpandaEventBus::builder().build();
        assert!(matches!(result, Err(EventBusError::ConnectionFailed(_))));
    }

    #[test]
    fn build_with_blank_brokers_fails() {
        let result = RedpandaEventBus::builder().brokers("  ").build();
        assert!(matches!(result, Err(EventBusError::ConnectionFailed(_))));
    }

    #[test]
    fn build_does_not_require_reachable_brokers() {
        let bus = RedpandaEventBus::builder()
            .brokers("localhost:1")
            .timeout(Duration::from_millis(250))
            .build()
            .expect("producer creation is lazy");

        assert_eq!(bus.brokers(), "localhost:1");
        assert_eq!(bus.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn payload_codec_preserves_event() {
        let event = SerializedEvent::new("AccountCreated.v1".to_string(), vec![1, 2, 3]);

        let bytes = encode_payload(&event).expect("encode");
        let decoded = decode_payload(&bytes).expect("decode");

        assert_eq!(decoded, event);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_payload(&[0xff]),
            Err(EventBusError::SerializationFailed(_))
        ));
    }
}
