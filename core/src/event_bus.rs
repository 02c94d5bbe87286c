//! Event bus abstraction for announcing account lifecycle changes.
//!
//! The [`EventBus`] is the outbound messaging channel. Events are published to a
//! topic with a partition key; implementations must preserve the order of events
//! that share a key, which is what gives each account a strictly ordered event
//! history downstream.
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
//! │  1. Persist to  │
//! │  account store  │◄─── Source of truth
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ 2. Publish to   │
//! │    Event Bus    │◄─── Best-effort, keyed by account_id
//! └─────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - **Store first**: the mutation is committed before the event is published
//! - **Fire-and-forget**: a publish failure never rolls back the store
//! - **Ordered per key**: events with the same key keep their relative order
//!
//! # Implementations
//!
//! - `RedpandaEventBus` (`accounts-redpanda`) - Kafka-compatible production bus
//! - `RecordingEventBus` (`accounts-testing`) - captures events for assertions

use crate::event::SerializedEvent;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// Failed to connect to the event bus
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to publish an event to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to serialize an event for the wire
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Generic error for other failures
    #[error("Event bus error: {0}")]
    Other(String),
}

/// Trait for event bus implementations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; the publisher's drain task holds
/// the bus as `Arc<dyn EventBus>`.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage.
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic under a partition key.
    ///
    /// # Arguments
    ///
    /// - `topic`: The topic to publish to (e.g., "account-events")
    /// - `key`: The partition key; events sharing a key stay ordered
    /// - `event`: The serialized event to publish
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the publish operation fails.
    fn publish(
        &self,
        topic: &str,
        key: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;
}
