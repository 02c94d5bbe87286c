//! Lifecycle events and their serialized form.
//!
//! Every accepted state transition of an account is announced by exactly one
//! immutable [`AccountEvent`]. Events are serialized with `bincode` and wrapped
//! in a [`SerializedEvent`] envelope before they are handed to an event bus.
//!
//! # Example
//!
//! ```
//! use accounts_core::event::{AccountEvent, AccountEventPayload, Event, SerializedEvent};
//! use accounts_core::Timestamp;
//!
//! let event = AccountEvent::new(
//!     "3f0a".to_string(),
//!     Timestamp { seconds: 1_700_000_000, nanos: 0 },
//!     "acct-1".to_string(),
//!     AccountEventPayload::Inactivated { reason: "policy violation".to_string() },
//! );
//! assert_eq!(event.event_type(), "AccountInactivated.v1");
//!
//! let serialized = SerializedEvent::from_event(&event).unwrap();
//! let decoded = AccountEvent::from_bytes(&serialized.data).unwrap();
//! assert_eq!(decoded, event);
//! ```

use crate::account::Timestamp;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be published to an event bus.
///
/// The `event_type()` string is a stable identifier with a version suffix
/// (`"AccountCreated.v1"`), so consumers can route and evolve schemas.
pub trait Event: Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes do not decode
    /// into this event type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// Operation-specific content of an [`AccountEvent`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEventPayload {
    /// A new account was inserted.
    Created {
        /// Display name at creation.
        name: String,
        /// Description at creation, `""` if none.
        description: String,
    },
    /// Name and/or description changed.
    Updated {
        /// New display name.
        name: String,
        /// New description, `""` if cleared.
        description: String,
    },
    /// The account was soft-deleted.
    Inactivated {
        /// Caller-supplied reason. Not persisted on the record.
        reason: String,
    },
    /// The account was restored.
    Reactivated {
        /// Caller-supplied reason. Not persisted on the record.
        reason: String,
    },
}

/// An immutable notification describing one accepted account transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEvent {
    /// Unique identifier of this event.
    pub event_id: String,
    /// Wall-clock time the event was built.
    pub timestamp: Timestamp,
    /// The account the transition applied to. Also the partition key.
    pub account_id: String,
    /// What happened.
    pub payload: AccountEventPayload,
}

impl AccountEvent {
    /// Create a new account event.
    #[must_use]
    pub const fn new(
        event_id: String,
        timestamp: Timestamp,
        account_id: String,
        payload: AccountEventPayload,
    ) -> Self {
        Self {
            event_id,
            timestamp,
            account_id,
            payload,
        }
    }

    /// Short lower-case operation name (`"created"`, `"updated"`, ...).
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self.payload {
            AccountEventPayload::Created { .. } => "created",
            AccountEventPayload::Updated { .. } => "updated",
            AccountEventPayload::Inactivated { .. } => "inactivated",
            AccountEventPayload::Reactivated { .. } => "reactivated",
        }
    }
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self.payload {
            AccountEventPayload::Created { .. } => "AccountCreated.v1",
            AccountEventPayload::Updated { .. } => "AccountUpdated.v1",
            AccountEventPayload::Inactivated { .. } => "AccountInactivated.v1",
            AccountEventPayload::Reactivated { .. } => "AccountReactivated.v1",
        }
    }
}

/// A serialized event ready for the wire.
///
/// Contains the event type name and the bincode-serialized event bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "AccountCreated.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(event_type: String, data: Vec<u8>) -> Self {
        Self { event_type, data }
    }

    /// Create a serialized event from an [`Event`].
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(event: &E) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
        })
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}
