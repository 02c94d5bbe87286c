//! # Accounts Core
//!
//! Core types and traits for the tenant account lifecycle service.
//!
//! This crate has no I/O of its own. It defines the vocabulary shared by the
//! lifecycle manager and the adapters that plug into it:
//!
//! - [`account`]: the [`Account`] record, wire [`Timestamp`] and [`AccountFilter`]
//! - [`store`]: the [`AccountStore`] trait implemented by storage backends
//! - [`event`]: lifecycle events and the [`SerializedEvent`] envelope
//! - [`event_bus`]: the [`EventBus`] trait implemented by messaging backends
//! - [`environment`]: injected dependencies such as the [`Clock`]
//!
//! ## Data Flow
//!
//! ```text
//! Request Handler ──▶ Lifecycle Manager ──▶ AccountStore   (synchronous, source of truth)
//!                             │
//!                             └──────────▶ EventBus       (best-effort, decoupled)
//! ```
//!
//! ## Implementations
//!
//! - `PostgresAccountStore` (`accounts-postgres`) / `InMemoryAccountStore` (`accounts-testing`)
//! - `RedpandaEventBus` (`accounts-redpanda`) / `RecordingEventBus` (`accounts-testing`)

pub mod account;
pub mod event;
pub mod event_bus;
pub mod store;

// Re-export commonly used types
pub use account::{Account, AccountFilter, Timestamp};
pub use chrono::{DateTime, Utc};
pub use environment::{Clock, SystemClock};
pub use event::{AccountEvent, AccountEventPayload, Event, EventError, SerializedEvent};
pub use event_bus::{EventBus, EventBusError};
pub use store::{AccountStore, AccountStoreError};

/// Environment module - Dependency injection traits
///
/// External dependencies of the lifecycle manager are abstracted behind traits
/// and handed to it explicitly at construction time.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use accounts_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system wall clock.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
