//! # Account Service Testing
//!
//! Testing utilities and in-memory doubles for the account lifecycle service.
//!
//! This crate provides:
//! - [`InMemoryAccountStore`]: an [`AccountStore`](accounts_core::AccountStore)
//!   with the same conflict semantics as the Postgres store
//! - [`RecordingEventBus`] and [`FailingEventBus`]: event bus doubles
//! - Deterministic clocks ([`FixedClock`], [`SteppingClock`])
//!
//! ## Example
//!
//! ```
//! use accounts_testing::{InMemoryAccountStore, RecordingEventBus, test_clock};
//! use accounts_core::Clock;
//!
//! let store = InMemoryAccountStore::new();
//! let bus = RecordingEventBus::new();
//! let clock = test_clock();
//!
//! assert!(store.is_empty());
//! assert!(bus.is_empty());
//! assert_eq!(clock.now(), clock.now());
//! ```

mod account_store;
mod event_bus;

pub use account_store::InMemoryAccountStore;
pub use event_bus::{FailingEventBus, PublishedRecord, RecordingEventBus};

use accounts_core::Clock;
use chrono::{DateTime, Duration, Utc};

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use accounts_testing::mocks::FixedClock;
    /// use accounts_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step on every reading.
    ///
    /// Clones share the same timeline.
    ///
    /// # Example
    ///
    /// ```
    /// use accounts_testing::mocks::SteppingClock;
    /// use accounts_core::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = SteppingClock::new(start, Duration::seconds(1));
    /// assert_eq!(clock.now(), start);
    /// assert_eq!(clock.now(), start + Duration::seconds(1));
    /// ```
    #[derive(Debug, Clone)]
    pub struct SteppingClock {
        next: Arc<Mutex<DateTime<Utc>>>,
        step: Duration,
    }

    impl SteppingClock {
        /// Create a clock whose first reading is `start`.
        #[must_use]
        pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Arc::new(Mutex::new(start)),
                step,
            }
        }

        /// Move the clock to `time` without consuming a step.
        pub fn set(&self, time: DateTime<Utc>) {
            *self
                .next
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = time;
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self
                .next
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let now = *next;
            *next = now + self.step;
            now
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SteppingClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_stepping_clock_shares_timeline_across_clones() {
        let start = test_clock().now();
        let clock = SteppingClock::new(start, Duration::milliseconds(10));
        let other = clock.clone();

        assert_eq!(clock.now(), start);
        assert_eq!(other.now(), start + Duration::milliseconds(10));
        assert_eq!(clock.now(), start + Duration::milliseconds(20));
    }

    #[test]
    fn test_stepping_clock_set() {
        let start = test_clock().now();
        let clock = SteppingClock::new(start, Duration::seconds(1));
        let earlier = start - Duration::hours(1);

        clock.set(earlier);
        assert_eq!(clock.now(), earlier);
        assert_eq!(clock.now(), earlier + Duration::seconds(1));
    }
}
