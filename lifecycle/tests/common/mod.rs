//! Shared fixtures for lifecycle integration tests.

#![allow(dead_code)] // Not every test binary uses every helper

use accounts_core::{AccountEvent, Clock, EventBus};
use accounts_lifecycle::{AccountEventPublisher, AccountLifecycleManager};
use accounts_testing::{InMemoryAccountStore, RecordingEventBus, SteppingClock, test_clock};
use chrono::Duration;
use std::sync::Arc;

/// A manager wired to in-memory doubles.
pub struct Harness {
    pub manager: AccountLifecycleManager,
    pub store: InMemoryAccountStore,
    pub bus: RecordingEventBus,
    pub clock: SteppingClock,
}

impl Harness {
    /// Clock starts at 2025-01-01 and advances one second per reading.
    pub fn new() -> Self {
        Self::with_step(Duration::seconds(1))
    }

    pub fn with_step(step: Duration) -> Self {
        let store = InMemoryAccountStore::new();
        let bus = RecordingEventBus::new();
        let clock = SteppingClock::new(test_clock().now(), step);
        let manager = manager_with(store.clone(), Arc::new(bus.clone()), Arc::new(clock.clone()));

        Self {
            manager,
            store,
            bus,
            clock,
        }
    }

    /// Every event published so far, after draining the queue.
    pub async fn events(&self) -> Vec<AccountEvent> {
        self.manager.publisher().flush().await;
        self.bus.account_events()
    }

    /// Event type names published for `account_id`, after draining the queue.
    pub async fn event_types_for(&self, account_id: &str) -> Vec<String> {
        self.manager.publisher().flush().await;
        self.bus.event_types_for(account_id)
    }
}

pub fn manager_with(
    store: InMemoryAccountStore,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
) -> AccountLifecycleManager {
    let (publisher, _drain) = AccountEventPublisher::spawn(bus, "account-events", 1024, clock.clone());
    AccountLifecycleManager::new(Arc::new(store), publisher, clock)
}
