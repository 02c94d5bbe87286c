//! Wiring of the account service from configuration.
//!
//! [`AccountService::from_config`] connects the account store, runs
//! migrations when enabled, creates the Redpanda producer, starts the event
//! publisher and builds the lifecycle manager and request handler on top.

use crate::config::{Config, ConfigError};
use accounts_core::{AccountStoreError, Clock, EventBus, EventBusError, SystemClock};
use accounts_lifecycle::{AccountEventPublisher, AccountLifecycleManager, AccountRequestHandler};
use accounts_postgres::PostgresAccountStore;
use accounts_redpanda::RedpandaEventBus;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

/// Errors while starting the service.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The account store could not be reached or migrated.
    #[error("Account store: {0}")]
    Store(#[from] AccountStoreError),
    /// The event bus producer could not be created.
    #[error("Event bus: {0}")]
    EventBus(#[from] EventBusError),
}

/// A running account service.
pub struct AccountService {
    store: PostgresAccountStore,
    handler: AccountRequestHandler,
    drain: JoinHandle<()>,
}

impl AccountService {
    /// Connect every dependency and assemble the service.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] if the configuration is invalid, the
    /// database is unreachable or migrations fail, or the producer cannot be
    /// created.
    pub async fn from_config(config: &Config) -> Result<Self, BootstrapError> {
        config.validate()?;

        info!("Connecting to account store database...");
        let options = PgPoolOptions::new()
            .max_connections(config.postgres.max_connections)
            .min_connections(config.postgres.min_connections)
            .acquire_timeout(config.postgres.connect_timeout());
        let store = PostgresAccountStore::connect_with(options, &config.postgres.url).await?;

        if config.postgres.run_migrations {
            store.migrate().await?;
        } else {
            info!("Skipping account store migrations");
        }

        info!("Creating Redpanda producer...");
        let event_bus: Arc<dyn EventBus> = Arc::new(
            RedpandaEventBus::builder()
                .brokers(&config.redpanda.brokers)
                .producer_acks(&config.redpanda.producer_acks)
                .compression(&config.redpanda.compression)
                .timeout(config.redpanda.timeout())
                .build()?,
        );

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let (publisher, drain) = AccountEventPublisher::spawn(
            event_bus,
            config.redpanda.topic.clone(),
            config.lifecycle.event_queue_capacity,
            clock.clone(),
        );

        let manager = AccountLifecycleManager::new(Arc::new(store.clone()), publisher, clock)
            .with_max_write_attempts(config.lifecycle.max_write_attempts);

        info!(
            topic = %config.redpanda.topic,
            queue_capacity = config.lifecycle.event_queue_capacity,
            max_write_attempts = config.lifecycle.max_write_attempts,
            "Account service ready"
        );

        Ok(Self {
            store,
            handler: AccountRequestHandler::new(manager),
            drain,
        })
    }

    /// The request handler transports call into.
    #[must_use]
    pub const fn handler(&self) -> &AccountRequestHandler {
        &self.handler
    }

    /// Probe the account store.
    ///
    /// # Errors
    ///
    /// Returns [`AccountStoreError::Database`] if the database does not answer.
    pub async fn health_check(&self) -> Result<(), AccountStoreError> {
        self.store.health_check().await
    }

    /// Stop accepting work and hand queued events to the bus.
    ///
    /// Waits at most `grace` for the outbound queue to drain.
    pub async fn shutdown(self, grace: Duration) {
        let Self {
            store,
            handler,
            drain,
        } = self;

        let publisher = handler.manager().publisher().clone();
        if tokio::time::timeout(grace, publisher.flush()).await.is_err() {
            tracing::warn!(grace_ms = grace.as_millis(), "Event queue did not drain before shutdown");
        }

        // The drain task ends once every publisher handle is gone.
        drop(publisher);
        drop(handler);
        if tokio::time::timeout(grace, drain).await.is_err() {
            tracing::warn!("Event publisher task still running at shutdown");
        }

        store.pool().close().await;
        info!("Account service stopped");
    }
}
