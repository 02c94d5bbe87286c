//! Account store abstraction.
//!
//! The [`AccountStore`] is the single shared, mutable resource of the service.
//! It is a plain repository over [`Account`] records: the domain type carries no
//! persistence behavior of its own.
//!
//! # Concurrency Contract
//!
//! - [`AccountStore::insert`] must enforce uniqueness of `account_id` and report
//!   a violation as [`AccountStoreError::Conflict`].
//! - [`AccountStore::save`] is a compare-and-set on `updated_at`: the write only
//!   applies if the stored record's `updated_at` still equals
//!   `expected_updated_at`. Otherwise (including when the record vanished) it
//!   reports [`AccountStoreError::Conflict`] and the caller re-reads.
//!
//! Together these give every account a single total order of applied mutations
//! without any locking in the caller.
//!
//! # Implementations
//!
//! - `PostgresAccountStore` (in `accounts-postgres` crate): Production implementation
//! - `InMemoryAccountStore` (in `accounts-testing` crate): Fast, deterministic testing

use crate::account::{Account, AccountFilter};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during account store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountStoreError {
    /// Uniqueness violation on insert, or a stale `expected_updated_at` on save.
    #[error("Conflicting write for account: {account_id}")]
    Conflict {
        /// The account the conflicting write targeted.
        account_id: String,
    },

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, AccountStoreError>;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Durable mapping from account identifier to account record.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// concurrently running lifecycle operation.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the store can be held as
/// `Arc<dyn AccountStore>`.
pub trait AccountStore: Send + Sync {
    /// Look up a record by id, regardless of its `active` state.
    ///
    /// # Errors
    ///
    /// Returns [`AccountStoreError::Database`] if the lookup fails.
    fn find_by_id(&self, account_id: &str) -> StoreFuture<'_, Option<Account>>;

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// Returns [`AccountStoreError::Conflict`] if a record with the same
    /// `account_id` already exists, [`AccountStoreError::Database`] otherwise.
    fn insert(&self, account: &Account) -> StoreFuture<'_, ()>;

    /// Persist the mutable fields of an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`AccountStoreError::Conflict`] if the stored `updated_at` no
    /// longer equals `expected_updated_at` or the record does not exist.
    fn save(
        &self,
        account: &Account,
        expected_updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()>;

    /// Fetch matching records ordered by `created_at` descending, ties in
    /// insertion order, skipping `offset` rows and returning at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountStoreError::Database`] if the query fails.
    fn query(
        &self,
        filter: &AccountFilter,
        limit: usize,
        offset: usize,
    ) -> StoreFuture<'_, Vec<Account>>;

    /// Count matching records, ignoring pagination.
    ///
    /// # Errors
    ///
    /// Returns [`AccountStoreError::Database`] if the query fails.
    fn count(&self, filter: &AccountFilter) -> StoreFuture<'_, u64>;
}
