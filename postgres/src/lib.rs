//! `PostgreSQL` account store for the tenant account lifecycle service.
//!
//! This crate provides [`PostgresAccountStore`], the production implementation
//! of the [`AccountStore`](accounts_core::AccountStore) trait from `accounts-core`.
//! It uses sqlx with connection pooling and supports:
//!
//! - Unique-key enforcement on `account_id` (insert conflicts)
//! - Compare-and-set updates keyed on `updated_at` (optimistic concurrency)
//! - Filtered, paginated listing with stable ordering
//! - Embedded migrations
//!
//! # Example
//!
//! ```no_run
//! use accounts_postgres::PostgresAccountStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresAccountStore::connect("postgres://localhost/accounts").await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod account_store;

pub use account_store::{PostgresAccountStore, escape_like};
