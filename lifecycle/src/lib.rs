//! # Account Lifecycle
//!
//! The account lifecycle manager and its collaborators.
//!
//! - [`AccountLifecycleManager`]: create, get, update, inactivate, reactivate,
//!   list and count accounts with idempotent, concurrency-safe writes
//! - [`AccountEventPublisher`]: bounded, best-effort outbound event queue
//! - [`AccountRequestHandler`]: wire request/response adaptation
//! - [`PageRequest`]: page size clamping and continuation tokens
//! - [`AccountError`]: caller-visible error taxonomy
//!
//! ## Guarantees
//!
//! - Creating an existing account returns it unchanged with `created = false`
//! - No-op updates and repeated inactivate/reactivate calls change nothing and
//!   emit nothing
//! - Each accepted transition emits exactly one event, keyed by `account_id`
//! - Event publication never fails or rolls back an operation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod handler;
mod manager;
pub mod pagination;
mod publisher;

pub use error::AccountError;
pub use handler::AccountRequestHandler;
pub use manager::{
    AccountLifecycleManager, AccountPage, CreateOutcome, DEFAULT_MAX_WRITE_ATTEMPTS, StatusChange,
};
pub use pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageRequest};
pub use publisher::AccountEventPublisher;
