//! # Accounts Server
//!
//! Process-level plumbing for the tenant account lifecycle service:
//!
//! - [`config`]: environment-driven [`Config`] with defaults and validation
//! - [`telemetry`]: tracing subscriber and Prometheus exporter
//! - [`bootstrap`]: [`AccountService`], the store, event bus, publisher and
//!   manager wired together from a [`Config`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod telemetry;

pub use bootstrap::{AccountService, BootstrapError};
pub use config::{Config, ConfigError};
