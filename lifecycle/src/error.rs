//! Caller-visible error taxonomy.

use accounts_core::AccountStoreError;
use thiserror::Error;

/// Errors surfaced by the lifecycle manager.
///
/// There is no `AlreadyExists`: creating an existing account is an idempotent
/// success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Caller input failed validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The target account does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Store failure or other unclassified error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccountError {
    /// Stable status code for transports.
    ///
    /// # Examples
    ///
    /// ```
    /// use accounts_lifecycle::AccountError;
    ///
    /// assert_eq!(AccountError::NotFound("x".into()).code(), "NOT_FOUND");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub(crate) fn not_found(account_id: &str) -> Self {
        Self::NotFound(not_found_message(account_id))
    }
}

impl From<AccountStoreError> for AccountError {
    fn from(error: AccountStoreError) -> Self {
        Self::Internal(error.to_string())
    }
}

pub(crate) fn not_found_message(account_id: &str) -> String {
    format!("Account not found: {account_id}")
}
