//! The account lifecycle manager.
//!
//! Every operation re-reads the account from the store before deciding what to
//! do, and every mutation is a compare-and-set on `updated_at`. When another
//! writer gets there first the operation re-reads and decides again, so
//! concurrent operations on one account apply in a single total order without
//! any locking here.

use crate::error::{AccountError, not_found_message};
use crate::pagination::PageRequest;
use crate::publisher::AccountEventPublisher;
use accounts_core::{Account, AccountFilter, AccountStore, AccountStoreError, Clock};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::future::Future;
use std::sync::Arc;

/// Default bound on compare-and-set retries per mutation.
pub const DEFAULT_MAX_WRITE_ATTEMPTS: usize = 5;

/// Result of [`AccountLifecycleManager::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    /// The stored account: the new record, or the existing one untouched.
    pub account: Account,
    /// `true` only if this call inserted the record.
    pub created: bool,
}

/// Result of inactivate and reactivate.
///
/// A missing account is reported here with `success = false` rather than as
/// an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Whether the account ended in the requested state.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl StatusChange {
    fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// One page of [`AccountLifecycleManager::list`] results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPage {
    /// Accounts on this page, newest first.
    pub accounts: Vec<Account>,
    /// Number of matching accounts ignoring pagination.
    pub total_count: u64,
    /// Token for the next page, `None` on the last page.
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusTransition {
    Inactivate,
    Reactivate,
}

impl StatusTransition {
    const fn operation(self) -> &'static str {
        match self {
            Self::Inactivate => "inactivate",
            Self::Reactivate => "reactivate",
        }
    }

    const fn target_active(self) -> bool {
        matches!(self, Self::Reactivate)
    }

    const fn already_message(self) -> &'static str {
        match self {
            Self::Inactivate => "Account already inactive",
            Self::Reactivate => "Account already active",
        }
    }

    const fn success_message(self) -> &'static str {
        match self {
            Self::Inactivate => "Account inactivated successfully",
            Self::Reactivate => "Account reactivated successfully",
        }
    }
}

/// Orchestrates account operations against the store and the event publisher.
///
/// Cloning is cheap; clones share the store, publisher and clock.
///
/// Each public operation runs as its own Tokio task. Dropping the returned
/// future abandons the result but not the work: a store write that has been
/// started always completes, and its event is still published.
///
/// # Example
///
/// ```
/// use accounts_lifecycle::{AccountEventPublisher, AccountLifecycleManager};
/// use accounts_testing::{InMemoryAccountStore, RecordingEventBus, test_clock};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), accounts_lifecycle::AccountError> {
/// let clock = Arc::new(test_clock());
/// let (publisher, _drain) = AccountEventPublisher::spawn(
///     Arc::new(RecordingEventBus::new()),
///     "account-events",
///     64,
///     clock.clone(),
/// );
/// let manager = AccountLifecycleManager::new(Arc::new(InMemoryAccountStore::new()), publisher, clock);
///
/// let outcome = manager.create("acct-1", "Acme", Some("desc")).await?;
/// assert!(outcome.created);
///
/// let again = manager.create("acct-1", "Other", None).await?;
/// assert!(!again.created);
/// assert_eq!(again.account.name, "Acme");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AccountLifecycleManager {
    store: Arc<dyn AccountStore>,
    publisher: AccountEventPublisher,
    clock: Arc<dyn Clock>,
    max_write_attempts: usize,
}

impl AccountLifecycleManager {
    /// Create a manager over `store`, publishing through `publisher`.
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        publisher: AccountEventPublisher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }

    /// Set how many times a mutation may lose a compare-and-set race before
    /// failing with [`AccountError::Internal`]. Zero is treated as one.
    #[must_use]
    pub fn with_max_write_attempts(mut self, attempts: usize) -> Self {
        self.max_write_attempts = attempts.max(1);
        self
    }

    /// The event publisher this manager submits to.
    #[must_use]
    pub const fn publisher(&self) -> &AccountEventPublisher {
        &self.publisher
    }

    /// Create an account, or return the existing one.
    ///
    /// `account_id` and `name` are trimmed. An empty description is stored as
    /// no description. If the account already exists it is returned unchanged
    /// with `created = false` and no event is emitted.
    ///
    /// # Errors
    ///
    /// - [`AccountError::InvalidArgument`] if `account_id` or `name` is blank
    /// - [`AccountError::Internal`] on store failure
    pub async fn create(
        &self,
        account_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<CreateOutcome, AccountError> {
        let account_id = account_id.to_string();
        let name = name.to_string();
        let description = description.map(str::to_string);

        self.dispatch("create", move |manager| async move {
            manager.create_account(&account_id, &name, description).await
        })
        .await
    }

    /// Fetch an account regardless of its `active` state.
    ///
    /// # Errors
    ///
    /// - [`AccountError::InvalidArgument`] if `account_id` is blank
    /// - [`AccountError::NotFound`] if no such account exists
    /// - [`AccountError::Internal`] on store failure
    pub async fn get(&self, account_id: &str) -> Result<Account, AccountError> {
        let account_id = account_id.to_string();

        self.dispatch("get", move |manager| async move {
            let account_id = required("account_id", &account_id)?;
            manager
                .store
                .find_by_id(account_id)
                .await?
                .ok_or_else(|| AccountError::not_found(account_id))
        })
        .await
    }

    /// Change the name and, if given, the description.
    ///
    /// `description: None` leaves the description unchanged; `Some("")`
    /// clears it. When nothing differs the stored account is returned as is,
    /// `updated_at` is not touched and no event is emitted.
    ///
    /// # Errors
    ///
    /// - [`AccountError::InvalidArgument`] if `account_id` or `name` is blank
    /// - [`AccountError::NotFound`] if no such account exists
    /// - [`AccountError::Internal`] on store failure or persistent write contention
    pub async fn update(
        &self,
        account_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Account, AccountError> {
        let account_id = account_id.to_string();
        let name = name.to_string();
        let description = description.map(str::to_string);

        self.dispatch("update", move |manager| async move {
            manager
                .update_account(&account_id, &name, description.as_deref())
                .await
        })
        .await
    }

    /// Soft-delete an account.
    ///
    /// `reason` only travels on the emitted event.
    ///
    /// # Errors
    ///
    /// [`AccountError::Internal`] on store failure. A missing account is
    /// reported through [`StatusChange::success`].
    pub async fn inactivate(
        &self,
        account_id: &str,
        reason: &str,
    ) -> Result<StatusChange, AccountError> {
        self.change_status(account_id, reason, StatusTransition::Inactivate)
            .await
    }

    /// Restore a soft-deleted account.
    ///
    /// # Errors
    ///
    /// [`AccountError::Internal`] on store failure. A missing account is
    /// reported through [`StatusChange::success`].
    pub async fn reactivate(
        &self,
        account_id: &str,
        reason: &str,
    ) -> Result<StatusChange, AccountError> {
        self.change_status(account_id, reason, StatusTransition::Reactivate)
            .await
    }

    /// List accounts matching `query`, newest first.
    ///
    /// The query is a case-insensitive substring of `account_id` or `name`; a
    /// blank query matches everything. Inactive accounts are only included
    /// when asked for.
    ///
    /// # Errors
    ///
    /// [`AccountError::Internal`] on store failure.
    pub async fn list(
        &self,
        query: Option<&str>,
        include_inactive: bool,
        page: PageRequest,
    ) -> Result<AccountPage, AccountError> {
        let filter = AccountFilter::new(query, include_inactive);

        self.dispatch("list", move |manager| async move {
            manager.list_accounts(&filter, page).await
        })
        .await
    }

    /// Count accounts matching the same filter as [`list`](Self::list).
    ///
    /// # Errors
    ///
    /// [`AccountError::Internal`] on store failure.
    pub async fn count(&self, query: Option<&str>, include_inactive: bool) -> Result<u64, AccountError> {
        let filter = AccountFilter::new(query, include_inactive);

        self.dispatch("count", move |manager| async move {
            Ok(manager.store.count(&filter).await?)
        })
        .await
    }

    /// Run `operation` on its own task and record its outcome.
    async fn dispatch<T, F, Fut>(&self, operation: &'static str, operation_fn: F) -> Result<T, AccountError>
    where
        T: Send + 'static,
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, AccountError>> + Send + 'static,
    {
        let work = operation_fn(self.clone());

        let handle = tokio::spawn(async move {
            let result = work.await;
            let outcome = result.as_ref().map_or_else(AccountError::code, |_| "OK");
            metrics::counter!(
                "accounts_operations_total",
                "operation" => operation,
                "outcome" => outcome
            )
            .increment(1);
            result
        });

        handle.await.unwrap_or_else(|e| {
            tracing::error!(operation = operation, error = %e, "Account operation task failed");
            Err(AccountError::Internal(format!("{operation} did not complete: {e}")))
        })
    }

    async fn create_account(
        &self,
        account_id: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<CreateOutcome, AccountError> {
        let account_id = required("account_id", account_id)?;
        let name = required("name", name)?;

        if let Some(existing) = self.store.find_by_id(account_id).await? {
            tracing::info!(account_id = %account_id, "Account already exists");
            return Ok(CreateOutcome {
                account: existing,
                created: false,
            });
        }

        let account = Account::new(account_id, name, description, self.now());

        match self.store.insert(&account).await {
            Ok(()) => {
                tracing::info!(account_id = %account_id, name = %account.name, "Created account");
                self.publisher.publish_created(&account);
                Ok(CreateOutcome {
                    account,
                    created: true,
                })
            },
            Err(AccountStoreError::Conflict { .. }) => {
                let winner = self.store.find_by_id(account_id).await?.ok_or_else(|| {
                    AccountError::Internal(format!(
                        "Account {account_id} conflicted on insert but could not be read"
                    ))
                })?;
                tracing::info!(account_id = %account_id, "Account already exists");
                Ok(CreateOutcome {
                    account: winner,
                    created: false,
                })
            },
            Err(e) => {
                tracing::error!(account_id = %account_id, error = %e, "Failed to create account");
                Err(e.into())
            },
        }
    }

    async fn update_account(
        &self,
        account_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Account, AccountError> {
        let account_id = required("account_id", account_id)?;
        let name = required("name", name)?;

        for attempt in 1..=self.max_write_attempts {
            let current = self
                .store
                .find_by_id(account_id)
                .await?
                .ok_or_else(|| AccountError::not_found(account_id))?;

            let new_description = match description {
                None => current.description.clone(),
                Some("") => None,
                Some(d) => Some(d.to_string()),
            };

            if current.name == name && current.description == new_description {
                tracing::debug!(account_id = %account_id, "Update changes nothing");
                return Ok(current);
            }

            let mut next = current.clone();
            next.name = name.to_string();
            next.description = new_description;
            next.updated_at = self.next_updated_at(&current);

            match self.store.save(&next, current.updated_at).await {
                Ok(()) => {
                    tracing::info!(account_id = %account_id, "Updated account");
                    self.publisher.publish_updated(&next);
                    return Ok(next);
                },
                Err(AccountStoreError::Conflict { .. }) => {
                    tracing::debug!(account_id = %account_id, attempt = attempt, "Concurrent write, retrying update");
                },
                Err(e) => {
                    tracing::error!(account_id = %account_id, error = %e, "Failed to update account");
                    return Err(e.into());
                },
            }
        }

        Err(self.contention(account_id))
    }

    async fn change_status(
        &self,
        account_id: &str,
        reason: &str,
        transition: StatusTransition,
    ) -> Result<StatusChange, AccountError> {
        let account_id = account_id.to_string();
        let reason = reason.to_string();

        self.dispatch(transition.operation(), move |manager| async move {
            manager.apply_status(&account_id, &reason, transition).await
        })
        .await
    }

    async fn apply_status(
        &self,
        account_id: &str,
        reason: &str,
        transition: StatusTransition,
    ) -> Result<StatusChange, AccountError> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Ok(StatusChange::failed("Account ID is required"));
        }
        let target = transition.target_active();

        for attempt in 1..=self.max_write_attempts {
            let Some(current) = self.store.find_by_id(account_id).await? else {
                tracing::warn!(account_id = %account_id, operation = transition.operation(), "Account not found");
                return Ok(StatusChange::failed(not_found_message(account_id)));
            };

            if current.active == target {
                tracing::debug!(account_id = %account_id, operation = transition.operation(), "Account already in requested state");
                return Ok(StatusChange::succeeded(transition.already_message()));
            }

            let mut next = current.clone();
            next.active = target;
            next.updated_at = self.next_updated_at(&current);

            match self.store.save(&next, current.updated_at).await {
                Ok(()) => {
                    tracing::info!(
                        account_id = %account_id,
                        reason = %reason,
                        operation = transition.operation(),
                        "Changed account status"
                    );
                    match transition {
                        StatusTransition::Inactivate => {
                            self.publisher.publish_inactivated(account_id, reason);
                        },
                        StatusTransition::Reactivate => {
                            self.publisher.publish_reactivated(account_id, reason);
                        },
                    }
                    return Ok(StatusChange::succeeded(transition.success_message()));
                },
                Err(AccountStoreError::Conflict { .. }) => {
                    tracing::debug!(account_id = %account_id, attempt = attempt, "Concurrent write, retrying status change");
                },
                Err(e) => {
                    tracing::error!(
                        account_id = %account_id,
                        operation = transition.operation(),
                        error = %e,
                        "Failed to change account status"
                    );
                    return Err(e.into());
                },
            }
        }

        Err(self.contention(account_id))
    }

    async fn list_accounts(
        &self,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> Result<AccountPage, AccountError> {
        tracing::debug!(
            query = ?filter.query(),
            include_inactive = filter.include_inactive(),
            page_size = page.size(),
            offset = page.offset(),
            "Listing accounts"
        );

        // One extra row tells us whether another page follows.
        let mut accounts = self
            .store
            .query(filter, page.size().saturating_add(1), page.offset())
            .await?;
        let has_more = accounts.len() > page.size();
        accounts.truncate(page.size());

        let total_count = self.store.count(filter).await?;

        Ok(AccountPage {
            accounts,
            total_count,
            next_page_token: has_more.then(|| page.next_token()),
        })
    }

    /// Current time at the store's precision.
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(6)
    }

    /// `updated_at` for the next mutation of `current`: strictly after the
    /// previous value even if the clock stalls or steps back.
    fn next_updated_at(&self, current: &Account) -> DateTime<Utc> {
        self.now().max(current.updated_at + Duration::microseconds(1))
    }

    fn contention(&self, account_id: &str) -> AccountError {
        tracing::error!(
            account_id = %account_id,
            attempts = self.max_write_attempts,
            "Gave up after repeated concurrent writes"
        );
        AccountError::Internal(format!(
            "Account {account_id} is being modified concurrently, try again"
        ))
    }
}

/// Trim `value` and reject it if blank.
fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, AccountError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AccountError::InvalidArgument(format!("{field} is required")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("name", "  Acme "), Ok("Acme"));
        assert_eq!(
            required("name", "   "),
            Err(AccountError::InvalidArgument("name is required".to_string()))
        );
    }

    #[test]
    fn status_transitions_describe_themselves() {
        assert!(!StatusTransition::Inactivate.target_active());
        assert!(StatusTransition::Reactivate.target_active());
        assert_eq!(StatusTransition::Inactivate.already_message(), "Account already inactive");
        assert_eq!(
            StatusTransition::Reactivate.success_message(),
            "Account reactivated successfully"
        );
    }
}
