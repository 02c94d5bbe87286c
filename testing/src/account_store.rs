//! In-memory account store for testing.

use accounts_core::store::StoreFuture;
use accounts_core::{Account, AccountFilter, AccountStore, AccountStoreError};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    /// Records in insertion order.
    accounts: Vec<Account>,
    unavailable: bool,
    racing_insert: Option<Account>,
    racing_save: Option<Account>,
}

/// In-memory account store.
///
/// Mirrors the Postgres store's contract: duplicate inserts and stale saves
/// report [`AccountStoreError::Conflict`], and queries order by `created_at`
/// descending with insertion order breaking ties.
///
/// Also supports fault injection so callers can exercise races and outages
/// deterministically.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryAccountStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `accounts`, in insertion order.
    #[must_use]
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::new();
        store.lock().accounts.extend(accounts);
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Number of stored records (active and inactive).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().accounts.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().accounts.is_empty()
    }

    /// Copy of every stored record, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Account> {
        self.lock().accounts.clone()
    }

    /// Make every operation fail with [`AccountStoreError::Database`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Simulate another writer winning the next insert.
    ///
    /// The next [`AccountStore::insert`] stores `winner` instead of its
    /// argument and reports a conflict.
    pub fn inject_racing_insert(&self, winner: Account) {
        self.lock().racing_insert = Some(winner);
    }

    /// Simulate another writer winning the next save.
    ///
    /// The next [`AccountStore::save`] replaces the stored record with
    /// `winner` and reports a conflict.
    pub fn inject_racing_save(&self, winner: Account) {
        self.lock().racing_save = Some(winner);
    }

    fn check_available(inner: &Inner) -> Result<(), AccountStoreError> {
        if inner.unavailable {
            return Err(AccountStoreError::Database(
                "store unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn filtered<'a>(
        inner: &'a Inner,
        filter: &'a AccountFilter,
    ) -> impl Iterator<Item = &'a Account> + 'a {
        inner.accounts.iter().filter(move |a| filter.matches(a))
    }
}

impl AccountStore for InMemoryAccountStore {
    fn find_by_id(&self, account_id: &str) -> StoreFuture<'_, Option<Account>> {
        let account_id = account_id.to_string();

        Box::pin(async move {
            let inner = self.lock();
            Self::check_available(&inner)?;
            Ok(inner
                .accounts
                .iter()
                .find(|a| a.account_id == account_id)
                .cloned())
        })
    }

    fn insert(&self, account: &Account) -> StoreFuture<'_, ()> {
        let account = account.clone();

        Box::pin(async move {
            let mut inner = self.lock();
            Self::check_available(&inner)?;

            if let Some(winner) = inner.racing_insert.take() {
                inner.accounts.push(winner);
                return Err(AccountStoreError::Conflict {
                    account_id: account.account_id,
                });
            }

            if inner
                .accounts
                .iter()
                .any(|a| a.account_id == account.account_id)
            {
                return Err(AccountStoreError::Conflict {
                    account_id: account.account_id,
                });
            }

            inner.accounts.push(account);
            Ok(())
        })
    }

    fn save(&self, account: &Account, expected_updated_at: DateTime<Utc>) -> StoreFuture<'_, ()> {
        let account = account.clone();

        Box::pin(async move {
            let mut inner = self.lock();
            Self::check_available(&inner)?;

            let racing = inner.racing_save.take();
            let Some(slot) = inner
                .accounts
                .iter_mut()
                .find(|a| a.account_id == account.account_id)
            else {
                return Err(AccountStoreError::Conflict {
                    account_id: account.account_id,
                });
            };

            if let Some(winner) = racing {
                *slot = winner;
                return Err(AccountStoreError::Conflict {
                    account_id: account.account_id,
                });
            }

            if slot.updated_at != expected_updated_at {
                return Err(AccountStoreError::Conflict {
                    account_id: account.account_id,
                });
            }

            slot.name = account.name;
            slot.description = account.description;
            slot.active = account.active;
            slot.updated_at = account.updated_at;
            Ok(())
        })
    }

    fn query(
        &self,
        filter: &AccountFilter,
        limit: usize,
        offset: usize,
    ) -> StoreFuture<'_, Vec<Account>> {
        let filter = filter.clone();

        Box::pin(async move {
            let inner = self.lock();
            Self::check_available(&inner)?;

            let mut matching: Vec<&Account> = Self::filtered(&inner, &filter).collect();
            // Stable sort keeps insertion order among equal created_at.
            matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            Ok(matching
                .into_iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect())
        })
    }

    fn count(&self, filter: &AccountFilter) -> StoreFuture<'_, u64> {
        let filter = filter.clone();

        Box::pin(async move {
            let inner = self.lock();
            Self::check_available(&inner)?;
            Ok(Self::filtered(&inner, &filter).count() as u64)
        })
    }
}
