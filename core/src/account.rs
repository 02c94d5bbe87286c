//! The account record and the small value types that travel with it.
//!
//! An [`Account`] is the only entity managed by the service. Records are never
//! physically removed: "deleting" an account sets [`Account::active`] to `false`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tenant account.
///
/// # Invariants
///
/// - `account_id` is immutable once created and identifies at most one record
/// - `updated_at >= created_at`
/// - `created_at` never changes after creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Globally unique identifier (primary key).
    pub account_id: String,
    /// Display name, never empty.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Whether the account is active. Inactive accounts are soft-deleted.
    pub active: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new active account with `created_at = updated_at = now`.
    ///
    /// An empty description is stored as `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use accounts_core::Account;
    /// use chrono::Utc;
    ///
    /// let now = Utc::now();
    /// let account = Account::new("acct-1", "Acme", Some("".to_string()), now);
    /// assert!(account.active);
    /// assert_eq!(account.description, None);
    /// assert_eq!(account.created_at, account.updated_at);
    /// ```
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            name: name.into(),
            description: description.filter(|d| !d.is_empty()),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The description, or `""` when none is set.
    #[must_use]
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Account {{ id: {}, name: {}, active: {} }}",
            self.account_id, self.name, self.active
        )
    }
}

/// A point in time as seconds and nanoseconds since the Unix epoch.
///
/// This is the representation used on the wire for `created_at`, `updated_at`
/// and event timestamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds since the epoch.
    pub seconds: i64,
    /// Sub-second nanoseconds, `0..=999_999_999` outside leap seconds.
    pub nanos: i32,
}

impl Timestamp {
    /// Convert back to a `DateTime<Utc>`.
    ///
    /// Returns `None` if the value is out of range or `nanos` is negative.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let nanos = u32::try_from(self.nanos).ok()?;
        DateTime::from_timestamp(self.seconds, nanos)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    #[allow(clippy::cast_possible_wrap)] // subsec nanos are below 2_000_000_000
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanos: value.timestamp_subsec_nanos() as i32,
        }
    }
}

/// Filter shared by list and count queries.
///
/// The query is trimmed and lower-cased at construction; a blank query matches
/// every account. Unless `include_inactive` is set, only active accounts match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountFilter {
    query: Option<String>,
    include_inactive: bool,
}

impl AccountFilter {
    /// Build a filter from a raw user query.
    ///
    /// # Examples
    ///
    /// ```
    /// use accounts_core::AccountFilter;
    ///
    /// let filter = AccountFilter::new(Some("  ACME "), false);
    /// assert_eq!(filter.query(), Some("acme"));
    ///
    /// let blank = AccountFilter::new(Some("   "), true);
    /// assert_eq!(blank.query(), None);
    /// ```
    #[must_use]
    pub fn new(query: Option<&str>, include_inactive: bool) -> Self {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        Self {
            query,
            include_inactive,
        }
    }

    /// The normalized (trimmed, lower-cased) query, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Whether inactive accounts are included.
    #[must_use]
    pub const fn include_inactive(&self) -> bool {
        self.include_inactive
    }

    /// Case-insensitive substring match against `account_id` or `name`.
    #[must_use]
    pub fn matches(&self, account: &Account) -> bool {
        if !self.include_inactive && !account.active {
            return false;
        }
        match &self.query {
            None => true,
            Some(q) => {
                account.account_id.to_lowercase().contains(q.as_str())
                    || account.name.to_lowercase().contains(q.as_str())
            },
        }
    }
}
