//! Wire-level request handling.
//!
//! [`AccountRequestHandler`] adapts transport messages to
//! [`AccountLifecycleManager`] calls. Field names match the records exchanged
//! on the wire; timestamps travel as seconds and nanoseconds since the epoch.

use crate::error::AccountError;
use crate::manager::AccountLifecycleManager;
use crate::pagination::PageRequest;
use accounts_core::{Account, Timestamp};
use serde::{Deserialize, Serialize};

/// An account as exchanged on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMessage {
    /// Account identifier.
    pub account_id: String,
    /// Display name.
    pub name: String,
    /// Description, `""` when none is set.
    pub description: String,
    /// Whether the account is active.
    pub active: bool,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last mutation time.
    pub updated_at: Timestamp,
}

impl From<&Account> for AccountMessage {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.account_id.clone(),
            name: account.name.clone(),
            description: account.description_or_empty().to_string(),
            active: account.active,
            created_at: Timestamp::from(account.created_at),
            updated_at: Timestamp::from(account.updated_at),
        }
    }
}

impl From<Account> for AccountMessage {
    fn from(account: Account) -> Self {
        Self::from(&account)
    }
}

/// Create an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    /// Requested identifier.
    pub account_id: String,
    /// Display name.
    pub name: String,
    /// Optional description; `""` means none.
    #[serde(default)]
    pub description: String,
}

/// Reply to [`CreateAccountRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountResponse {
    /// The stored account.
    pub account: AccountMessage,
    /// `false` if the account already existed.
    pub created: bool,
}

/// Fetch an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAccountRequest {
    /// Account identifier.
    pub account_id: String,
}

/// Change an account's name and description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAccountRequest {
    /// Account identifier.
    pub account_id: String,
    /// New display name.
    pub name: String,
    /// `None` keeps the description, `Some("")` clears it.
    #[serde(default)]
    pub description: Option<String>,
}

/// Reply to [`UpdateAccountRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAccountResponse {
    /// The account after the update.
    pub account: AccountMessage,
}

/// Soft-delete an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivateAccountRequest {
    /// Account identifier.
    pub account_id: String,
    /// Why; carried on the event only.
    #[serde(default)]
    pub reason: String,
}

/// Reply to [`InactivateAccountRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivateAccountResponse {
    /// Whether the account is now inactive.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// Restore a soft-deleted account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateAccountRequest {
    /// Account identifier.
    pub account_id: String,
    /// Why; carried on the event only.
    #[serde(default)]
    pub reason: String,
}

/// Reply to [`ReactivateAccountRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateAccountResponse {
    /// Whether the account is now active.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// List accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAccountsRequest {
    /// Case-insensitive substring of id or name; blank matches all.
    #[serde(default)]
    pub query: String,
    /// Include soft-deleted accounts.
    #[serde(default)]
    pub include_inactive: bool,
    /// Rows per page; `<= 0` selects the default.
    #[serde(default)]
    pub page_size: i32,
    /// Continuation token from a previous response; `""` starts at the top.
    #[serde(default)]
    pub page_token: String,
}

/// Reply to [`ListAccountsRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAccountsResponse {
    /// Accounts on this page.
    pub accounts: Vec<AccountMessage>,
    /// Token for the next page, `""` on the last page.
    pub next_page_token: String,
    /// Number of matches ignoring pagination, saturating at `i32::MAX`.
    pub total_count: i32,
}

/// Translates wire requests into lifecycle operations.
#[derive(Clone)]
pub struct AccountRequestHandler {
    manager: AccountLifecycleManager,
}

impl AccountRequestHandler {
    /// Wrap a manager.
    #[must_use]
    pub const fn new(manager: AccountLifecycleManager) -> Self {
        Self { manager }
    }

    /// The wrapped manager.
    #[must_use]
    pub const fn manager(&self) -> &AccountLifecycleManager {
        &self.manager
    }

    /// Handle [`CreateAccountRequest`].
    ///
    /// # Errors
    ///
    /// See [`AccountLifecycleManager::create`].
    pub async fn create_account(
        &self,
        request: CreateAccountRequest,
    ) -> Result<CreateAccountResponse, AccountError> {
        tracing::info!(account_id = %request.account_id, "Create account request");

        let description = Some(request.description.as_str()).filter(|d| !d.is_empty());
        let outcome = self
            .manager
            .create(&request.account_id, &request.name, description)
            .await?;

        Ok(CreateAccountResponse {
            account: AccountMessage::from(outcome.account),
            created: outcome.created,
        })
    }

    /// Handle [`GetAccountRequest`].
    ///
    /// # Errors
    ///
    /// See [`AccountLifecycleManager::get`].
    pub async fn get_account(&self, request: GetAccountRequest) -> Result<AccountMessage, AccountError> {
        tracing::debug!(account_id = %request.account_id, "Get account request");

        let account = self.manager.get(&request.account_id).await?;
        Ok(AccountMessage::from(account))
    }

    /// Handle [`UpdateAccountRequest`].
    ///
    /// # Errors
    ///
    /// See [`AccountLifecycleManager::update`].
    pub async fn update_account(
        &self,
        request: UpdateAccountRequest,
    ) -> Result<UpdateAccountResponse, AccountError> {
        tracing::info!(account_id = %request.account_id, "Update account request");

        let account = self
            .manager
            .update(&request.account_id, &request.name, request.description.as_deref())
            .await?;

        Ok(UpdateAccountResponse {
            account: AccountMessage::from(account),
        })
    }

    /// Handle [`InactivateAccountRequest`].
    ///
    /// # Errors
    ///
    /// [`AccountError::Internal`] on store failure; a missing account is a
    /// response with `success = false`.
    pub async fn inactivate_account(
        &self,
        request: InactivateAccountRequest,
    ) -> Result<InactivateAccountResponse, AccountError> {
        tracing::info!(
            account_id = %request.account_id,
            reason = %request.reason,
            "Inactivate account request"
        );

        let change = self
            .manager
            .inactivate(&request.account_id, &request.reason)
            .await?;

        Ok(InactivateAccountResponse {
            success: change.success,
            message: change.message,
        })
    }

    /// Handle [`ReactivateAccountRequest`].
    ///
    /// # Errors
    ///
    /// [`AccountError::Internal`] on store failure; a missing account is a
    /// response with `success = false`.
    pub async fn reactivate_account(
        &self,
        request: ReactivateAccountRequest,
    ) -> Result<ReactivateAccountResponse, AccountError> {
        tracing::info!(
            account_id = %request.account_id,
            reason = %request.reason,
            "Reactivate account request"
        );

        let change = self
            .manager
            .reactivate(&request.account_id, &request.reason)
            .await?;

        Ok(ReactivateAccountResponse {
            success: change.success,
            message: change.message,
        })
    }

    /// Handle [`ListAccountsRequest`].
    ///
    /// # Errors
    ///
    /// See [`AccountLifecycleManager::list`].
    pub async fn list_accounts(
        &self,
        request: ListAccountsRequest,
    ) -> Result<ListAccountsResponse, AccountError> {
        let page = PageRequest::new(i64::from(request.page_size), Some(&request.page_token));

        let result = self
            .manager
            .list(Some(&request.query), request.include_inactive, page)
            .await?;

        Ok(ListAccountsResponse {
            accounts: result.accounts.iter().map(AccountMessage::from).collect(),
            next_page_token: result.next_page_token.unwrap_or_default(),
            total_count: i32::try_from(result.total_count).unwrap_or(i32::MAX),
        })
    }
}
