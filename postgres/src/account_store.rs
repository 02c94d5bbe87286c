//! `PostgreSQL` implementation of [`AccountStore`].

use accounts_core::store::{StoreFuture, StoreResult};
use accounts_core::{Account, AccountFilter, AccountStore, AccountStoreError};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};

const ACCOUNT_COLUMNS: &str = "account_id, name, description, active, created_at, updated_at";

/// Row shape of the `accounts` table (the internal `seq` column is never read).
#[derive(Debug, FromRow)]
struct AccountRow {
    account_id: String,
    name: String,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            account_id: row.account_id,
            name: row.name,
            description: row.description,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `PostgreSQL`-backed account store.
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use accounts_postgres::PostgresAccountStore;
/// use accounts_core::AccountStore;
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresAccountStore::new(pool);
/// let account = store.find_by_id("acct-1").await?;
/// println!("found: {}", account.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    /// Create a store on top of an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`AccountStoreError::Database`] if the connection fails.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        Self::connect_with(PgPoolOptions::new(), database_url).await
    }

    /// Connect to `database_url` with caller-supplied pool options.
    ///
    /// # Errors
    ///
    /// Returns [`AccountStoreError::Database`] if the connection fails.
    pub async fn connect_with(options: PgPoolOptions, database_url: &str) -> StoreResult<Self> {
        let pool = options
            .connect(database_url)
            .await
            .map_err(|e| AccountStoreError::Database(format!("Failed to connect: {e}")))?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`AccountStoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> StoreResult<()> {
        tracing::info!("Running account store migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AccountStoreError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Account store migrations complete");
        Ok(())
    }

    /// Check database connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`AccountStoreError::Database`] if the probe query fails.
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AccountStoreError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Escape `LIKE` metacharacters (`\`, `%`, `_`) so user input matches literally.
///
/// # Examples
///
/// ```
/// use accounts_postgres::escape_like;
///
/// assert_eq!(escape_like("50%_off"), "50\\%\\_off");
/// ```
#[must_use]
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append the `WHERE` clause shared by list and count queries.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &AccountFilter) {
    let mut has_condition = false;

    if let Some(query) = filter.query() {
        let pattern = format!("%{}%", escape_like(query));
        builder
            .push(" WHERE (LOWER(account_id) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(name) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
        has_condition = true;
    }

    if !filter.include_inactive() {
        builder.push(if has_condition { " AND" } else { " WHERE" });
        builder.push(" active = TRUE");
    }
}

fn database_error(context: &str, e: &sqlx::Error) -> AccountStoreError {
    tracing::error!(error = %e, "{context}");
    AccountStoreError::Database(format!("{context}: {e}"))
}

impl AccountStore for PostgresAccountStore {
    fn find_by_id(&self, account_id: &str) -> StoreFuture<'_, Option<Account>> {
        let account_id = account_id.to_string();

        Box::pin(async move {
            let row: Option<AccountRow> = sqlx::query_as(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1"
            ))
            .bind(&account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("Failed to load account", &e))?;

            Ok(row.map(Account::from))
        })
    }

    fn insert(&self, account: &Account) -> StoreFuture<'_, ()> {
        let account = account.clone();

        Box::pin(async move {
            let result = sqlx::query(
                r"
                INSERT INTO accounts (account_id, name, description, active, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(&account.account_id)
            .bind(&account.name)
            .bind(&account.description)
            .bind(account.active)
            .bind(account.created_at)
            .bind(account.updated_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    tracing::debug!(
                        account_id = %account.account_id,
                        "Insert lost uniqueness race"
                    );
                    metrics::counter!("accounts_store_conflicts_total", "operation" => "insert")
                        .increment(1);
                    Err(AccountStoreError::Conflict {
                        account_id: account.account_id,
                    })
                },
                Err(e) => Err(database_error("Failed to insert account", &e)),
            }
        })
    }

    fn save(
        &self,
        account: &Account,
        expected_updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        let account = account.clone();

        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE accounts
                SET name = $2,
                    description = $3,
                    active = $4,
                    updated_at = $5
                WHERE account_id = $1 AND updated_at = $6
                ",
            )
            .bind(&account.account_id)
            .bind(&account.name)
            .bind(&account.description)
            .bind(account.active)
            .bind(account.updated_at)
            .bind(expected_updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("Failed to save account", &e))?;

            if result.rows_affected() == 0 {
                metrics::counter!("accounts_store_conflicts_total", "operation" => "save")
                    .increment(1);
                return Err(AccountStoreError::Conflict {
                    account_id: account.account_id,
                });
            }

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
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        Box::pin(async move {
            let mut builder = QueryBuilder::<Postgres>::new(format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts"
            ));
            push_filter(&mut builder, &filter);
            builder
                .push(" ORDER BY created_at DESC, seq ASC LIMIT ")
                .push_bind(limit)
                .push(" OFFSET ")
                .push_bind(offset);

            let rows: Vec<AccountRow> = builder
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| database_error("Failed to list accounts", &e))?;

            Ok(rows.into_iter().map(Account::from).collect())
        })
    }

    fn count(&self, filter: &AccountFilter) -> StoreFuture<'_, u64> {
        let filter = filter.clone();

        Box::pin(async move {
            let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM accounts");
            push_filter(&mut builder, &filter);

            let count: i64 = builder
                .build_query_scalar()
                .fetch_one(&self.pool)
                .await
                .map_err(|e| database_error("Failed to count accounts", &e))?;

            Ok(u64::try_from(count).unwrap_or_default())
        })
    }
}
