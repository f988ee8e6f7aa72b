//! PostgreSQL storage implementation.
//!
//! This module provides the [`PgStore`] implementation of the [`Store`]
//! trait. Every compound operation runs inside one database transaction;
//! an early return drops the transaction and rolls everything back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use uuid::Uuid;

use tally_core::{
    Account, AccountId, Mutation, MutationId, MutationKind, OutgoingTotal, RefId, TopTransaction,
    TopUser,
};

use crate::error::{Result, StoreError};
use crate::{Store, TransferReceipt};

/// Default connection pool size.
const DEFAULT_MAX_CONNECTIONS: u32 = 16;

/// PostgreSQL-backed storage implementation.
///
/// Cloning is cheap; the pool is shared.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!("ledger schema migrations applied");
        Ok(())
    }

    /// The underlying pool, for callers that need ad-hoc queries (tests,
    /// operational tooling).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Check whether an error is the store's uniqueness-violation signal.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}

/// Check whether an error is a foreign-key violation.
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::ForeignKeyViolation)
    )
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    username: String,
    balance: i64,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: AccountId::from_uuid(row.id),
            username: row.username,
            balance: row.balance,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MutationRow {
    id: String,
    account_id: Uuid,
    ref_id: Uuid,
    kind: String,
    value: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<MutationRow> for Mutation {
    type Error = StoreError;

    fn try_from(row: MutationRow) -> Result<Self> {
        let id: MutationId = row
            .id
            .parse()
            .map_err(|e| StoreError::Database(format!("corrupt mutation id: {e}")))?;
        let kind: MutationKind = row
            .kind
            .parse()
            .map_err(|e| StoreError::Database(format!("corrupt mutation row: {e}")))?;
        Ok(Self {
            id,
            account_id: AccountId::from_uuid(row.account_id),
            ref_id: RefId::from_uuid(row.ref_id),
            kind,
            value: row.value,
            created_at: row.created_at,
        })
    }
}

const INSERT_MUTATION: &str = "INSERT INTO mutations (id, account_id, ref_id, kind, value, created_at) \
     VALUES ($1, $2, $3, $4, $5, $6)";

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn create_account(&self, username: &str) -> Result<Account> {
        let account = Account::new(username);

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO accounts (id, username, balance, created_at) VALUES ($1, $2, 0, $3)",
        )
        .bind(*account.id.as_uuid())
        .bind(&account.username)
        .bind(account.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                return Err(StoreError::AlreadyExists {
                    username: username.to_string(),
                });
            }
            return Err(err.into());
        }

        sqlx::query("INSERT INTO outgoing_totals (account_id, total_outgoing) VALUES ($1, 0)")
            .bind(*account.id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(account)
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, username, balance, created_at FROM accounts WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn balance(&self, account_id: AccountId) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT balance FROM accounts WHERE id = $1")
            .bind(*account_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "account",
                id: account_id.to_string(),
            })
    }

    async fn outgoing_total(&self, account_id: AccountId) -> Result<OutgoingTotal> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT total_outgoing FROM outgoing_totals WHERE account_id = $1",
        )
        .bind(*account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "outgoing total",
            id: account_id.to_string(),
        })?;

        Ok(OutgoingTotal {
            account_id,
            total_outgoing: total,
        })
    }

    // =========================================================================
    // Transfer Protocol
    // =========================================================================

    async fn topup(&self, account_id: AccountId, amount: i64) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let mutation = Mutation::topup(account_id, amount);
        sqlx::query(INSERT_MUTATION)
            .bind(mutation.id.to_string())
            .bind(*mutation.account_id.as_uuid())
            .bind(*mutation.ref_id.as_uuid())
            .bind(mutation.kind.as_str())
            .bind(mutation.value)
            .bind(mutation.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    StoreError::NotFound {
                        entity: "account",
                        id: account_id.to_string(),
                    }
                } else {
                    err.into()
                }
            })?;

        let balance = sqlx::query_scalar::<_, i64>(
            "UPDATE accounts SET balance = balance + $1 WHERE id = $2 RETURNING balance",
        )
        .bind(amount)
        .bind(*account_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "account",
            id: account_id.to_string(),
        })?;

        tx.commit().await?;

        Ok(balance)
    }

    async fn transfer(
        &self,
        sender: AccountId,
        amount: i64,
        dest_username: &str,
    ) -> Result<TransferReceipt> {
        let mut tx = self.pool.begin().await?;

        // 1. Outgoing leg.
        let outgoing = Mutation::outgoing(sender, amount);
        sqlx::query(INSERT_MUTATION)
            .bind(outgoing.id.to_string())
            .bind(*outgoing.account_id.as_uuid())
            .bind(*outgoing.ref_id.as_uuid())
            .bind(outgoing.kind.as_str())
            .bind(outgoing.value)
            .bind(outgoing.created_at)
            .execute(&mut *tx)
            .await?;

        // 2. Conditional debit: the only overdraft guard. Zero rows means
        // the balance cannot cover the amount at this instant.
        let debited = sqlx::query_scalar::<_, i64>(
            "UPDATE accounts SET balance = balance - $1 \
             WHERE id = $2 AND balance >= $1 RETURNING balance",
        )
        .bind(amount)
        .bind(*sender.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(sender_balance) = debited else {
            return Err(StoreError::InsufficientBalance { required: amount });
        };

        // 3. Outgoing aggregate. A missing row is a broken invariant, not a
        // client error.
        let aggregated = sqlx::query(
            "UPDATE outgoing_totals SET total_outgoing = total_outgoing + $1 \
             WHERE account_id = $2",
        )
        .bind(amount)
        .bind(*sender.as_uuid())
        .execute(&mut *tx)
        .await?;

        if aggregated.rows_affected() == 0 {
            return Err(StoreError::Database(format!(
                "outgoing total row missing for account {sender}"
            )));
        }

        // 4. Incoming leg, destination resolved inside the transaction.
        // Zero rows means the destination vanished between the caller's
        // lookup and now.
        let incoming_id = MutationId::generate();
        let incoming = sqlx::query(
            "INSERT INTO mutations (id, account_id, ref_id, kind, value, created_at) \
             SELECT $1, id, $2, $3, $4, $5 FROM accounts WHERE username = $6",
        )
        .bind(incoming_id.to_string())
        .bind(*outgoing.ref_id.as_uuid())
        .bind(MutationKind::Incoming.as_str())
        .bind(amount)
        .bind(outgoing.created_at)
        .bind(dest_username)
        .execute(&mut *tx)
        .await?;

        if incoming.rows_affected() == 0 {
            return Err(StoreError::DestinationNotFound {
                username: dest_username.to_string(),
            });
        }

        // 5. Credit the destination.
        let credited = sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE username = $2")
            .bind(amount)
            .bind(dest_username)
            .execute(&mut *tx)
            .await?;

        if credited.rows_affected() == 0 {
            return Err(StoreError::DestinationNotFound {
                username: dest_username.to_string(),
            });
        }

        // 6. Commit.
        tx.commit().await?;

        Ok(TransferReceipt {
            ref_id: outgoing.ref_id,
            sender_balance,
        })
    }

    // =========================================================================
    // Aggregation Queries
    // =========================================================================

    async fn top_transactions(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<TopTransaction>> {
        let rows = sqlx::query(
            "SELECT c.username AS username, \
                    CASE WHEN m.kind = 'outgoing' THEN -m.value ELSE m.value END AS amount \
             FROM mutations m \
             JOIN mutations peer ON peer.ref_id = m.ref_id AND peer.account_id <> m.account_id \
             JOIN accounts c ON c.id = peer.account_id \
             WHERE m.account_id = $1 AND m.kind IN ('outgoing', 'incoming') \
             ORDER BY m.value DESC, m.id DESC \
             LIMIT $2",
        )
        .bind(*account_id.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(TopTransaction {
                    username: row.try_get("username")?,
                    amount: row.try_get("amount")?,
                })
            })
            .collect()
    }

    async fn top_users(&self, limit: usize) -> Result<Vec<TopUser>> {
        let rows = sqlx::query(
            "SELECT a.username AS username, t.total_outgoing AS total_outgoing \
             FROM outgoing_totals t \
             JOIN accounts a ON a.id = t.account_id \
             ORDER BY t.total_outgoing DESC, a.created_at ASC, a.id ASC \
             LIMIT $1",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(TopUser {
                    username: row.try_get("username")?,
                    total_outgoing: row.try_get("total_outgoing")?,
                })
            })
            .collect()
    }

    async fn mutations_for(
        &self,
        account_id: AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Mutation>> {
        let rows = sqlx::query_as::<_, MutationRow>(
            "SELECT id, account_id, ref_id, kind, value, created_at \
             FROM mutations WHERE account_id = $1 \
             ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(*account_id.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Mutation::try_from).collect()
    }
}
