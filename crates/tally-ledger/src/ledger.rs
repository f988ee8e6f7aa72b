//! The ledger engine: transfer protocol orchestration and cached reads.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use tally_cache::{Cache, Lookup};
use tally_core::{Account, Caller, LedgerError, Result, TopTransaction, TopUser, TOP_LIMIT};
use tally_store::{Store, StoreError, TransferReceipt};

use crate::config::LedgerConfig;
use crate::keys;

/// The ledger engine.
///
/// Holds the store and cache handles and threads them through every
/// operation explicitly; there is no ambient global state. Cheap to share
/// behind an `Arc`; all methods take `&self` and are safe to call from many
/// request-scoped tasks at once.
///
/// Writes go through the store's single-transaction compound operations and
/// then synchronously invalidate every cache key the commit made stale.
/// Reads go through the cache first and fall back to the store on a miss,
/// repopulating the cache. Cache failures never fail an operation: a failed
/// read degrades to the store, a failed invalidation is logged.
pub struct Ledger {
    store: Arc<dyn Store>,
    cache: Arc<dyn Cache>,
    config: LedgerConfig,
}

impl Ledger {
    /// Create an engine from its collaborators.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn Cache>, config: LedgerConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Create an account with zero balance and populate its cached balance.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidUsername` if the username is empty.
    /// - `LedgerError::AlreadyExists` if the username is taken (detected by
    ///   the store's uniqueness signal, so concurrent registrations of the
    ///   same name cannot both succeed).
    /// - `LedgerError::Internal` on store failure.
    pub async fn create_account(&self, username: &str) -> Result<Account> {
        validate_username(username)?;

        let account = self
            .store
            .create_account(username)
            .await
            .map_err(|e| store_failure("create_account", e))?;

        self.cache_set(
            &keys::balance(&account.username),
            &account.balance,
            self.config.balance_ttl,
        );

        tracing::info!(account_id = %account.id, username = %account.username, "account created");

        Ok(account)
    }

    /// Read the caller's balance, cache first.
    ///
    /// A cache miss is never treated as a zero balance: it always falls
    /// through to the authoritative store and repopulates the cache.
    ///
    /// # Errors
    ///
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    /// - `LedgerError::Internal` on store failure.
    pub async fn balance(&self, caller: &Caller) -> Result<i64> {
        let key = keys::balance(&caller.username);

        if let Some(balance) = self.cache_get::<i64>(&key) {
            return Ok(balance);
        }

        let balance = self
            .store
            .balance(caller.account_id)
            .await
            .map_err(|e| store_failure("balance", e))?;

        self.cache_set(&key, &balance, self.config.balance_ttl);

        Ok(balance)
    }

    // =========================================================================
    // Transfer Protocol
    // =========================================================================

    /// Credit the caller's balance with `amount` from outside the ledger.
    ///
    /// One store transaction appends the `Topup` mutation and applies the
    /// credit; the cached balance is invalidated once it commits. Top-ups
    /// never touch outgoing totals, so the leaderboard stays as it is.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` unless `amount > 0`.
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    /// - `LedgerError::Internal` on store failure; nothing is committed.
    pub async fn topup(&self, caller: &Caller, amount: i64) -> Result<i64> {
        validate_amount(amount)?;

        let balance = self
            .store
            .topup(caller.account_id, amount)
            .await
            .map_err(|e| store_failure("topup", e))?;

        self.cache_delete(&keys::balance(&caller.username));

        tracing::info!(account_id = %caller.account_id, amount, balance, "top-up committed");

        Ok(balance)
    }

    /// Move `amount` from the caller to the account named `dest_username`.
    ///
    /// The destination is resolved up front as a fast preflight, but the
    /// store transaction re-checks it: the preflight closes nothing, the
    /// transaction's zero-row checks are the safety net. On commit, the
    /// cached balances of both parties, both parties' history views, and
    /// the leaderboard are invalidated synchronously.
    ///
    /// Retrying after an ambiguous failure is NOT idempotent: a retry that
    /// races a commit can double-spend. Callers that need retry safety must
    /// layer an idempotency key on top, correlated via the receipt's
    /// `ref_id`.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` unless `amount > 0`.
    /// - `LedgerError::InsufficientBalance` if the conditional debit affects
    ///   zero rows.
    /// - `LedgerError::DestinationNotFound` if the destination doesn't
    ///   exist, at preflight or inside the transaction.
    /// - `LedgerError::Internal` on store failure; nothing is committed.
    pub async fn transfer(
        &self,
        caller: &Caller,
        amount: i64,
        dest_username: &str,
    ) -> Result<TransferReceipt> {
        validate_amount(amount)?;
        validate_username(dest_username)?;

        let dest = self
            .store
            .account_by_username(dest_username)
            .await
            .map_err(|e| store_failure("transfer", e))?
            .ok_or_else(|| LedgerError::DestinationNotFound {
                username: dest_username.to_string(),
            })?;

        let receipt = self
            .store
            .transfer(caller.account_id, amount, dest_username)
            .await
            .map_err(|e| store_failure("transfer", e))?;

        self.cache_delete(&keys::balance(&caller.username));
        self.cache_delete(&keys::balance(&dest.username));
        self.cache_delete(keys::TOP_USERS);
        self.cache_delete(&keys::history(caller.account_id));
        self.cache_delete(&keys::history(dest.id));

        tracing::info!(
            ref_id = %receipt.ref_id,
            sender = %caller.account_id,
            destination = %dest.id,
            amount,
            "transfer committed"
        );

        Ok(receipt)
    }

    // =========================================================================
    // Aggregation Queries
    // =========================================================================

    /// The caller's largest transfers by absolute value, signed from the
    /// caller's perspective, capped at ten. Cached per account.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Internal` on store failure.
    pub async fn top_transactions(&self, caller: &Caller) -> Result<Vec<TopTransaction>> {
        let key = keys::history(caller.account_id);

        if let Some(rows) = self.cache_get::<Vec<TopTransaction>>(&key) {
            return Ok(rows);
        }

        let rows = self
            .store
            .top_transactions(caller.account_id, TOP_LIMIT)
            .await
            .map_err(|e| store_failure("top_transactions", e))?;

        self.cache_set(&key, &rows, self.config.history_ttl);

        Ok(rows)
    }

    /// Accounts ranked by total outgoing value, capped at ten. Cached under
    /// one global key.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Internal` on store failure.
    pub async fn top_users(&self) -> Result<Vec<TopUser>> {
        if let Some(rows) = self.cache_get::<Vec<TopUser>>(keys::TOP_USERS) {
            return Ok(rows);
        }

        let rows = self
            .store
            .top_users(TOP_LIMIT)
            .await
            .map_err(|e| store_failure("top_users", e))?;

        self.cache_set(keys::TOP_USERS, &rows, self.config.leaderboard_ttl);

        Ok(rows)
    }

    // =========================================================================
    // Cache plumbing
    // =========================================================================

    /// Read and decode a cached value. Backend failures and undecodable
    /// entries degrade to a miss; an undecodable entry is also dropped so
    /// it cannot shadow the store again.
    fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key) {
            Ok(Lookup::Hit(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(key, error = %err, "undecodable cache entry, dropping");
                    self.cache_delete(key);
                    None
                }
            },
            Ok(Lookup::Miss) => None,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed, falling back to store");
                None
            }
        }
    }

    /// Encode and store a cached value. Best-effort.
    fn cache_set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                if let Err(err) = self.cache.set(key, &bytes, ttl) {
                    tracing::warn!(key, error = %err, "cache write failed");
                }
            }
            Err(err) => tracing::warn!(key, error = %err, "cache encode failed"),
        }
    }

    /// Invalidate a key. A failure here opens a staleness window bounded by
    /// the entry's TTL; it never fails the operation that triggered it.
    fn cache_delete(&self, key: &str) {
        if let Err(err) = self.cache.delete(key) {
            tracing::warn!(key, error = %err, "cache invalidation failed, entry lives until TTL");
        }
    }
}

/// Convert a store failure to the public taxonomy, logging internal detail
/// at the boundary instead of exposing it.
fn store_failure(op: &'static str, err: StoreError) -> LedgerError {
    if let StoreError::Database(detail) = &err {
        tracing::error!(op, error = %detail, "store operation failed");
    }
    err.into()
}

fn validate_amount(amount: i64) -> Result<()> {
    if amount > 0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(format!(
            "amount must be a positive integer, got {amount}"
        )))
    }
}

fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(LedgerError::InvalidUsername(
            "username must not be empty".into(),
        ));
    }
    Ok(())
}
