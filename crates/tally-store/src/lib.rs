//! Storage layer for the tally ledger.
//!
//! This crate owns the Account Store and the Mutation Log: the three
//! relational tables (`accounts`, `outgoing_totals`, `mutations`) and every
//! operation that touches them. All compound operations are single
//! transactions; they commit together or not at all.
//!
//! Two implementations of the [`Store`] trait are provided:
//!
//! - [`PgStore`]: the PostgreSQL store of record, with embedded migrations.
//! - [`MemStore`]: an in-memory implementation with the same transactional
//!   semantics, for tests and local development.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod mem;
pub mod postgres;

pub use error::{Result, StoreError};
pub use mem::MemStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use tally_core::{Account, AccountId, Mutation, OutgoingTotal, RefId, TopTransaction, TopUser};

/// Proof of a committed transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    /// Correlation id shared by the two mutation legs. A gateway that wants
    /// retry idempotency can key on it.
    pub ref_id: RefId,

    /// Sender balance after the debit.
    pub sender_balance: i64,
}

/// The storage trait defining all ledger store operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (PostgreSQL, in-memory for testing). Implementations
/// must be safe for concurrent use from many request-scoped operations.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Create an account with zero balance and its zeroed outgoing total,
    /// atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::AlreadyExists` if the username is taken. Detection is
    ///   via the store's uniqueness-violation signal, not a pre-check, so a
    ///   concurrent insert on the same username cannot slip through.
    /// - `StoreError::Database` if the operation fails.
    async fn create_account(&self, username: &str) -> Result<Account>;

    /// Look up an account by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn account_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// Read an account's committed balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    async fn balance(&self, account_id: AccountId) -> Result<i64>;

    /// Read an account's outgoing aggregate row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the row doesn't exist.
    async fn outgoing_total(&self, account_id: AccountId) -> Result<OutgoingTotal>;

    // =========================================================================
    // Transfer Protocol
    // =========================================================================

    /// Apply a top-up: append the `Topup` mutation and credit the balance in
    /// one transaction. Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::Database` if the transaction fails; nothing is
    ///   committed.
    async fn topup(&self, account_id: AccountId, amount: i64) -> Result<i64>;

    /// Move `amount` from `sender` to the account named `dest_username` in
    /// one transaction: outgoing leg, conditional debit, aggregate
    /// increment, incoming leg, credit, commit, in that order.
    ///
    /// The debit is a single atomic compare-and-update
    /// (`... AND balance >= amount`); there is no separate balance check
    /// anywhere, so concurrent transfers cannot overdraw the sender.
    ///
    /// # Errors
    ///
    /// - `StoreError::InsufficientBalance` if the conditional debit affects
    ///   zero rows.
    /// - `StoreError::DestinationNotFound` if the destination does not
    ///   exist at the time the incoming leg or credit is applied.
    /// - `StoreError::Database` on any other failure.
    ///
    /// Every error aborts the transaction; no partial state is observable.
    async fn transfer(
        &self,
        sender: AccountId,
        amount: i64,
        dest_username: &str,
    ) -> Result<TransferReceipt>;

    // =========================================================================
    // Aggregation Queries
    // =========================================================================

    /// The account's largest transfers by absolute value, descending, capped
    /// at `limit`. Each row pairs the counterparty's username with the
    /// amount signed from this account's perspective.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn top_transactions(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<TopTransaction>>;

    /// Accounts ranked by total outgoing value, descending, capped at
    /// `limit`. Ties are broken by account creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn top_users(&self, limit: usize) -> Result<Vec<TopUser>>;

    /// List an account's mutations, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn mutations_for(
        &self,
        account_id: AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Mutation>>;
}
