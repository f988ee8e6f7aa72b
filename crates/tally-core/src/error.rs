//! Error types for the tally ledger.

use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors surfaced by ledger operations.
///
/// This is the public taxonomy: everything the engine returns maps onto one
/// of these. Store and transaction failures are folded into `Internal` with
/// the detail logged, never exposed to the caller.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Username already taken (unique-constraint race on account creation).
    #[error("account already exists: {username}")]
    AlreadyExists {
        /// The username that collided.
        username: String,
    },

    /// Account not found.
    #[error("account not found: {account}")]
    AccountNotFound {
        /// The account id or username that was not found.
        account: String,
    },

    /// Transfer destination does not exist (or vanished before commit).
    #[error("destination account not found: {username}")]
    DestinationNotFound {
        /// The destination username.
        username: String,
    },

    /// The conditional debit affected zero rows: the sender cannot cover
    /// the transfer.
    #[error("insufficient balance: required={required}")]
    InsufficientBalance {
        /// Amount the transfer required.
        required: i64,
    },

    /// Invalid amount (must be a positive integer).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid username.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Store or transaction failure. Logged with full context where it
    /// occurs; surfaced generically.
    #[error("internal error: {0}")]
    Internal(String),
}
