//! Error types for tally storage.

use tally_core::LedgerError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was missing.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// Unique-constraint violation on account creation.
    #[error("account already exists: {username}")]
    AlreadyExists {
        /// The username that collided.
        username: String,
    },

    /// The conditional debit affected zero rows.
    #[error("insufficient balance: required={required}")]
    InsufficientBalance {
        /// Amount the debit required.
        required: i64,
    },

    /// The transfer destination does not exist (checked inside the
    /// transaction, after the debit).
    #[error("destination account not found: {username}")]
    DestinationNotFound {
        /// The destination username.
        username: String,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => Self::AccountNotFound { account: id },
            StoreError::AlreadyExists { username } => Self::AlreadyExists { username },
            StoreError::InsufficientBalance { required } => Self::InsufficientBalance { required },
            StoreError::DestinationNotFound { username } => Self::DestinationNotFound { username },
            StoreError::Database(msg) => Self::Internal(msg),
        }
    }
}
